//! Replication - translate world events into addressed outbound messages

use crate::ws::protocol::{PlayerInfo, RankEntry, ServerMsg};

use super::ConnectionId;

/// Who receives an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The originating connection only
    Only(ConnectionId),
    /// Every connection except the originator
    AllExcept(ConnectionId),
    All,
}

/// A message ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub delivery: Delivery,
    pub msg: ServerMsg,
}

/// State changes produced by the world
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Joined {
        id: ConnectionId,
        player: PlayerInfo,
        /// Every player including the joiner
        players: Vec<PlayerInfo>,
        timer: u32,
    },
    Left {
        id: ConnectionId,
    },
    Moved {
        id: ConnectionId,
        x: f32,
        y: f32,
    },
    Rotated {
        id: ConnectionId,
        angle: f32,
    },
    BulletFired {
        owner: ConnectionId,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    },
    PlayerHit {
        id: ConnectionId,
        hp: u32,
    },
    PlayerRespawned {
        id: ConnectionId,
        x: f32,
        y: f32,
        hp: u32,
    },
    ScoreChanged {
        id: ConnectionId,
        score: u32,
    },
    TimerTick {
        seconds: u32,
    },
    RoundEnded {
        ranking: Vec<RankEntry>,
    },
    RoundStarted {
        round: u32,
        players: Vec<PlayerInfo>,
        timer: u32,
    },
}

impl WorldEvent {
    /// Outbound messages for this event, in delivery order
    pub fn replicate(self) -> Vec<Outbound> {
        use Delivery::*;

        let single = |delivery, msg| vec![Outbound { delivery, msg }];

        match self {
            WorldEvent::Joined {
                id,
                player,
                players,
                timer,
            } => vec![
                // Snapshot first so the joiner never sees an event it cannot place
                Outbound {
                    delivery: Only(id),
                    msg: ServerMsg::InitState { players, timer },
                },
                Outbound {
                    delivery: AllExcept(id),
                    msg: ServerMsg::PlayerJoined { id, data: player },
                },
            ],
            WorldEvent::Left { id } => single(AllExcept(id), ServerMsg::PlayerLeft { id }),
            WorldEvent::Moved { id, x, y } => {
                single(AllExcept(id), ServerMsg::PlayerMoved { id, x, y })
            }
            WorldEvent::Rotated { id, angle } => {
                single(AllExcept(id), ServerMsg::PlayerRotated { id, angle })
            }
            WorldEvent::BulletFired {
                owner,
                x,
                y,
                vx,
                vy,
            } => single(All, ServerMsg::BulletFired { x, y, vx, vy, owner }),
            WorldEvent::PlayerHit { id, hp } => single(All, ServerMsg::PlayerHit { id, hp }),
            WorldEvent::PlayerRespawned { id, x, y, hp } => {
                single(All, ServerMsg::PlayerRespawn { id, x, y, hp })
            }
            WorldEvent::ScoreChanged { id, score } => {
                single(All, ServerMsg::ScoreUpdate { id, score })
            }
            WorldEvent::TimerTick { seconds } => single(All, ServerMsg::TimerUpdate { seconds }),
            WorldEvent::RoundEnded { ranking } => single(All, ServerMsg::RoundEnd { ranking }),
            WorldEvent::RoundStarted {
                round,
                players,
                timer,
            } => single(
                All,
                ServerMsg::RoundStart {
                    round,
                    players,
                    timer,
                },
            ),
        }
    }
}

/// Outbound messages accumulated while the world mutates
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: WorldEvent) {
        self.pending.extend(event.replicate());
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Take everything emitted so far, oldest first
    pub fn drain(&mut self) -> std::vec::Drain<'_, Outbound> {
        self.pending.drain(..)
    }

    #[cfg(test)]
    pub fn messages(&self) -> impl Iterator<Item = &ServerMsg> + '_ {
        self.pending.iter().map(|o| &o.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn info(id: ConnectionId) -> PlayerInfo {
        PlayerInfo {
            id,
            x: 100.0,
            y: 100.0,
            angle: 0.0,
            hp: 100,
            name: "ace".into(),
            color: "#fff".into(),
            score: 0,
        }
    }

    #[test]
    fn join_sends_snapshot_to_joiner_before_announcing() {
        let id = Uuid::new_v4();
        let out = WorldEvent::Joined {
            id,
            player: info(id),
            players: vec![info(id)],
            timer: 42,
        }
        .replicate();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].delivery, Delivery::Only(id));
        assert!(matches!(out[0].msg, ServerMsg::InitState { timer: 42, .. }));
        assert_eq!(out[1].delivery, Delivery::AllExcept(id));
        assert!(matches!(out[1].msg, ServerMsg::PlayerJoined { .. }));
    }

    #[test]
    fn delivery_scope_per_event() {
        let id = Uuid::new_v4();
        let cases = vec![
            (WorldEvent::Left { id }, Delivery::AllExcept(id)),
            (WorldEvent::Moved { id, x: 1.0, y: 2.0 }, Delivery::AllExcept(id)),
            (WorldEvent::Rotated { id, angle: 1.0 }, Delivery::AllExcept(id)),
            (
                WorldEvent::BulletFired {
                    owner: id,
                    x: 0.0,
                    y: 0.0,
                    vx: 1.0,
                    vy: 1.0,
                },
                Delivery::All,
            ),
            (WorldEvent::PlayerHit { id, hp: 80 }, Delivery::All),
            (WorldEvent::ScoreChanged { id, score: 1 }, Delivery::All),
            (WorldEvent::TimerTick { seconds: 3 }, Delivery::All),
            (WorldEvent::RoundEnded { ranking: vec![] }, Delivery::All),
        ];

        for (event, expected) in cases {
            let out = event.replicate();
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].delivery, expected);
        }
    }

    #[test]
    fn outbox_drains_in_emission_order() {
        let mut outbox = Outbox::new();
        outbox.emit(WorldEvent::TimerTick { seconds: 2 });
        outbox.emit(WorldEvent::TimerTick { seconds: 1 });
        assert_eq!(outbox.len(), 2);

        let seconds: Vec<u32> = outbox
            .drain()
            .map(|o| match o.msg {
                ServerMsg::TimerUpdate { seconds } => seconds,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(seconds, vec![2, 1]);
        assert!(outbox.is_empty());
    }
}
