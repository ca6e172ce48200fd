//! Player registry - connection id to authoritative player state

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

use crate::ws::protocol::PlayerInfo;

use super::physics::Bounds;
use super::ConnectionId;

/// Full health
pub const MAX_HP: u32 = 100;

/// Colours handed out when a join does not name one
pub const PALETTE: [&str; 7] = [
    "#e74c3c", "#3498db", "#2ecc71", "#f1c40f", "#9b59b6", "#e67e22", "#1abc9c",
];

/// Player state (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnectionId,
    /// Position in the registry's join order; fixes iteration and tie-breaks
    pub join_seq: u64,

    pub x: f32,
    pub y: f32,
    /// Facing angle in radians
    pub angle: f32,

    /// Always within 0..=MAX_HP
    pub hp: u32,
    pub score: u32,

    pub name: String,
    pub color: String,
}

impl Player {
    /// Apply damage, returns true if the hit was lethal
    pub fn take_damage(&mut self, damage: u32) -> bool {
        self.hp = self.hp.saturating_sub(damage);
        self.hp == 0
    }

    /// Restore full health at a new position
    pub fn respawn(&mut self, x: f32, y: f32) {
        self.hp = MAX_HP;
        self.x = x;
        self.y = y;
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            x: self.x,
            y: self.y,
            angle: self.angle,
            hp: self.hp,
            name: self.name.clone(),
            color: self.color.clone(),
            score: self.score,
        }
    }
}

/// Parameters of a join request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinRequest {
    pub x: f32,
    pub y: f32,
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Result of [`PlayerRegistry::join`]
#[derive(Debug)]
pub struct JoinOutcome<'a> {
    pub player: &'a Player,
    /// False when the connection already had a player
    pub created: bool,
}

/// Mapping from connection to player, iterated in join order
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<ConnectionId, Player>,
    order: BTreeMap<u64, ConnectionId>,
    next_seq: u64,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a player for `id`, or return the existing one untouched
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        id: ConnectionId,
        request: JoinRequest,
        rng: &mut R,
    ) -> JoinOutcome<'_> {
        if self.players.contains_key(&id) {
            return JoinOutcome {
                player: &self.players[&id],
                created: false,
            };
        }

        let join_seq = self.next_seq;
        self.next_seq += 1;

        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| placeholder_name(id));
        let color = request
            .color
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| PALETTE.choose(rng).copied().unwrap_or(PALETTE[0]).to_string());

        let player = Player {
            id,
            join_seq,
            x: request.x,
            y: request.y,
            angle: 0.0,
            hp: MAX_HP,
            score: 0,
            name,
            color,
        };

        self.order.insert(join_seq, id);
        let player = self.players.entry(id).or_insert(player);
        JoinOutcome {
            player,
            created: true,
        }
    }

    /// Overwrite the reported position, returns false for unknown connections
    pub fn apply_move(&mut self, id: ConnectionId, x: f32, y: f32) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.x = x;
                player.y = y;
                true
            }
            None => false,
        }
    }

    /// Overwrite the facing angle, returns false for unknown connections
    pub fn apply_rotate(&mut self, id: ConnectionId, angle: f32) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.angle = angle;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.order.remove(&player.join_seq);
        Some(player)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players in ascending join order
    pub fn iter(&self) -> impl Iterator<Item = &Player> + '_ {
        self.order.values().filter_map(|id| self.players.get(id))
    }

    /// Connection ids in ascending join order
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.order.values().copied().collect()
    }

    /// Replicated view of every player, in join order
    pub fn snapshot(&self) -> Vec<PlayerInfo> {
        self.iter().map(Player::info).collect()
    }

    /// Full health and a fresh safe-zone position for everyone
    pub fn reset_for_round<R: Rng + ?Sized>(&mut self, rng: &mut R, reset_scores: bool) {
        for id in self.ids() {
            if let Some(player) = self.players.get_mut(&id) {
                let (x, y) = Bounds::SAFE_ZONE.random_point(rng);
                player.respawn(x, y);
                if reset_scores {
                    player.score = 0;
                }
            }
        }
    }
}

/// `Player-` followed by the first four characters of the id
fn placeholder_name(id: ConnectionId) -> String {
    let simple = id.simple().to_string();
    format!("Player-{}", &simple[..4])
}
