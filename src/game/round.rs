//! Round lifecycle - countdown, ranking, cooldown between rounds

use std::cmp::Reverse;

use crate::ws::protocol::RankEntry;

use super::registry::PlayerRegistry;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Timer running, bullets simulated, shots accepted
    Active,
    /// Timer hit zero; ranking has been published
    Ended,
    /// Waiting for the next round
    Cooldown,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Active => "active",
            RoundPhase::Ended => "ended",
            RoundPhase::Cooldown => "cooldown",
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            RoundPhase::Active => 0,
            RoundPhase::Ended => 1,
            RoundPhase::Cooldown => 2,
        }
    }

    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RoundPhase::Ended,
            2 => RoundPhase::Cooldown,
            _ => RoundPhase::Active,
        }
    }
}

/// What one slow tick did to the round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTick {
    /// Timer decremented, round still running
    Countdown(u32),
    /// Timer reached zero on this tick; the round is now Ended
    Expired,
    /// Between rounds, this many seconds until restart
    Waiting(u32),
    /// The cooldown elapsed and a new Active round began
    Restarted,
}

/// State machine: Active -> Ended -> Cooldown -> Active.
///
/// Driven entirely by the slow clock, so `round_secs` and `cooldown_secs`
/// count slow ticks rather than wall-clock seconds. Entering Ended arms the
/// cooldown counter; the first tick after that moves to Cooldown, and the
/// round restarts exactly `cooldown_secs` ticks after it expired. With a
/// cooldown of 0 or 1 that first tick restarts the round and Cooldown is
/// skipped.
#[derive(Debug, Clone)]
pub struct RoundLifecycle {
    phase: RoundPhase,
    timer: u32,
    round: u32,
    round_secs: u32,
    cooldown_secs: u32,
    cooldown_left: u32,
}

impl RoundLifecycle {
    pub fn new(round_secs: u32, cooldown_secs: u32) -> Self {
        Self {
            phase: RoundPhase::Active,
            timer: round_secs,
            round: 1,
            round_secs,
            cooldown_secs,
            cooldown_left: 0,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Seconds left in the running round
    pub fn timer(&self) -> u32 {
        self.timer
    }

    /// 1-based round counter
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn round_secs(&self) -> u32 {
        self.round_secs
    }

    /// Shots and bullet simulation only run while Active
    pub fn is_active(&self) -> bool {
        self.phase == RoundPhase::Active
    }

    /// Advance the round clock by one slow tick
    pub fn on_slow_tick(&mut self) -> RoundTick {
        match self.phase {
            RoundPhase::Active => {
                self.timer = self.timer.saturating_sub(1);
                if self.timer == 0 {
                    self.phase = RoundPhase::Ended;
                    self.cooldown_left = self.cooldown_secs;
                    RoundTick::Expired
                } else {
                    RoundTick::Countdown(self.timer)
                }
            }
            RoundPhase::Ended | RoundPhase::Cooldown => {
                self.cooldown_left = self.cooldown_left.saturating_sub(1);
                if self.cooldown_left == 0 {
                    self.start_round();
                    RoundTick::Restarted
                } else {
                    self.phase = RoundPhase::Cooldown;
                    RoundTick::Waiting(self.cooldown_left)
                }
            }
        }
    }

    fn start_round(&mut self) {
        self.phase = RoundPhase::Active;
        self.timer = self.round_secs;
        self.round += 1;
    }

    /// Players by score descending; equal scores keep join order
    pub fn ranking(registry: &PlayerRegistry) -> Vec<RankEntry> {
        let mut players: Vec<_> = registry.iter().collect();
        // Stable sort over join-ordered input
        players.sort_by_key(|p| Reverse(p.score));
        players
            .into_iter()
            .map(|p| RankEntry {
                name: p.name.clone(),
                score: p.score,
            })
            .collect()
    }
}
