//! Rate limiting utilities

use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter type alias
pub type Limiter<C = DefaultClock> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter<C: Clock>(requests_per_second: u32, clock: &C) -> Limiter<C> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    RateLimiter::direct_with_clock(quota, clock)
}

/// Per-connection input limits.
///
/// Motion (move, rotate) and shots draw from separate buckets so a client
/// streaming position every frame never starves its own shots.
pub struct ConnectionRateLimiter<C: Clock = DefaultClock> {
    motion: Limiter<C>,
    shots: Limiter<C>,
}

impl ConnectionRateLimiter {
    pub fn new(motion_per_second: u32, shots_per_second: u32) -> Self {
        Self::with_clock(motion_per_second, shots_per_second, &DefaultClock::default())
    }
}

impl<C: Clock> ConnectionRateLimiter<C> {
    pub fn with_clock(motion_per_second: u32, shots_per_second: u32, clock: &C) -> Self {
        Self {
            motion: create_limiter(motion_per_second, clock),
            shots: create_limiter(shots_per_second, clock),
        }
    }

    /// Check if a move or rotate is allowed (returns true if allowed)
    pub fn check_motion(&self) -> bool {
        self.motion.check().is_ok()
    }

    /// Check if a shot is allowed (returns true if allowed)
    pub fn check_shot(&self) -> bool {
        self.shots.check().is_ok()
    }
}
