//! Arena geometry: bounds, spawn zone, distance checks

use rand::Rng;

/// Arena width in logical units
pub const ARENA_WIDTH: f32 = 800.0;
/// Arena height in logical units
pub const ARENA_HEIGHT: f32 = 600.0;

/// Margin of the random spawn zone, [50,750] x [50,550]
pub const SPAWN_MARGIN: f32 = 50.0;
/// Margin of the hard movement clamp, [15,785] x [15,585]
pub const MOVE_MARGIN: f32 = 15.0;

/// Bullet-to-player distance that counts as a hit
pub const HIT_RADIUS: f32 = 16.0;

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// The whole arena, [0,800] x [0,600]
    pub const ARENA: Bounds = Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: ARENA_WIDTH,
        max_y: ARENA_HEIGHT,
    };
    /// Random placement zone
    pub const SAFE_ZONE: Bounds = Bounds {
        min_x: SPAWN_MARGIN,
        min_y: SPAWN_MARGIN,
        max_x: ARENA_WIDTH - SPAWN_MARGIN,
        max_y: ARENA_HEIGHT - SPAWN_MARGIN,
    };
    /// Hard movement clamp of the client simulation; not enforced here
    pub const MOVEMENT: Bounds = Bounds {
        min_x: MOVE_MARGIN,
        min_y: MOVE_MARGIN,
        max_x: ARENA_WIDTH - MOVE_MARGIN,
        max_y: ARENA_HEIGHT - MOVE_MARGIN,
    };

    /// Inclusive containment check
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Uniformly random point inside the rectangle
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> (f32, f32) {
        (
            rng.gen_range(self.min_x..=self.max_x),
            rng.gen_range(self.min_y..=self.max_y),
        )
    }
}

/// Euclidean distance between two points
pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Whether a bullet at (bx, by) strikes a player at (px, py)
pub fn within_hit_radius(bx: f32, by: f32, px: f32, py: f32) -> bool {
    distance(bx, by, px, py) < HIT_RADIUS
}
