//! Projectile simulation - bullet movement, hit detection, damage

use rand::Rng;
use tracing::debug;

use super::physics::{within_hit_radius, Bounds};
use super::registry::PlayerRegistry;
use super::replication::{Outbox, WorldEvent};
use super::ConnectionId;

/// Health removed by one bullet
pub const DAMAGE_PER_HIT: u32 = 20;

/// Active bullet in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub id: u64,
    pub owner: ConnectionId,
    pub x: f32,
    pub y: f32,
    /// Units per fast tick, constant for the bullet's lifetime
    pub vx: f32,
    pub vy: f32,
    /// Fast tick on which the bullet was fired
    pub fired_tick: u64,
}

impl Bullet {
    /// One Euler step
    pub fn advance(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
    }
}

/// A bullet striking a player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub bullet_id: u64,
    pub shooter_id: ConnectionId,
    pub target_id: ConnectionId,
    pub target_killed: bool,
}

/// Owns the bullet set and advances it each fast tick
#[derive(Debug, Default)]
pub struct ProjectileSimulator {
    bullets: Vec<Bullet>,
    next_id: u64,
}

impl ProjectileSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bullet, returns its id
    pub fn fire(&mut self, owner: ConnectionId, x: f32, y: f32, vx: f32, vy: f32, tick: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.bullets.push(Bullet {
            id,
            owner,
            x,
            y,
            vx,
            vy,
            fired_tick: tick,
        });
        id
    }

    #[cfg(test)]
    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn len(&self) -> usize {
        self.bullets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty()
    }

    pub fn clear(&mut self) {
        self.bullets.clear();
    }

    /// Advance every bullet once and resolve hits.
    ///
    /// Bullets are handled in firing order. Each bullet scans players in join
    /// order, skipping its owner, and strikes the first one inside the hit
    /// radius; a struck bullet is removed at once, so it damages at most one
    /// player. Bullets that end the step outside the arena are dropped.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        registry: &mut PlayerRegistry,
        rng: &mut R,
        outbox: &mut Outbox,
    ) -> Vec<HitResult> {
        let order = registry.ids();
        let mut hits = Vec::new();

        self.bullets.retain_mut(|bullet| {
            bullet.advance();

            if let Some(target_id) = first_target(bullet, registry, &order) {
                debug!(
                    bullet_id = bullet.id,
                    owner = %bullet.owner,
                    target_id = %target_id,
                    age_ticks = tick.saturating_sub(bullet.fired_tick),
                    "Bullet hit"
                );
                let target_killed = apply_hit(bullet.owner, target_id, registry, rng, outbox);
                hits.push(HitResult {
                    bullet_id: bullet.id,
                    shooter_id: bullet.owner,
                    target_id,
                    target_killed,
                });
                return false;
            }

            Bounds::ARENA.contains(bullet.x, bullet.y)
        });

        hits
    }
}

/// First non-owner player in `order` within the hit radius
fn first_target(
    bullet: &Bullet,
    registry: &PlayerRegistry,
    order: &[ConnectionId],
) -> Option<ConnectionId> {
    order
        .iter()
        .filter(|id| **id != bullet.owner)
        .filter_map(|id| registry.get(id))
        .find(|p| within_hit_radius(bullet.x, bullet.y, p.x, p.y))
        .map(|p| p.id)
}

/// Damage the target; a lethal hit respawns it and credits the shooter
fn apply_hit<R: Rng + ?Sized>(
    shooter_id: ConnectionId,
    target_id: ConnectionId,
    registry: &mut PlayerRegistry,
    rng: &mut R,
    outbox: &mut Outbox,
) -> bool {
    let Some(target) = registry.get_mut(&target_id) else {
        return false;
    };

    let killed = target.take_damage(DAMAGE_PER_HIT);
    outbox.emit(WorldEvent::PlayerHit {
        id: target_id,
        hp: target.hp,
    });

    if !killed {
        return false;
    }

    let (x, y) = Bounds::SAFE_ZONE.random_point(rng);
    target.respawn(x, y);
    outbox.emit(WorldEvent::PlayerRespawned {
        id: target_id,
        x,
        y,
        hp: target.hp,
    });

    match registry.get_mut(&shooter_id) {
        Some(shooter) => {
            shooter.score += 1;
            outbox.emit(WorldEvent::ScoreChanged {
                id: shooter_id,
                score: shooter.score,
            });
        }
        None => {
            debug!(shooter_id = %shooter_id, "Shooter left before the kill, no score awarded");
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::registry::{JoinRequest, MAX_HP};
    use crate::ws::protocol::ServerMsg;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    struct Fixture {
        registry: PlayerRegistry,
        sim: ProjectileSimulator,
        rng: ChaCha8Rng,
        outbox: Outbox,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: PlayerRegistry::new(),
                sim: ProjectileSimulator::new(),
                rng: ChaCha8Rng::seed_from_u64(3),
                outbox: Outbox::new(),
            }
        }

        fn player_at(&mut self, x: f32, y: f32) -> ConnectionId {
            let id = Uuid::new_v4();
            let request = JoinRequest {
                x,
                y,
                ..JoinRequest::default()
            };
            self.registry.join(id, request, &mut self.rng);
            id
        }

        fn step(&mut self) -> Vec<HitResult> {
            self.sim
                .step(0, &mut self.registry, &mut self.rng, &mut self.outbox)
        }

        fn hp(&self, id: ConnectionId) -> u32 {
            self.registry.get(&id).unwrap().hp
        }

        fn score(&self, id: ConnectionId) -> u32 {
            self.registry.get(&id).unwrap().score
        }
    }

    #[test]
    fn surviving_hit_removes_bullet_and_keeps_score() {
        let mut f = Fixture::new();
        let a = f.player_at(100.0, 100.0);
        let b = f.player_at(300.0, 300.0);
        // After one step the bullet sits 10 units from B
        f.sim.fire(a, 285.0, 300.0, 5.0, 0.0, 0);

        let hits = f.step();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target_id, b);
        assert!(!hits[0].target_killed);
        assert_eq!(f.hp(b), 80);
        assert_eq!(f.score(a), 0);
        assert!(f.sim.is_empty());

        let msgs: Vec<&ServerMsg> = f.outbox.messages().collect();
        assert_eq!(msgs, vec![&ServerMsg::PlayerHit { id: b, hp: 80 }]);
    }

    #[test]
    fn lethal_hit_respawns_and_scores_once() {
        let mut f = Fixture::new();
        let a = f.player_at(100.0, 100.0);
        let b = f.player_at(300.0, 300.0);
        f.registry.get_mut(&b).unwrap().hp = 20;
        f.sim.fire(a, 295.0, 300.0, 0.0, 0.0, 0);

        let hits = f.step();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].target_killed);

        let target = f.registry.get(&b).unwrap();
        assert_eq!(target.hp, MAX_HP);
        assert!(Bounds::SAFE_ZONE.contains(target.x, target.y));
        assert_eq!(f.score(a), 1);
        assert!(f.sim.is_empty());

        let msgs: Vec<ServerMsg> = f.outbox.messages().cloned().collect();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0], ServerMsg::PlayerHit { id: b, hp: 0 });
        assert!(matches!(msgs[1], ServerMsg::PlayerRespawn { id, hp: 100, .. } if id == b));
        assert_eq!(msgs[2], ServerMsg::ScoreUpdate { id: a, score: 1 });

        // The bullet is gone; nothing more happens
        assert!(f.step().is_empty());
        assert_eq!(f.score(a), 1);
    }

    #[test]
    fn owner_is_never_hit() {
        let mut f = Fixture::new();
        let a = f.player_at(300.0, 300.0);
        f.sim.fire(a, 300.0, 300.0, 0.0, 0.0, 0);

        for _ in 0..5 {
            assert!(f.step().is_empty());
        }
        assert_eq!(f.hp(a), MAX_HP);
        assert_eq!(f.sim.len(), 1);
    }

    #[test]
    fn overlapping_targets_resolve_in_join_order() {
        let mut f = Fixture::new();
        let a = f.player_at(100.0, 100.0);
        let first = f.player_at(400.0, 300.0);
        let second = f.player_at(404.0, 300.0);
        f.sim.fire(a, 402.0, 300.0, 0.0, 0.0, 0);

        let hits = f.step();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target_id, first);
        assert_eq!(f.hp(first), 80);
        assert_eq!(f.hp(second), MAX_HP);
    }

    #[test]
    fn bullets_leaving_the_arena_are_removed() {
        let mut f = Fixture::new();
        let a = f.player_at(100.0, 100.0);
        f.sim.fire(a, 795.0, 300.0, 10.0, 0.0, 0);
        f.sim.fire(a, 400.0, 5.0, 0.0, -10.0, 0);
        f.sim.fire(a, 400.0, 300.0, 10.0, 0.0, 0);

        f.step();
        assert_eq!(f.sim.len(), 1);
        assert_eq!(f.sim.bullets()[0].x, 410.0);
        for bullet in f.sim.bullets() {
            assert!(Bounds::ARENA.contains(bullet.x, bullet.y));
        }
    }

    #[test]
    fn departed_shooter_gets_no_score() {
        let mut f = Fixture::new();
        let a = f.player_at(100.0, 100.0);
        let b = f.player_at(300.0, 300.0);
        f.registry.get_mut(&b).unwrap().hp = 20;
        f.sim.fire(a, 300.0, 300.0, 0.0, 0.0, 0);
        f.registry.remove(a);

        let hits = f.step();
        assert_eq!(hits.len(), 1);
        assert_eq!(f.hp(b), MAX_HP);
        assert!(f
            .outbox
            .messages()
            .all(|m| !matches!(m, ServerMsg::ScoreUpdate { .. })));
    }

    #[test]
    fn health_stays_in_bounds_under_fire() {
        let mut f = Fixture::new();
        let a = f.player_at(100.0, 100.0);
        let b = f.player_at(300.0, 300.0);

        for tick in 0..50 {
            let (x, y) = {
                let p = f.registry.get(&b).unwrap();
                (p.x, p.y)
            };
            f.sim.fire(a, x, y, 0.0, 0.0, tick);
            f.step();
            let hp = f.hp(b);
            assert!(hp <= MAX_HP);
        }
        // Five hits per kill
        assert_eq!(f.score(a), 10);
    }
}
