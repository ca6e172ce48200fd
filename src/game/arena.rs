//! Arena state and the authoritative tick loop

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ArenaConfig;
use crate::util::time::Timer;
use crate::ws::hub::ConnectionHub;

use super::physics::Bounds;
use super::projectile::ProjectileSimulator;
use super::registry::{JoinRequest, PlayerRegistry};
use super::replication::{Outbox, WorldEvent};
use super::round::{RoundLifecycle, RoundPhase, RoundTick};
use super::{ArenaInput, Command, ConnectionId};

/// Everything the simulation owns. Only the arena task mutates it.
pub struct World {
    registry: PlayerRegistry,
    projectiles: ProjectileSimulator,
    round: RoundLifecycle,
    rng: ChaCha8Rng,
    /// Fast ticks simulated so far
    tick: u64,
    reset_scores_each_round: bool,
}

impl World {
    pub fn new(config: &ArenaConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random::<u64>);
        Self {
            registry: PlayerRegistry::new(),
            projectiles: ProjectileSimulator::new(),
            round: RoundLifecycle::new(config.round_secs, config.cooldown_secs),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            reset_scores_each_round: config.reset_scores_each_round,
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn projectiles(&self) -> &ProjectileSimulator {
        &self.projectiles
    }

    pub fn round(&self) -> &RoundLifecycle {
        &self.round
    }

    /// Single entry point for connection-driven mutations
    pub fn apply(&mut self, conn_id: ConnectionId, command: Command, outbox: &mut Outbox) {
        match command {
            Command::Join(request) => self.handle_join(conn_id, request, outbox),
            Command::Move { x, y } => self.handle_move(conn_id, x, y, outbox),
            Command::Rotate { angle } => self.handle_rotate(conn_id, angle, outbox),
            Command::Shoot { x, y, vx, vy } => self.handle_shoot(conn_id, x, y, vx, vy, outbox),
            Command::Disconnect => self.handle_disconnect(conn_id, outbox),
        }
    }

    fn handle_join(&mut self, conn_id: ConnectionId, request: JoinRequest, outbox: &mut Outbox) {
        let outcome = self.registry.join(conn_id, request, &mut self.rng);
        if !outcome.created {
            debug!(conn_id = %conn_id, "Duplicate join ignored");
            return;
        }

        let player = outcome.player.info();
        info!(
            conn_id = %conn_id,
            name = %player.name,
            player_count = self.registry.len(),
            "Player joined arena"
        );

        outbox.emit(WorldEvent::Joined {
            id: conn_id,
            player,
            players: self.registry.snapshot(),
            timer: self.round.timer(),
        });
    }

    fn handle_move(&mut self, conn_id: ConnectionId, x: f32, y: f32, outbox: &mut Outbox) {
        if !self.registry.apply_move(conn_id, x, y) {
            debug!(conn_id = %conn_id, "Move from connection without a player");
            return;
        }
        if !Bounds::MOVEMENT.contains(x, y) {
            debug!(conn_id = %conn_id, x, y, "Reported position outside movement bounds");
        }
        outbox.emit(WorldEvent::Moved { id: conn_id, x, y });
    }

    fn handle_rotate(&mut self, conn_id: ConnectionId, angle: f32, outbox: &mut Outbox) {
        if !self.registry.apply_rotate(conn_id, angle) {
            debug!(conn_id = %conn_id, "Rotate from connection without a player");
            return;
        }
        outbox.emit(WorldEvent::Rotated { id: conn_id, angle });
    }

    fn handle_shoot(
        &mut self,
        conn_id: ConnectionId,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        outbox: &mut Outbox,
    ) {
        if !self.round.is_active() {
            debug!(conn_id = %conn_id, phase = self.round.phase().as_str(), "Shot dropped outside active round");
            return;
        }
        if !self.registry.contains(&conn_id) {
            debug!(conn_id = %conn_id, "Shot from connection without a player");
            return;
        }

        self.projectiles.fire(conn_id, x, y, vx, vy, self.tick);
        outbox.emit(WorldEvent::BulletFired {
            owner: conn_id,
            x,
            y,
            vx,
            vy,
        });
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId, outbox: &mut Outbox) {
        if self.registry.remove(conn_id).is_none() {
            return;
        }
        info!(
            conn_id = %conn_id,
            player_count = self.registry.len(),
            "Player left arena"
        );
        outbox.emit(WorldEvent::Left { id: conn_id });
    }

    /// Advance bullets one step; no-op unless the round is Active
    pub fn fast_tick(&mut self, outbox: &mut Outbox) {
        if !self.round.is_active() {
            return;
        }
        self.tick += 1;
        if self.projectiles.is_empty() {
            return;
        }

        let hits = self
            .projectiles
            .step(self.tick, &mut self.registry, &mut self.rng, outbox);
        for hit in hits.iter().filter(|h| h.target_killed) {
            debug!(
                shooter_id = %hit.shooter_id,
                target_id = %hit.target_id,
                bullet_id = hit.bullet_id,
                "Player eliminated"
            );
        }
    }

    /// Advance the round clock by one slow tick
    pub fn slow_tick(&mut self, outbox: &mut Outbox) {
        match self.round.on_slow_tick() {
            RoundTick::Countdown(seconds) => {
                outbox.emit(WorldEvent::TimerTick { seconds });
            }
            RoundTick::Expired => {
                outbox.emit(WorldEvent::TimerTick { seconds: 0 });
                let ranking = RoundLifecycle::ranking(&self.registry);
                info!(
                    round = self.round.round(),
                    players = ranking.len(),
                    leader = ranking.first().map(|r| r.name.as_str()).unwrap_or("-"),
                    "Round ended"
                );
                outbox.emit(WorldEvent::RoundEnded { ranking });
            }
            RoundTick::Waiting(seconds) => {
                debug!(seconds, "Next round starting soon");
            }
            RoundTick::Restarted => self.begin_round(outbox),
        }
    }

    fn begin_round(&mut self, outbox: &mut Outbox) {
        self.projectiles.clear();
        self.registry
            .reset_for_round(&mut self.rng, self.reset_scores_each_round);

        info!(
            round = self.round.round(),
            players = self.registry.len(),
            "Round started"
        );

        outbox.emit(WorldEvent::RoundStarted {
            round: self.round.round(),
            players: self.registry.snapshot(),
            timer: self.round.timer(),
        });
    }
}

/// Live counters readable outside the arena task
#[derive(Debug, Default)]
pub struct ArenaStats {
    players: AtomicUsize,
    round: AtomicU32,
    timer: AtomicU32,
    phase: AtomicU8,
}

impl ArenaStats {
    fn record(&self, world: &World) {
        let round = world.round();
        self.players.store(world.registry().len(), Ordering::Relaxed);
        self.round.store(round.round(), Ordering::Relaxed);
        self.timer.store(round.timer(), Ordering::Relaxed);
        self.phase.store(round.phase().as_u8(), Ordering::Relaxed);
    }

    pub fn players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    pub fn round(&self) -> u32 {
        self.round.load(Ordering::Relaxed)
    }

    pub fn timer(&self) -> u32 {
        self.timer.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> RoundPhase {
        RoundPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub input_tx: mpsc::Sender<ArenaInput>,
    pub stats: Arc<ArenaStats>,
}

/// The authoritative arena task
pub struct Arena {
    world: World,
    input_rx: mpsc::Receiver<ArenaInput>,
    hub: Arc<ConnectionHub>,
    stats: Arc<ArenaStats>,
    fast_tick: Duration,
    slow_tick: Duration,
}

impl Arena {
    /// Create the arena and its handle
    pub fn new(config: &ArenaConfig, hub: Arc<ConnectionHub>) -> (Self, ArenaHandle) {
        let (input_tx, input_rx) = mpsc::channel(1024);
        let world = World::new(config);
        let stats = Arc::new(ArenaStats::default());
        stats.record(&world);

        let handle = ArenaHandle {
            input_tx,
            stats: stats.clone(),
        };

        let arena = Self {
            world,
            input_rx,
            hub,
            stats,
            fast_tick: config.fast_tick,
            slow_tick: config.slow_tick,
        };

        (arena, handle)
    }

    /// Run until every input sender is dropped.
    ///
    /// Commands, fast ticks and slow ticks are handled one at a time on this
    /// task. A tick that runs late fires once and the missed ones are skipped.
    pub async fn run(mut self) {
        info!(
            round_secs = self.world.round().round_secs(),
            fast_tick_ms = self.fast_tick.as_millis() as u64,
            slow_tick_ms = self.slow_tick.as_millis() as u64,
            "Arena started"
        );

        let start = Instant::now();
        let mut fast = interval_at(start + self.fast_tick, self.fast_tick);
        fast.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut slow = interval_at(start + self.slow_tick, self.slow_tick);
        slow.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut outbox = Outbox::new();

        loop {
            tokio::select! {
                input = self.input_rx.recv() => {
                    let Some(input) = input else { break };
                    self.world.apply(input.conn_id, input.command, &mut outbox);
                }
                _ = fast.tick() => {
                    let timer = Timer::new();
                    self.world.fast_tick(&mut outbox);
                    if timer.elapsed() > self.fast_tick {
                        warn!(
                            elapsed_micros = timer.elapsed_micros(),
                            bullets = self.world.projectiles().len(),
                            "Fast tick overran its interval"
                        );
                    }
                }
                _ = slow.tick() => {
                    self.world.slow_tick(&mut outbox);
                }
            }

            self.flush(&mut outbox);
        }

        info!("Arena stopped");
    }

    fn flush(&mut self, outbox: &mut Outbox) {
        self.stats.record(&self.world);
        for outbound in outbox.drain() {
            self.hub.deliver(outbound);
        }
    }
}
