//! Spawnpool Sim - drives every pool variant through a simulated update loop.
//!
//! An in-memory world stands in for the game engine. Each scenario runs a
//! fixed number of ticks, spawning through a pool and letting the world
//! expire, kill or unload instances behind the pool's back, then reports
//! activation latency and pool counters.
//!
//! Set `RUST_LOG=spawnpool_core=debug` to watch rebuilds and exhaustion.

use std::error::Error;
use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use spawnpool_core::{
    session, ActivationHost, InstanceFactory, OrderedQueue, Pool, PoolConfig, PoolStats,
    RandomizedQueue, SpawnError,
};
use spawnpool_metrics::{ActivationLatency, CycleTimer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TICKS: u64 = 600;

/// Upper bound on spawns issued in a single tick.
const MAX_BATCH: usize = 8;

type Position = (f32, f32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct EntityId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeId(usize);

/// Spawnable blueprint.
#[derive(Clone, Debug)]
struct Archetype {
    name: &'static str,
    poolable: bool,
    /// Ticks an entity stays active after being enabled.
    lifetime: u32,
}

impl Archetype {
    const fn new(name: &'static str, lifetime: u32) -> Self {
        Self {
            name,
            poolable: true,
            lifetime,
        }
    }
}

#[derive(Debug)]
struct Entity {
    label: u32,
    archetype: &'static str,
    alive: bool,
    active: bool,
    position: Position,
    lifetime: u32,
    ttl: u32,
    variant: usize,
    health: i32,
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    alive: bool,
}

/// In-memory scene graph.
#[derive(Debug, Default)]
struct World {
    entities: Vec<Entity>,
    nodes: Vec<Node>,
    /// Instantiations still to refuse.
    refusals: usize,
}

impl World {
    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0).filter(|e| e.alive)
    }

    /// Restart an entity's time-to-live.
    fn rearm(&mut self, id: EntityId) {
        if let Some(entity) = self.entity_mut(id) {
            entity.ttl = entity.lifetime;
        }
    }

    fn set_variant(&mut self, id: EntityId, variant: usize) {
        if let Some(entity) = self.entity_mut(id) {
            entity.variant = variant;
        }
    }

    fn set_health(&mut self, id: EntityId, health: i32) {
        if let Some(entity) = self.entity_mut(id) {
            entity.health = health;
        }
    }

    /// Refuse the next `count` instantiations.
    fn refuse_next(&mut self, count: usize) {
        self.refusals += count;
    }

    /// One frame: tick down lifetimes and deactivate what expired.
    fn advance(&mut self) -> usize {
        let mut expired = 0;
        for entity in self.entities.iter_mut().filter(|e| e.alive && e.active) {
            entity.ttl = entity.ttl.saturating_sub(1);
            if entity.ttl == 0 {
                entity.active = false;
                expired += 1;
            }
        }
        expired
    }

    /// Hit every active entity of `archetype`; those reaching zero health go inactive.
    fn damage(&mut self, archetype: &str, amount: i32) -> usize {
        let mut defeated = 0;
        for entity in self
            .entities
            .iter_mut()
            .filter(|e| e.alive && e.active && e.archetype == archetype)
        {
            entity.health -= amount;
            if entity.health <= 0 {
                entity.active = false;
                defeated += 1;
            }
        }
        defeated
    }

    /// Destroy up to `limit` live entities of `archetype` in the western half
    /// of the map, without telling any pool.
    fn unload(&mut self, archetype: &str, limit: usize) -> usize {
        let mut destroyed = 0;
        for entity in self
            .entities
            .iter_mut()
            .filter(|e| e.alive && e.archetype == archetype && e.position.0 < 50.0)
            .take(limit)
        {
            entity.alive = false;
            entity.active = false;
            destroyed += 1;
        }
        destroyed
    }

    fn live_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive).count()
    }

    fn active_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive && e.active).count()
    }

    fn live_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }
}

impl InstanceFactory for World {
    type Template = Archetype;
    type Instance = EntityId;
    type Container = NodeId;

    fn has_capability(&self, template: &Archetype) -> bool {
        template.poolable
    }

    fn create_container(&mut self, name: &str, parent: Option<&NodeId>) -> NodeId {
        self.nodes.push(Node {
            name: name.to_string(),
            parent: parent.copied(),
            alive: true,
        });
        NodeId(self.nodes.len() - 1)
    }

    fn instantiate(&mut self, template: &Archetype, _container: &NodeId) -> Result<EntityId, SpawnError> {
        if self.refusals > 0 {
            self.refusals -= 1;
            return Err(SpawnError::new(format!("{} refused by world budget", template.name)));
        }

        self.entities.push(Entity {
            label: session::next_id(),
            archetype: template.name,
            alive: true,
            active: true,
            position: (0.0, 0.0),
            lifetime: template.lifetime,
            ttl: 0,
            variant: 0,
            health: 0,
        });
        Ok(EntityId(self.entities.len() - 1))
    }

    fn is_alive(&self, instance: &EntityId) -> bool {
        self.entities.get(instance.0).map_or(false, |e| e.alive)
    }

    fn destroy(&mut self, instance: EntityId) {
        if let Some(entity) = self.entities.get_mut(instance.0) {
            entity.alive = false;
            entity.active = false;
        }
    }

    fn destroy_container(&mut self, container: NodeId) {
        if let Some(node) = self.nodes.get_mut(container.0) {
            node.alive = false;
        }
    }
}

impl ActivationHost for World {
    type Placement = Position;

    fn is_active(&self, instance: &EntityId) -> bool {
        self.entities
            .get(instance.0)
            .map_or(false, |e| e.alive && e.active)
    }

    fn set_active(&mut self, instance: &EntityId, active: bool) {
        if let Some(entity) = self.entities.get_mut(instance.0) {
            entity.active = active;
        }
    }

    fn place(&mut self, instance: &EntityId, placement: Position) {
        if let Some(entity) = self.entities.get_mut(instance.0) {
            entity.position = placement;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum EnemyKind {
    Grunt,
    Brute,
    Flyer,
}

impl EnemyKind {
    const ALL: [EnemyKind; 3] = [EnemyKind::Grunt, EnemyKind::Brute, EnemyKind::Flyer];

    fn health(self) -> i32 {
        match self {
            EnemyKind::Grunt => 3,
            EnemyKind::Brute => 12,
            EnemyKind::Flyer => 5,
        }
    }
}

/// Deterministic spawn positions for one tick, capped at [`MAX_BATCH`].
fn spawn_batch(tick: u64, wanted: usize) -> ArrayVec<Position, MAX_BATCH> {
    let mut batch = ArrayVec::new();
    for i in 0..wanted as u64 {
        let x = ((tick * 7 + i * 13) % 100) as f32;
        let y = ((tick * 3 + i * 29) % 60) as f32;
        if batch.try_push((x, y)).is_err() {
            break;
        }
    }
    batch
}

/// Result of one scenario.
struct Outcome {
    name: &'static str,
    latency: ActivationLatency,
    stats: PoolStats,
    capacity: usize,
    peak_active: usize,
    failed_requests: u64,
    elapsed: Duration,
}

impl Outcome {
    fn print(&self) {
        let s = &self.stats;
        println!("   Capacity:           {:>8}", self.capacity);
        println!("   Peak active:        {:>8}", self.peak_active);
        println!("   Activations:        {:>8}", s.activations);
        println!("   Failed requests:    {:>8}", self.failed_requests);
        println!("   Exhausted:          {:>8}", s.exhausted);
        println!("   Rebuilds:           {:>8}", s.rebuilds);
        println!("   Growths:            {:>8}", s.growths);
        println!("   Creation failures:  {:>8}", s.creation_failures);
        println!("   Ran {} ticks in {:.2?}", TICKS, self.elapsed);
        for line in self.latency.report(format!("{} latency", self.name)).to_string().lines() {
            println!("   {}", line);
        }
    }
}

/// Flexible projectile pool; the world expires projectiles after their lifetime.
fn run_projectiles(world: &mut World, root: NodeId) -> Result<Outcome, Box<dyn Error>> {
    let config = PoolConfig::<World>::builder("Projectiles")
        .size(32)
        .increment(16)
        .parent(root)
        .on_enable(|world, id| world.rearm(*id))
        .build();
    let mut pool = Pool::flexible(config, Archetype::new("projectile", 30), OrderedQueue::new(), world)?;

    let timer = CycleTimer::new();
    let mut latency = ActivationLatency::new()?;
    let mut failed = 0u64;
    let mut peak = 0usize;
    let start = Instant::now();

    for tick in 0..TICKS {
        let wanted = 2 + (tick % 5) as usize * 2;
        for position in spawn_batch(tick, wanted) {
            if timer.time(&mut latency, || pool.try_activate(world, position)).is_err() {
                failed += 1;
            }
        }
        peak = peak.max(world.active_count());
        world.advance();
    }

    let outcome = Outcome {
        name: "Projectiles",
        latency,
        stats: pool.stats(),
        capacity: pool.capacity(),
        peak_active: peak,
        failed_requests: failed,
        elapsed: start.elapsed(),
    };
    pool.destroy_all(world, true);
    Ok(outcome)
}

/// Fixed debris pool of four shard sizes served in shuffled order.
fn run_debris(world: &mut World, root: NodeId) -> Result<Outcome, Box<dyn Error>> {
    let config = PoolConfig::<World>::builder("Debris")
        .distribution_auto(120, 4)?
        .parent(root)
        .on_create(|world, id, kind| world.set_variant(*id, kind))
        .on_enable(|world, id| world.rearm(*id))
        .build();
    info!(counts = ?config.distribution().counts(), "Debris distribution");

    let templates = vec![
        Archetype::new("shard", 20),
        Archetype::new("shard", 40),
        Archetype::new("shard", 60),
        Archetype::new("shard", 90),
    ];
    let mut pool = Pool::distributed(config, templates, RandomizedQueue::with_seed(0x5EED), world)?;

    let timer = CycleTimer::new();
    let mut latency = ActivationLatency::new()?;
    let mut failed = 0u64;
    let mut peak = 0usize;
    let start = Instant::now();

    for tick in 0..TICKS {
        // An explosion every 15 ticks, a trickle otherwise.
        let wanted = if tick % 15 == 0 { MAX_BATCH } else { 1 };
        for position in spawn_batch(tick, wanted) {
            if timer.time(&mut latency, || pool.try_activate(world, position)).is_err() {
                failed += 1;
            }
        }
        peak = peak.max(world.active_count());
        world.advance();
    }

    let mut by_size = [0usize; 4];
    for entity in world.entities.iter().filter(|e| e.alive && e.archetype == "shard") {
        by_size[entity.variant] += 1;
    }
    info!(?by_size, "Debris slots per shard size");

    let outcome = Outcome {
        name: "Debris",
        latency,
        stats: pool.stats(),
        capacity: pool.capacity(),
        peak_active: peak,
        failed_requests: failed,
        elapsed: start.elapsed(),
    };
    pool.destroy_all(world, true);
    Ok(outcome)
}

/// Category pool of enemy types; health is set between reserve and commit.
fn run_enemies(world: &mut World, root: NodeId) -> Result<Outcome, Box<dyn Error>> {
    let config = PoolConfig::<World>::builder("Enemies")
        .distribution_manual([24, 8, 8])
        .parent(root)
        .on_enable(|world, id| world.rearm(*id))
        .build();
    let mut pool = Pool::by_category(
        config,
        vec![
            (EnemyKind::Grunt, Archetype::new("enemy", 400)),
            (EnemyKind::Brute, Archetype::new("enemy", 400)),
            (EnemyKind::Flyer, Archetype::new("enemy", 400)),
        ],
        world,
    )?;

    let timer = CycleTimer::new();
    let mut latency = ActivationLatency::new()?;
    let mut failed = 0u64;
    let mut peak = 0usize;
    let start = Instant::now();

    for tick in 0..TICKS {
        if tick % 4 == 0 {
            for (i, position) in spawn_batch(tick, 3).into_iter().enumerate() {
                let kind = EnemyKind::ALL[(tick as usize / 4 + i) % EnemyKind::ALL.len()];
                let begin = timer.start();
                let spawned = pool.select_and_reserve(&kind, world).and_then(|reservation| {
                    world.set_health(*reservation.instance(), kind.health());
                    pool.commit_enable(world, reservation, position)
                });
                latency.record(timer.elapsed_nanos(begin));
                if spawned.is_err() {
                    failed += 1;
                }
            }
        }
        peak = peak.max(world.active_count());
        world.damage("enemy", 1);
        world.advance();
    }

    let outcome = Outcome {
        name: "Enemies",
        latency,
        stats: pool.stats(),
        capacity: pool.capacity(),
        peak_active: peak,
        failed_requests: failed,
        elapsed: start.elapsed(),
    };
    pool.destroy_all(world, true);
    Ok(outcome)
}

/// Fixed pickup pool under a hostile world: refused spawns at start-up and
/// periodic unloads that destroy pooled instances behind the pool's back.
fn run_pickups(world: &mut World, root: NodeId) -> Result<Outcome, Box<dyn Error>> {
    world.refuse_next(2);
    let config = PoolConfig::<World>::builder("Pickups")
        .size(16)
        .parent(root)
        .on_enable(|world, id| world.rearm(*id))
        .build();
    let mut pool = Pool::fixed(config, Archetype::new("pickup", 12), OrderedQueue::new(), world)?;

    let timer = CycleTimer::new();
    let mut latency = ActivationLatency::new()?;
    let mut failed = 0u64;
    let mut peak = 0usize;
    let start = Instant::now();

    for tick in 0..TICKS {
        if tick > 0 && tick % 100 == 0 {
            let unloaded = world.unload("pickup", 2);
            info!(tick, unloaded, "World unloaded pickups");
        }
        for position in spawn_batch(tick, 1) {
            if timer.time(&mut latency, || pool.try_activate(world, position)).is_err() {
                failed += 1;
            }
        }
        peak = peak.max(world.active_count());
        world.advance();
    }

    let outcome = Outcome {
        name: "Pickups",
        latency,
        stats: pool.stats(),
        capacity: pool.capacity(),
        peak_active: peak,
        failed_requests: failed,
        elapsed: start.elapsed(),
    };
    pool.destroy_all(world, true);
    Ok(outcome)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                       SPAWNPOOL SIM                          ║");
    println!("║             Pooled Activation Under a Game Loop              ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    session::begin();
    let mut world = World::default();
    let root = world.create_container("Pools", None);

    let scenarios: [(&str, fn(&mut World, NodeId) -> Result<Outcome, Box<dyn Error>>); 4] = [
        ("flexible projectiles", run_projectiles),
        ("randomized debris", run_debris),
        ("two-phase enemies", run_enemies),
        ("pickups under unloads", run_pickups),
    ];

    let mut outcomes = Vec::with_capacity(scenarios.len());
    for (step, (title, run)) in scenarios.iter().enumerate() {
        println!("[{}/{}] Running {}...", step + 1, scenarios.len(), title);
        let outcome = run(&mut world, root)?;
        outcome.print();
        println!();
        outcomes.push(outcome);
    }

    let mut overall = ActivationLatency::new()?;
    for outcome in &outcomes {
        overall.merge(&outcome.latency)?;
    }

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                        SIM SUMMARY                           ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    for outcome in &outcomes {
        println!(
            "║  {:<12} {:>8} activations {:>6} failed {:>6} grown  ║",
            outcome.name, outcome.stats.activations, outcome.failed_requests, outcome.stats.growths
        );
    }
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Overall P50:     {:>12}                               ║", spawnpool_metrics::format_latency(overall.p50()));
    println!("║  Overall P99:     {:>12}                               ║", spawnpool_metrics::format_latency(overall.p99()));
    println!("║  Entities spawned:{:>12}                               ║", world.entities.len());
    println!("║  Last session id: {:>12}                               ║", world.entities.last().map_or(0, |e| e.label));
    println!("║  Live after teardown: {:>8} entities {:>4} containers     ║", world.live_count(), world.live_nodes());
    println!("╚══════════════════════════════════════════════════════════════╝");

    let leaked = world.live_count();
    println!();
    if leaked == 0 && world.live_nodes() == 1 {
        println!("✅ PASS: every pooled instance and container torn down");
    } else {
        println!("❌ LEAK: {} entities still alive", leaked);
    }

    if let Some(pools) = world.nodes.iter().find(|n| n.parent == Some(root)) {
        info!(first_pool_container = %pools.name, "Containers were parented under the root");
    }
    Ok(())
}
