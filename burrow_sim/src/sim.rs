// Simulation facade: one cave world, its workers, and the scheduler that
// drives them.
//
// `Simulation::new` turns a `SimConfig` into a running world:
//
//   1. seed the world PRNG from `config.seed`;
//   2. generate the caves (density-targeted when the profile asks for it);
//   3. put the player base at the centre of the spawn area;
//   4. scatter resource deposits, enemy markers and unidentified artifacts
//      over open cells at least `min_base_distance` from the base and
//      inside the movement margin;
//   5. build an empty `TickScheduler<UnitController>`.
//
// Workers are added with `spawn_worker`. Each gets the configured stat
// block, the stock worker behaviors, the home base, its own PRNG split off
// the world stream, and a clone of the shared `EventLog`. The log is bounded
// by `event_log_capacity`; frame loops that want every event drain it.
//
// `advance(now_ms)` is the per-frame entry point. It runs whatever ticks
// are due, regrows resources for the game time those ticks covered, and
// removes units that died.
//
// See also: `scheduler.rs` for the accumulator rules, `controller.rs` for
// what one unit does per tick, `world.rs` for the `CaveWorld` it owns.

use crate::behavior::{BehaviorSet, DamageSource};
use crate::config::{ConfigError, PopulationParams, SimConfig};
use crate::controller::{HomeBase, UnitController, UnitTuning};
use crate::entity::Entity;
use crate::event::EventLog;
use crate::scheduler::TickScheduler;
use crate::terrain;
use crate::types::{EntityId, GridCell, ObjectKind, ResourceKind, WorldPoint};
use crate::world::{CaveWorld, World};
use burrow_prng::SimRng;
use rustc_hash::FxHashSet;
use tracing::{info, warn};

const ENEMY_SIZE: f64 = 16.0;
const ENEMY_COLOR: &str = "#d9453b";
const ENEMY_PROPERTIES: [&str; 3] = ["hostile", "armored", "territorial"];
const ARTIFACT_SIZE: f64 = 8.0;
const ARTIFACT_COLOR: &str = "#b48ead";
const ARTIFACT_TRAITS: [&str; 8] = [
    "ancient", "humming", "warm", "magnetic", "fragile", "etched", "hollow", "glowing",
];
const ARTIFACT_TRAIT_COUNT: usize = 3;

pub struct Simulation {
    config: SimConfig,
    rng: SimRng,
    world: CaveWorld,
    scheduler: TickScheduler<UnitController>,
    home: HomeBase,
    next_entity: u32,
    events: EventLog,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = SimRng::new(config.seed);

        let terrain = terrain::build(&config.terrain, &mut rng);
        let spawn = terrain.spawn_cell().center(terrain.tile_size());
        let wall_percent = terrain.wall_percent();
        let mut world = CaveWorld::new(terrain, config.navigation.fallback_radius);

        let base = world.add_base(spawn);
        populate(
            &mut world,
            &config.population,
            config.movement.bounds_margin,
            spawn,
            &mut rng,
        );
        info!(
            seed = config.seed,
            width = config.terrain.width,
            height = config.terrain.height,
            wall_percent,
            objects = world.objects().count(),
            "world generated"
        );

        Ok(Self {
            scheduler: TickScheduler::new(&config.scheduler),
            events: EventLog::bounded(config.event_log_capacity),
            home: HomeBase {
                id: base,
                position: spawn,
            },
            config,
            rng,
            world,
            next_entity: 0,
        })
    }

    /// Add a worker at `position`, or at the base. Returns its id.
    pub fn spawn_worker(&mut self, position: Option<WorldPoint>) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        let position = position.unwrap_or(self.home.position);

        let entity = Entity::new(id, position, self.config.worker.clone());
        let mut controller = UnitController::new(
            entity,
            UnitTuning::from_config(&self.config),
            self.rng.split(),
            Box::new(self.events.clone()),
        )
        .with_behaviors(BehaviorSet::worker_defaults());
        controller.set_base(self.home);

        // Ids are never reused, so this cannot collide.
        self.scheduler.register_entity(id, controller);
        info!(entity = %id, %position, "worker spawned");
        id
    }

    /// Feed a frame timestamp. Returns the number of ticks run.
    pub fn advance(&mut self, now_ms: f64) -> u32 {
        let ticks = self.scheduler.update(now_ms, &mut self.world);
        if ticks > 0 {
            self.world
                .regenerate(ticks as f64 * self.scheduler.tick_interval_ms());
            self.despawn_dead();
        }
        ticks
    }

    fn despawn_dead(&mut self) {
        let dead: Vec<EntityId> = self
            .scheduler
            .entities()
            .filter(|(_, unit)| unit.entity().is_dead())
            .map(|(id, _)| id)
            .collect();
        for id in dead {
            self.scheduler.unregister_entity(id);
            info!(entity = %id, "unit died, despawned");
        }
    }

    /// Damage a unit. `None` for unknown ids, else whether it died. Dead
    /// units leave on the next `advance` that runs a tick.
    pub fn injure_unit(
        &mut self,
        id: EntityId,
        amount: f64,
        source: Option<DamageSource>,
    ) -> Option<bool> {
        let unit = self.scheduler.get_mut(id)?;
        Some(unit.injure(amount, source, &self.world))
    }

    pub fn unit(&self, id: EntityId) -> Option<&UnitController> {
        self.scheduler.get(id)
    }

    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut UnitController> {
        self.scheduler.get_mut(id)
    }

    /// Live units in tick order.
    pub fn units(&self) -> impl Iterator<Item = &UnitController> {
        self.scheduler.entities().map(|(_, unit)| unit)
    }

    pub fn world(&self) -> &CaveWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut CaveWorld {
        &mut self.world
    }

    pub fn scheduler(&self) -> &TickScheduler<UnitController> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TickScheduler<UnitController> {
        &mut self.scheduler
    }

    /// Shared log every spawned unit reports into.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn home(&self) -> HomeBase {
        self.home
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

/// Picks distinct open cells away from the base.
struct Placer {
    spots: Vec<GridCell>,
    used: FxHashSet<GridCell>,
    attempts: u32,
    tile_size: f64,
}

impl Placer {
    fn place(&mut self, rng: &mut SimRng) -> Option<WorldPoint> {
        for _ in 0..self.attempts {
            let cell = *rng.pick(&self.spots)?;
            if self.used.insert(cell) {
                return Some(cell.center(self.tile_size));
            }
        }
        None
    }
}

/// Objects only go where units can stand next to them: open cells whose
/// centre lies inside the movement margin.
fn populate(
    world: &mut CaveWorld,
    params: &PopulationParams,
    margin: f64,
    base: WorldPoint,
    rng: &mut SimRng,
) {
    let tile_size = world.terrain().tile_size();
    let bounds = world.bounds();
    let spots: Vec<GridCell> = world
        .terrain()
        .open_cells()
        .filter(|cell| {
            let center = cell.center(tile_size);
            center.distance(base) >= params.min_base_distance
                && bounds.clamp(center, margin) == center
        })
        .collect();
    if spots.is_empty() {
        warn!(
            min_base_distance = params.min_base_distance,
            "no open cell far enough from the base, world left empty"
        );
        return;
    }
    let mut placer = Placer {
        spots,
        used: FxHashSet::default(),
        attempts: params.placement_attempts,
        tile_size,
    };
    let (low, high) = params.resource_quantity;

    for kind in ResourceKind::ALL {
        for _ in 0..params.resources_per_kind {
            let Some(position) = placer.place(rng) else {
                break;
            };
            let quantity = rng.range_f64(low, high).round();
            world.add_resource(position, kind, quantity);
        }
    }

    for _ in 0..params.enemy_count {
        let Some(position) = placer.place(rng) else {
            break;
        };
        world.add_object(
            position,
            ObjectKind::Enemy,
            ENEMY_SIZE,
            ENEMY_COLOR,
            None,
            ENEMY_PROPERTIES.iter().map(|p| p.to_string()).collect(),
        );
    }

    for _ in 0..params.artifact_count {
        let Some(position) = placer.place(rng) else {
            break;
        };
        let mut traits = ARTIFACT_TRAITS;
        rng.shuffle(&mut traits);
        world.add_object(
            position,
            ObjectKind::Unknown,
            ARTIFACT_SIZE,
            ARTIFACT_COLOR,
            None,
            traits[..ARTIFACT_TRAIT_COUNT]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        );
    }
}
