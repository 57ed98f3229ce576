// Per-unit behavior engine.
//
// A `UnitController` owns one `Entity` and everything private to it: its
// behavior callbacks, fog of war, perception memory, home base, route,
// cadence timers, clock, PRNG stream, and event sink. The world is never
// stored; every operation that needs it takes a `World` handle argument.
//
// ## Update cadence
//
// Each `update(dt)` call runs, in order:
//
//   1. health regeneration and one straight-line movement step towards the
//      destination (or the next waypoint of a route);
//   2. a fog-of-war refresh, once 200ms have accumulated;
//   3. a perception scan, once 250ms have accumulated;
//   4. decision execution, once 400ms have accumulated.
//
// The three slower timers accumulate independently and each resets to zero
// when it fires, so irregular `dt` values still fire every cadence at its
// own boundary.
//
// ## State machine
//
// States only change through `dispatch()`, which turns an `ActionDescriptor`
// into a destination, a state and (for analyze, gather, return) a task, or
// through the built-in arrival and task handlers: a `moving` unit that
// arrives becomes `idle`, a `gathering` unit that arrives mines what is in
// reach, and a `returning` unit that arrives at its base starts
// `depositing`. A dispatch that cannot be carried out (unknown object, no
// base, non-finite target) changes nothing and is reported exactly like a
// failing callback.
//
// ## Movement
//
// Movement is blocked (no position change, destination kept) when the next
// point is a wall. With `movement.reroute_on_collision` the controller then
// asks the world for a grid path and follows its waypoints; reaching the
// last waypoint counts as arriving. When no path exists the destination is
// abandoned and the unit goes idle.
//
// See also: `behavior.rs` for descriptors and callbacks, `perception.rs` for
// fog and memory, `scheduler.rs` which drives `update` through `Tickable`.

use crate::behavior::{
    ActionDescriptor, BehaviorContext, BehaviorEvent, BehaviorFn, BehaviorSet, DamageSource,
};
use crate::config::{CadenceParams, GatheringParams, MovementParams, PerceptionParams, SimConfig};
use crate::entity::Entity;
use crate::error::{BehaviorError, TickError};
use crate::event::{EventSink, UnitEvent, UnitEventKind};
use crate::perception::{AnalysisStep, FogOfWar, PerceivedObject, PerceptionMemory, Sighting};
use crate::scheduler::Tickable;
use crate::task::{Task, TaskKind};
use crate::types::{BaseId, Bounds, EntityId, ObjectId, ObjectKind, UnitState, WorldPoint};
use crate::world::World;
use burrow_prng::SimRng;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// The config groups a controller reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitTuning {
    pub cadence: CadenceParams,
    pub movement: MovementParams,
    pub perception: PerceptionParams,
    pub gathering: GatheringParams,
}

impl UnitTuning {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            cadence: config.cadence.clone(),
            movement: config.movement.clone(),
            perception: config.perception.clone(),
            gathering: config.gathering.clone(),
        }
    }
}

/// Where a unit returns its cargo.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HomeBase {
    pub id: BaseId,
    pub position: WorldPoint,
}

#[derive(Clone, Copy, Debug, Default)]
struct CadenceTimers {
    fog_ms: f64,
    perception_ms: f64,
    decision_ms: f64,
}

pub struct UnitController {
    entity: Entity,
    behaviors: BehaviorSet,
    fog: FogOfWar,
    memory: PerceptionMemory,
    base: Option<HomeBase>,
    /// Remaining waypoints, next first. Empty when steering straight.
    route: VecDeque<WorldPoint>,
    /// Steps towards the current destination that went nowhere.
    stalled_steps: u32,
    timers: CadenceTimers,
    clock_ms: f64,
    rng: SimRng,
    tuning: UnitTuning,
    sink: Box<dyn EventSink>,
}

impl UnitController {
    /// A controller with no behaviors registered.
    pub fn new(entity: Entity, tuning: UnitTuning, rng: SimRng, sink: Box<dyn EventSink>) -> Self {
        Self {
            fog: FogOfWar::new(
                tuning.perception.fog_cell_size,
                tuning.perception.fog_enabled,
            ),
            memory: PerceptionMemory::new(tuning.perception.memory_capacity),
            entity,
            behaviors: BehaviorSet::new(),
            base: None,
            route: VecDeque::new(),
            stalled_steps: 0,
            timers: CadenceTimers::default(),
            clock_ms: 0.0,
            rng,
            tuning,
            sink,
        }
    }

    pub fn with_behaviors(mut self, behaviors: BehaviorSet) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    pub fn behaviors_mut(&mut self) -> &mut BehaviorSet {
        &mut self.behaviors
    }

    pub fn fog(&self) -> &FogOfWar {
        &self.fog
    }

    pub fn memory(&self) -> &PerceptionMemory {
        &self.memory
    }

    pub fn base(&self) -> Option<HomeBase> {
        self.base
    }

    /// Waypoints still to visit, next first.
    pub fn route(&self) -> impl Iterator<Item = &WorldPoint> {
        self.route.iter()
    }

    /// Game time this unit has been updated for, in ms.
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Register a callback by its script-facing event name. Returns `false`
    /// for unknown names.
    pub fn set_behavior(&mut self, event_name: &str, callback: BehaviorFn) -> bool {
        match event_name.parse::<BehaviorEvent>() {
            Ok(event) => {
                self.behaviors.set_boxed(event, callback);
                true
            }
            Err(_) => {
                debug!(entity = %self.entity.id, event_name, "ignoring unknown behavior event");
                false
            }
        }
    }

    pub fn set_base(&mut self, base: HomeBase) {
        self.base = Some(base);
    }

    pub fn set_fog_of_war(&mut self, enabled: bool) {
        self.fog.set_enabled(enabled);
    }

    /// Everything this unit remembers, in id order.
    pub fn perception_map(&self) -> Vec<&PerceivedObject> {
        self.memory.iter().collect()
    }

    pub fn forget_object(&mut self, id: ObjectId) -> bool {
        self.memory.forget(id).is_some()
    }

    // -----------------------------------------------------------------------
    // Update loop
    // -----------------------------------------------------------------------

    /// Advance this unit by `dt_ms` of game time.
    pub fn update<W: World>(&mut self, dt_ms: f64, world: &mut W) -> Result<(), TickError> {
        if !self.entity.position.is_finite() {
            return Err(TickError::Entity {
                entity: self.entity.id,
                reason: format!("position {} is not finite", self.entity.position),
            });
        }
        if self.entity.is_dead() || dt_ms <= 0.0 {
            return Ok(());
        }

        self.clock_ms += dt_ms;
        self.entity
            .heal(self.entity.stats.regen_speed * dt_ms / 1000.0);
        self.step_movement(dt_ms, world);

        self.timers.fog_ms += dt_ms;
        if self.timers.fog_ms >= self.tuning.cadence.fog_interval_ms {
            self.timers.fog_ms = 0.0;
            self.refresh_fog();
        }

        self.timers.perception_ms += dt_ms;
        if self.timers.perception_ms >= self.tuning.cadence.perception_interval_ms {
            self.timers.perception_ms = 0.0;
            self.scan_perception(&*world);
        }

        self.timers.decision_ms += dt_ms;
        if self.timers.decision_ms >= self.tuning.cadence.decision_interval_ms {
            self.timers.decision_ms = 0.0;
            self.execute_behavior(world);
        }

        Ok(())
    }

    fn step_movement<W: World>(&mut self, dt_ms: f64, world: &mut W) {
        let Some(destination) = self.entity.destination else {
            self.entity.is_moving = false;
            return;
        };
        if self.entity.distance_to(destination) <= self.tuning.movement.arrival_radius {
            self.arrive(world);
            return;
        }

        let before = self.entity.position;
        self.advance_towards(destination, dt_ms, world);

        if self.entity.destination.is_none()
            || self.entity.position != before
            || !self.tuning.movement.reroute_on_collision
        {
            return;
        }
        self.stalled_steps += 1;
        if self.stalled_steps >= self.tuning.movement.stall_limit {
            debug!(entity = %self.entity.id, %destination, "no progress, giving up");
            self.abandon_destination();
        }
    }

    /// One straight step towards the next waypoint, or the destination when
    /// there is no route.
    fn advance_towards<W: World>(&mut self, destination: WorldPoint, dt_ms: f64, world: &mut W) {
        let target = self.route.front().copied().unwrap_or(destination);
        let step = self.entity.effective_speed(&self.tuning.movement) * dt_ms / 1000.0;
        let heading = self.entity.position.angle_to(target);
        self.entity.direction = heading;
        let next = if step >= self.entity.distance_to(target) {
            target
        } else {
            self.entity.position.offset(heading, step)
        };
        let next = world.bounds().clamp(next, self.tuning.movement.bounds_margin);

        if world.is_wall(next) {
            if !self.route.is_empty() {
                // Off the planned corridor; plan again on the next step.
                self.route.clear();
            } else if self.tuning.movement.reroute_on_collision {
                self.reroute(destination, world);
            }
            return;
        }

        self.entity.position = next;
        self.entity.is_moving = true;

        if !self.route.is_empty()
            && self.entity.distance_to(target) <= self.tuning.movement.waypoint_radius
        {
            self.route.pop_front();
            if self.route.is_empty() {
                self.arrive(world);
            }
        }
    }

    /// Plan a grid path to `destination`. Waypoints are pulled inside the
    /// movement margin; a path that needs a margin cell which is rock
    /// there counts as unreachable.
    fn reroute<W: World>(&mut self, destination: WorldPoint, world: &mut W) {
        let bounds = world.bounds();
        let margin = self.tuning.movement.bounds_margin;
        let path = world.find_path(self.entity.position, destination).and_then(|path| {
            let mut route = VecDeque::with_capacity(path.len());
            for waypoint in path {
                let waypoint = bounds.clamp(waypoint, margin);
                if world.is_wall(waypoint) {
                    return None;
                }
                if route.back() != Some(&waypoint) {
                    route.push_back(waypoint);
                }
            }
            Some(route)
        });
        match path {
            Some(route) => {
                debug!(entity = %self.entity.id, waypoints = route.len(), "rerouting around wall");
                self.route = route;
            }
            None => {
                debug!(entity = %self.entity.id, %destination, "destination unreachable, giving up");
                self.abandon_destination();
            }
        }
    }

    fn abandon_destination(&mut self) {
        self.entity.destination = None;
        self.entity.is_moving = false;
        self.entity.current_task = None;
        self.route.clear();
        self.stalled_steps = 0;
        self.transition(UnitState::Idle);
    }

    fn arrive<W: World>(&mut self, world: &mut W) {
        self.stalled_steps = 0;
        self.entity.destination = None;
        self.entity.is_moving = false;
        self.route.clear();
        self.emit(UnitEventKind::DestinationReached);

        match self.entity.state() {
            UnitState::Moving => self.transition(UnitState::Idle),
            UnitState::Gathering => {
                self.gather_nearby(world);
            }
            UnitState::Returning => self.begin_deposit(),
            _ => {}
        }
    }

    fn refresh_fog(&mut self) {
        let fresh = self
            .fog
            .refresh(self.entity.position, self.entity.stats.perception_radius);
        for cell in fresh {
            self.emit(UnitEventKind::AreaExplored { cell });
        }
    }

    fn scan_perception<W: World>(&mut self, world: &W) {
        let origin = self.entity.position;
        let now = self.clock_ms;
        let mut first_seen = Vec::new();
        for object in world.objects_in_radius(origin, self.entity.stats.perception_radius, None) {
            if !self.fog.is_visible(object.position) {
                continue;
            }
            if self.memory.observe(object, origin, now) == Sighting::New {
                first_seen.push(object.id);
            }
        }

        for id in first_seen {
            let Some(perceived) = self.memory.get(id).cloned() else {
                continue;
            };
            self.emit(UnitEventKind::NewObjectPerceived { object: id });
            let (kind, position, resource) = (perceived.kind, perceived.position, perceived.resource);
            self.run_behavior(
                BehaviorContext::NewObjectPerceived { object: perceived },
                world,
            );
            match kind {
                ObjectKind::Resource => self.run_behavior(
                    BehaviorContext::ResourceSpotted {
                        object: id,
                        resource,
                        position,
                    },
                    world,
                ),
                ObjectKind::Enemy => self.run_behavior(
                    BehaviorContext::EnemySpotted {
                        object: id,
                        position,
                    },
                    world,
                ),
                ObjectKind::Obstacle | ObjectKind::Unknown => {}
            }
        }
    }

    /// The decision cadence.
    fn execute_behavior<W: World>(&mut self, world: &mut W) {
        if self.entity.is_moving {
            return;
        }
        match self.entity.current_task.map(|t| t.kind) {
            Some(TaskKind::Analyze { object }) if self.entity.state() == UnitState::Analyzing => {
                self.continue_analysis(object, world);
            }
            Some(TaskKind::Analyze { .. }) => {
                self.entity.current_task = None;
                self.run_behavior(BehaviorContext::Idle, world);
            }
            Some(TaskKind::Gather { resource }) => self.continue_gathering(resource, world),
            Some(TaskKind::Deposit { base }) => self.continue_deposit(base, world),
            None => self.run_behavior(BehaviorContext::Idle, world),
        }
    }

    // -----------------------------------------------------------------------
    // Behaviors and dispatch
    // -----------------------------------------------------------------------

    fn run_behavior<W: World>(&mut self, context: BehaviorContext, world: &W) {
        let event = context.event();
        let Some(result) = self.behaviors.invoke(&self.entity, &context) else {
            return;
        };
        let outcome = match result {
            Ok(Some(action)) => self.dispatch(action, world),
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            warn!(entity = %self.entity.id, %event, %err, "behavior failed");
            self.emit(UnitEventKind::BehaviorFailed {
                event,
                reason: err.to_string(),
            });
        }
    }

    /// Apply an action to the unit. On error nothing has changed.
    pub fn dispatch<W: World>(
        &mut self,
        action: ActionDescriptor,
        world: &W,
    ) -> Result<(), BehaviorError> {
        let bounds = world.bounds();
        match &action {
            ActionDescriptor::Move { target }
            | ActionDescriptor::Approach { target }
            | ActionDescriptor::Flee { target } => self.go_to(*target, UnitState::Moving, bounds)?,
            ActionDescriptor::Gather { target, resource } => {
                self.go_to(*target, UnitState::Gathering, bounds)?;
                self.assign(TaskKind::Gather {
                    resource: *resource,
                });
            }
            ActionDescriptor::Attack { target } | ActionDescriptor::MoveAndAttack { target, .. } => {
                self.go_to(*target, UnitState::Attacking, bounds)?
            }
            ActionDescriptor::ReturnToBase => self.return_to_base(bounds)?,
            ActionDescriptor::Analyze { object } => {
                let position = self
                    .memory
                    .get(*object)
                    .ok_or(BehaviorError::UnknownObject(*object))?
                    .position;
                self.go_to(position, UnitState::Analyzing, bounds)?;
                self.assign(TaskKind::Analyze { object: *object });
            }
            ActionDescriptor::Explore => {
                let target = self.exploration_target(world);
                self.go_to(target, UnitState::Exploring, bounds)?;
            }
        }
        debug!(entity = %self.entity.id, ?action, "action dispatched");
        self.emit(UnitEventKind::ActionDispatched { action });
        Ok(())
    }

    /// Head for `target` in `state`. Clears any task and route. The target
    /// is pulled inside the movement margin, where every step lands.
    fn go_to(
        &mut self,
        target: WorldPoint,
        state: UnitState,
        bounds: Bounds,
    ) -> Result<(), BehaviorError> {
        if !target.is_finite() {
            return Err(BehaviorError::InvalidTarget(target));
        }
        self.head_for(bounds.clamp(target, self.tuning.movement.bounds_margin));
        self.entity.current_task = None;
        self.transition(state);
        Ok(())
    }

    fn head_for(&mut self, target: WorldPoint) {
        self.entity.destination = Some(target);
        self.entity.is_moving = true;
        self.route.clear();
        self.stalled_steps = 0;
    }

    fn return_to_base(&mut self, bounds: Bounds) -> Result<(), BehaviorError> {
        let base = self.base.ok_or(BehaviorError::NoBase)?;
        self.go_to(base.position, UnitState::Returning, bounds)?;
        self.assign(TaskKind::Deposit { base: base.id });
        Ok(())
    }

    fn exploration_target<W: World>(&mut self, world: &W) -> WorldPoint {
        let radius = self.entity.stats.perception_radius;
        let heading = self
            .fog
            .unexplored_heading(
                self.entity.position,
                radius,
                self.tuning.perception.explore_search_padding,
                &mut self.rng,
            )
            .unwrap_or_else(|| self.rng.angle());
        let leg = radius * self.tuning.perception.explore_distance_factor;
        world.bounds().clamp(
            self.entity.position.offset(heading, leg),
            self.tuning.movement.bounds_margin,
        )
    }

    fn assign(&mut self, kind: TaskKind) {
        self.entity.current_task = Some(Task::new(kind, self.clock_ms));
    }

    fn go_idle(&mut self) {
        self.entity.current_task = None;
        self.transition(UnitState::Idle);
    }

    fn transition(&mut self, state: UnitState) {
        let from = self.entity.state();
        if self.entity.set_state(state) {
            debug!(entity = %self.entity.id, %from, to = %state, "state change");
        }
    }

    fn emit(&mut self, kind: UnitEventKind) {
        self.sink.record(UnitEvent {
            entity: self.entity.id,
            at_ms: self.clock_ms,
            kind,
        });
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    /// One analysis step on a remembered object. Fails when the object is
    /// gone, was never perceived, or is out of interaction range.
    pub fn analyze_object<W: World>(&mut self, object: ObjectId, world: &W) -> bool {
        let Some(source) = world.object(object) else {
            return false;
        };
        if self.entity.distance_to(source.position) > self.tuning.perception.interaction_range {
            return false;
        }
        let increment = self.tuning.perception.analysis_base_rate
            + self.entity.stats.perception / self.tuning.perception.analysis_perception_divisor;
        match self.memory.analyze(object, source, increment, self.clock_ms) {
            Some(AnalysisStep::Partial(percentage)) => {
                self.emit(UnitEventKind::ObjectAnalyzed { object, percentage });
                true
            }
            Some(AnalysisStep::Completed) => {
                self.emit(UnitEventKind::ObjectFullyAnalyzed { object });
                true
            }
            Some(AnalysisStep::AlreadyAnalyzed) => true,
            None => false,
        }
    }

    fn continue_analysis<W: World>(&mut self, object: ObjectId, world: &W) {
        if self.analyze_object(object, world) {
            if self.memory.get(object).is_some_and(|o| o.analyzed) {
                self.go_idle();
            }
            return;
        }
        let last_known = self.memory.get(object).map(|o| o.position);
        match (last_known, world.object(object)) {
            (Some(position), Some(_)) => {
                self.head_for(world.bounds().clamp(position, self.tuning.movement.bounds_margin));
            }
            _ => {
                debug!(entity = %self.entity.id, %object, "analysis target lost");
                self.go_idle();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Gathering and deposits
    // -----------------------------------------------------------------------

    /// Mine one load from `object`. Returns the amount stored, or `None`
    /// when the object is missing, not a resource, or out of reach.
    ///
    /// Afterwards the unit heads home if full, keeps gathering if the
    /// deposit has more, and goes idle otherwise.
    pub fn gather_resource<W: World>(&mut self, object: ObjectId, world: &mut W) -> Option<f64> {
        let (kind, available, position) = {
            let found = world.object(object)?;
            let deposit = found.resource.as_ref()?;
            (deposit.kind, deposit.quantity, found.position)
        };
        if self.entity.distance_to(position) > self.tuning.gathering.gather_radius {
            return None;
        }

        let wanted = self
            .entity
            .stats
            .gathering_speed
            .min(available)
            .min(self.entity.remaining_capacity());
        let mut stored = 0.0;
        if wanted > 0.0 {
            let taken = world.extract_resource(object, wanted);
            stored = self
                .entity
                .store(kind, taken * self.entity.stats.mining_efficiency);
            self.emit(UnitEventKind::ResourceGathered {
                object,
                resource: kind,
                amount: stored,
            });
            let levels = self
                .entity
                .gain_experience(stored * self.tuning.gathering.xp_per_unit);
            if levels > 0 {
                self.emit(UnitEventKind::LeveledUp {
                    level: self.entity.level,
                });
            }
        }

        let more_left = world.object(object).is_some_and(|o| o.is_minable());
        if self.entity.is_full() {
            if self.return_to_base(world.bounds()).is_err() {
                self.go_idle();
            }
        } else if more_left {
            self.transition(UnitState::Gathering);
            self.assign(TaskKind::Gather {
                resource: Some(object),
            });
        } else {
            self.go_idle();
        }
        Some(stored)
    }

    /// Mine the task's deposit if it is in reach, else the nearest minable
    /// one. Goes idle when nothing is in reach.
    fn gather_nearby<W: World>(&mut self, world: &mut W) -> Option<f64> {
        let radius = self.tuning.gathering.gather_radius;
        let origin = self.entity.position;
        let preferred = self
            .entity
            .current_task
            .and_then(|t| t.object())
            .filter(|&id| {
                world
                    .object(id)
                    .is_some_and(|o| o.is_minable() && o.position.distance(origin) <= radius)
            });
        let target = preferred.or_else(|| {
            world
                .objects_in_radius(origin, radius, Some(ObjectKind::Resource))
                .into_iter()
                .filter(|o| o.is_minable())
                .min_by(|a, b| {
                    a.position
                        .distance(origin)
                        .total_cmp(&b.position.distance(origin))
                })
                .map(|o| o.id)
        });
        match target {
            Some(id) => self.gather_resource(id, world),
            None => {
                self.go_idle();
                None
            }
        }
    }

    fn continue_gathering<W: World>(&mut self, resource: Option<ObjectId>, world: &mut W) {
        if self.entity.is_full() {
            if self.return_to_base(world.bounds()).is_err() {
                self.go_idle();
            }
            return;
        }
        let radius = self.tuning.gathering.gather_radius;
        let distant = resource.and_then(|id| {
            world
                .object(id)
                .filter(|o| o.is_minable() && self.entity.distance_to(o.position) > radius)
                .map(|o| o.position)
        });
        match distant {
            Some(position) => {
                // Walk back to the named deposit and resume there.
                if self
                    .go_to(position, UnitState::Gathering, world.bounds())
                    .is_ok()
                {
                    self.assign(TaskKind::Gather { resource });
                }
            }
            None => {
                self.gather_nearby(world);
            }
        }
    }

    fn begin_deposit(&mut self) {
        match self.base {
            Some(base)
                if self.entity.distance_to(base.position)
                    <= self.tuning.gathering.deposit_radius =>
            {
                self.transition(UnitState::Depositing);
                self.assign(TaskKind::Deposit { base: base.id });
            }
            _ => self.go_idle(),
        }
    }

    fn continue_deposit<W: World>(&mut self, base: BaseId, world: &mut W) {
        let Some(home) = self.base.filter(|b| b.id == base) else {
            self.go_idle();
            return;
        };
        if self.entity.distance_to(home.position) > self.tuning.gathering.deposit_radius {
            // Base is set, so this cannot fail.
            let _ = self.return_to_base(world.bounds());
            return;
        }
        if world.deposit(home.id, self.entity.cargo()) {
            let unloaded = self.entity.unload();
            self.emit(UnitEventKind::ResourcesDeposited {
                energy: unloaded.energy,
                matter: unloaded.matter,
            });
        } else {
            warn!(entity = %self.entity.id, base = %home.id, "base refused deposit");
        }
        self.go_idle();
    }

    // -----------------------------------------------------------------------
    // Damage
    // -----------------------------------------------------------------------

    /// Apply damage and let `onDamaged` react. Returns `true` when the unit
    /// died.
    pub fn injure<W: World>(
        &mut self,
        amount: f64,
        source: Option<DamageSource>,
        world: &W,
    ) -> bool {
        let old_health = self.entity.health;
        let new_health = self.entity.take_damage(amount);
        self.emit(UnitEventKind::GotInjured {
            old_health,
            new_health,
            amount,
        });
        self.run_behavior(BehaviorContext::Damaged { amount, source }, world);
        self.entity.is_dead()
    }
}

impl<W: World> Tickable<W> for UnitController {
    fn tick(&mut self, dt_ms: f64, world: &mut W) -> Result<(), TickError> {
        self.update(dt_ms, world)
    }
}
