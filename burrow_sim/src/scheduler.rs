// Fixed-step scheduler that drives every registered unit.
//
// The caller feeds `update(now_ms)` with frame timestamps at whatever rate it
// renders. The scheduler turns wall time into game time (scaled by
// `time_scale`), banks it in an accumulator, and runs one tick per whole
// interval it holds. Each tick updates every registered entity, in
// registration order, with exactly one interval of game time.
//
// Rules worth knowing:
//
// - The first `update` only records its timestamp. So does every `update`
//   while paused; time that passes while paused is never replayed.
// - A timestamp earlier than the previous one counts as zero elapsed time.
// - At most `max_ticks_per_update` ticks run per call. When more are due the
//   scheduler runs that many, drops the rest of the accumulator, and warns.
//   This keeps a long stall (debugger, suspended tab) from turning into a
//   burst of catch-up ticks.
// - One entity's `Err` is logged and does not stop the others.
//
// Entities are generic (`Tickable<W>`) so tests can drive lightweight
// counters; the simulation registers `UnitController`s.
//
// See also: `controller.rs` for the per-unit cadences that subdivide a tick,
// `sim.rs` for the facade that owns a scheduler and a world.

use crate::config::SchedulerParams;
use crate::error::{RegistrationError, TickError};
use crate::types::EntityId;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{error, warn};

const MIN_TICK_RATE: u32 = 1;
const MAX_TICK_RATE: u32 = 60;
const MIN_TIME_SCALE: f64 = 0.1;
const MAX_TIME_SCALE: f64 = 10.0;

/// Something the scheduler can advance by one fixed step.
pub trait Tickable<W> {
    fn tick(&mut self, dt_ms: f64, world: &mut W) -> Result<(), TickError>;
}

/// Snapshot for overlays and logs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub tick_rate: u32,
    /// Mean wall time of the recent ticks, in ms.
    pub average_tick_ms: f64,
    pub tick_count: u64,
    pub entity_count: usize,
    pub time_scale: f64,
    pub elapsed_game_ms: f64,
}

#[derive(Debug)]
pub struct TickScheduler<E> {
    tick_rate: u32,
    interval_ms: f64,
    accumulator_ms: f64,
    time_scale: f64,
    paused: bool,
    last_timestamp: Option<f64>,
    entities: Vec<(EntityId, E)>,
    tick_count: u64,
    elapsed_game_ms: f64,
    /// Wall time of recent ticks, oldest first.
    history: VecDeque<f64>,
    history_len: usize,
    max_ticks: u32,
    slow_tick_fraction: f64,
}

impl<E> TickScheduler<E> {
    pub fn new(params: &SchedulerParams) -> Self {
        let tick_rate = params.tick_rate.clamp(MIN_TICK_RATE, MAX_TICK_RATE);
        Self {
            tick_rate,
            interval_ms: 1000.0 / tick_rate as f64,
            accumulator_ms: 0.0,
            time_scale: params.time_scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE),
            paused: false,
            last_timestamp: None,
            entities: Vec::new(),
            tick_count: 0,
            elapsed_game_ms: 0.0,
            history: VecDeque::with_capacity(params.history_len),
            history_len: params.history_len.max(1),
            max_ticks: params.max_ticks_per_update.max(1),
            slow_tick_fraction: params.slow_tick_fraction,
        }
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Add an entity after all existing ones. Ids must be unique.
    pub fn try_register(&mut self, id: EntityId, entity: E) -> Result<(), RegistrationError> {
        if self.entities.iter().any(|(existing, _)| *existing == id) {
            return Err(RegistrationError::Duplicate(id));
        }
        self.entities.push((id, entity));
        Ok(())
    }

    /// `try_register` that logs and returns `false` on rejection.
    pub fn register_entity(&mut self, id: EntityId, entity: E) -> bool {
        match self.try_register(id, entity) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "entity registration rejected");
                false
            }
        }
    }

    /// Remove an entity, keeping the order of the rest.
    pub fn unregister_entity(&mut self, id: EntityId) -> Option<E> {
        let index = self.entities.iter().position(|(existing, _)| *existing == id)?;
        Some(self.entities.remove(index).1)
    }

    pub fn get(&self, id: EntityId) -> Option<&E> {
        self.entities
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, e)| e)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut E> {
        self.entities
            .iter_mut()
            .find(|(existing, _)| *existing == id)
            .map(|(_, e)| e)
    }

    /// Registered entities in tick order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &E)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // -----------------------------------------------------------------------
    // Controls
    // -----------------------------------------------------------------------

    pub fn set_tick_rate(&mut self, rate: u32) {
        self.tick_rate = rate.clamp(MIN_TICK_RATE, MAX_TICK_RATE);
        self.interval_ms = 1000.0 / self.tick_rate as f64;
    }

    /// NaN is ignored.
    pub fn set_time_scale(&mut self, scale: f64) {
        if scale.is_nan() {
            return;
        }
        self.time_scale = scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn tick_interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Banked game time not yet spent on a tick.
    pub fn accumulator_ms(&self) -> f64 {
        self.accumulator_ms
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn elapsed_game_ms(&self) -> f64 {
        self.elapsed_game_ms
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let average_tick_ms = if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<f64>() / self.history.len() as f64
        };
        PerformanceMetrics {
            tick_rate: self.tick_rate,
            average_tick_ms,
            tick_count: self.tick_count,
            entity_count: self.entities.len(),
            time_scale: self.time_scale,
            elapsed_game_ms: self.elapsed_game_ms,
        }
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Feed a frame timestamp and run every tick that is due. Returns the
    /// number of ticks run.
    pub fn update<W>(&mut self, now_ms: f64, world: &mut W) -> u32
    where
        E: Tickable<W>,
    {
        let Some(last) = self.last_timestamp.replace(now_ms) else {
            return 0;
        };
        if self.paused {
            return 0;
        }

        let delta = (now_ms - last).max(0.0) * self.time_scale;
        self.accumulator_ms += delta;
        self.elapsed_game_ms += delta;

        let mut processed = 0;
        while self.accumulator_ms >= self.interval_ms {
            if processed >= self.max_ticks {
                warn!(
                    ticks = processed,
                    dropped_ms = self.accumulator_ms,
                    "scheduler overrun, dropping backlog"
                );
                self.accumulator_ms = 0.0;
                break;
            }
            self.run_tick(world);
            self.accumulator_ms -= self.interval_ms;
            processed += 1;
        }
        processed
    }

    fn run_tick<W>(&mut self, world: &mut W)
    where
        E: Tickable<W>,
    {
        let started = Instant::now();
        for (id, entity) in &mut self.entities {
            if let Err(err) = entity.tick(self.interval_ms, world) {
                error!(entity = %id, %err, "entity tick failed");
            }
        }
        self.tick_count += 1;

        let took_ms = started.elapsed().as_secs_f64() * 1000.0;
        if took_ms > self.interval_ms * self.slow_tick_fraction {
            warn!(
                tick = self.tick_count,
                took_ms,
                budget_ms = self.interval_ms,
                "slow tick"
            );
        }
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(took_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records its id into the world on every tick.
    struct Recorder {
        id: EntityId,
        ticks: u32,
        fail: bool,
    }

    impl Recorder {
        fn new(id: u32) -> Self {
            Self {
                id: EntityId(id),
                ticks: 0,
                fail: false,
            }
        }
    }

    impl Tickable<Vec<EntityId>> for Recorder {
        fn tick(&mut self, dt_ms: f64, world: &mut Vec<EntityId>) -> Result<(), TickError> {
            assert!(dt_ms > 0.0);
            if self.fail {
                return Err(TickError::Entity {
                    entity: self.id,
                    reason: "recorder failure".into(),
                });
            }
            self.ticks += 1;
            world.push(self.id);
            Ok(())
        }
    }

    fn scheduler(tick_rate: u32) -> TickScheduler<Recorder> {
        TickScheduler::new(&SchedulerParams {
            tick_rate,
            ..SchedulerParams::default()
        })
    }

    #[test]
    fn first_update_only_records_timestamp() {
        let mut sched = scheduler(10);
        sched.register_entity(EntityId(1), Recorder::new(1));
        let mut world = Vec::new();
        assert_eq!(sched.update(10_000.0, &mut world), 0);
        assert_eq!(sched.accumulator_ms(), 0.0);
        assert!(world.is_empty());
    }

    #[test]
    fn runs_whole_intervals_and_keeps_remainder() {
        let mut sched = scheduler(10);
        sched.register_entity(EntityId(1), Recorder::new(1));
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        assert_eq!(sched.update(350.0, &mut world), 3);
        assert!((sched.accumulator_ms() - 50.0).abs() < 1e-9);
        assert_eq!(sched.tick_count(), 3);
        assert_eq!(world.len(), 3);
        // The banked 50ms plus 50 more makes one tick.
        assert_eq!(sched.update(400.0, &mut world), 1);
    }

    #[test]
    fn overrun_runs_five_and_drops_backlog() {
        let mut sched = scheduler(10);
        sched.register_entity(EntityId(1), Recorder::new(1));
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        assert_eq!(sched.update(1_000.0, &mut world), 5);
        assert_eq!(sched.accumulator_ms(), 0.0);
        assert_eq!(sched.get(EntityId(1)).unwrap().ticks, 5);
        assert_eq!(sched.update(1_000.0, &mut world), 0);
    }

    #[test]
    fn exactly_five_due_keeps_remainder() {
        let mut sched = scheduler(10);
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        assert_eq!(sched.update(550.0, &mut world), 5);
        assert!((sched.accumulator_ms() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn paused_time_is_not_replayed() {
        let mut sched = scheduler(10);
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        sched.set_paused(true);
        assert!(sched.is_paused());
        assert_eq!(sched.update(500.0, &mut world), 0);
        assert_eq!(sched.accumulator_ms(), 0.0);
        sched.set_paused(false);
        assert_eq!(sched.update(600.0, &mut world), 1);
        assert!((sched.elapsed_game_ms() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn backwards_timestamp_counts_as_zero() {
        let mut sched = scheduler(10);
        let mut world = Vec::new();
        sched.update(500.0, &mut world);
        assert_eq!(sched.update(400.0, &mut world), 0);
        assert_eq!(sched.accumulator_ms(), 0.0);
        assert_eq!(sched.update(500.0, &mut world), 1);
    }

    #[test]
    fn time_scale_speeds_up_game_time() {
        let mut sched = scheduler(10);
        sched.set_time_scale(2.0);
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        assert_eq!(sched.update(100.0, &mut world), 2);
        assert!((sched.elapsed_game_ms() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn controls_clamp() {
        let mut sched = scheduler(20);
        sched.set_tick_rate(0);
        assert_eq!(sched.tick_rate(), 1);
        assert_eq!(sched.tick_interval_ms(), 1000.0);
        sched.set_tick_rate(500);
        assert_eq!(sched.tick_rate(), 60);
        sched.set_time_scale(0.0);
        assert_eq!(sched.time_scale(), 0.1);
        sched.set_time_scale(50.0);
        assert_eq!(sched.time_scale(), 10.0);
        sched.set_time_scale(f64::NAN);
        assert_eq!(sched.time_scale(), 10.0);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut sched = scheduler(10);
        assert!(sched.register_entity(EntityId(1), Recorder::new(1)));
        assert!(!sched.register_entity(EntityId(1), Recorder::new(1)));
        assert_eq!(
            sched.try_register(EntityId(1), Recorder::new(1)),
            Err(RegistrationError::Duplicate(EntityId(1)))
        );
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn entities_tick_in_registration_order() {
        let mut sched = scheduler(10);
        for id in [3, 1, 2] {
            sched.register_entity(EntityId(id), Recorder::new(id));
        }
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        sched.update(100.0, &mut world);
        assert_eq!(world, vec![EntityId(3), EntityId(1), EntityId(2)]);

        let removed = sched.unregister_entity(EntityId(1)).unwrap();
        assert_eq!(removed.ticks, 1);
        assert_eq!(sched.ids(), vec![EntityId(3), EntityId(2)]);
        assert!(sched.unregister_entity(EntityId(1)).is_none());
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let mut sched = scheduler(10);
        let mut broken = Recorder::new(1);
        broken.fail = true;
        sched.register_entity(EntityId(1), broken);
        sched.register_entity(EntityId(2), Recorder::new(2));
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        assert_eq!(sched.update(200.0, &mut world), 2);
        assert_eq!(world, vec![EntityId(2), EntityId(2)]);
    }

    #[test]
    fn metrics_report_state() {
        let mut sched = scheduler(10);
        sched.register_entity(EntityId(1), Recorder::new(1));
        let mut world = Vec::new();
        sched.update(0.0, &mut world);
        sched.update(300.0, &mut world);
        let metrics = sched.performance_metrics();
        assert_eq!(metrics.tick_rate, 10);
        assert_eq!(metrics.tick_count, 3);
        assert_eq!(metrics.entity_count, 1);
        assert!(metrics.average_tick_ms >= 0.0);
        let json = serde_json::to_value(metrics).unwrap();
        assert!(json.get("elapsedGameMs").is_some());
        assert!(json.get("averageTickMs").is_some());
    }
}
