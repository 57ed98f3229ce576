// burrow_sim: cave colony simulation core.
//
// This crate holds all simulation logic for Burrow: cave generation, grid
// navigation, per-unit perception and memory, the behavior state machine,
// and the fixed-step scheduler that drives units. It has no rendering or
// input dependencies and can be tested, benchmarked, and run headless.
//
// Module overview:
// - `sim.rs`:         Simulation facade. Builds a world from config, spawns workers, advances time.
// - `scheduler.rs`:   TickScheduler: fixed-interval accumulator with time scale, pause and overrun cap.
// - `controller.rs`:  UnitController: multi-rate update loop, dispatch, analysis, gathering.
// - `behavior.rs`:    ActionDescriptor, behavior events and contexts, BehaviorSet, stock worker behaviors.
// - `perception.rs`:  FogOfWar and PerceptionMemory (what a unit has seen and analyzed).
// - `terrain.rs`:     Cellular-automata caves with density targeting, plus the collision index.
// - `pathfinding.rs`: GridNavigator: 4-connected A* with a bounded nearest-walkable fallback.
// - `world.rs`:       World trait (what units may ask of the world) and CaveWorld.
// - `entity.rs`:      Entity record, Stats block, Cargo.
// - `task.rs`:        Tasks a unit can be committed to (analyze, gather, deposit).
// - `event.rs`:       UnitEvent notifications and the EventSink implementations.
// - `config.rs`:      SimConfig and its parameter groups, loaded from JSON.
// - `error.rs`:       BehaviorError, TickError, RegistrationError.
// - `types.rs`:       WorldPoint, GridCell, Bounds, ids, object and unit state enums.
// - `prng`:           Re-exported from `burrow_prng`: xoshiro256++ with SplitMix64 seeding.
//
// Single-threaded and cooperative: units update one after another in
// registration order, and nothing is shared across threads. All randomness
// comes from seeded `SimRng` streams, and every id-keyed collection is a
// `BTreeMap` so iteration order is stable.

pub mod behavior;
pub mod config;
pub mod controller;
pub mod entity;
pub mod error;
pub mod event;
pub mod pathfinding;
pub mod perception;
pub use burrow_prng as prng;
pub mod scheduler;
pub mod sim;
pub mod task;
pub mod terrain;
pub mod types;
pub mod world;
