// Data-driven simulation configuration.
//
// Every tunable number lives in `SimConfig`, loaded from JSON by the headless
// runner (or built from `Default` in tests). The simulation reads cadences,
// radii, rates and stat blocks from here instead of hard-coding them, which
// keeps balance iteration a matter of editing a file.
//
// Parameters are grouped by the subsystem that reads them: `TerrainProfile`
// (cave generation, with named presets `cavern()` and `open_caves()`),
// `SchedulerParams`, `CadenceParams`, `MovementParams`, `PerceptionParams`,
// `NavigationParams`, `GatheringParams`, `PopulationParams`, and the worker
// `Stats` block. Every group is `#[serde(default)]`, so a config file only
// needs the fields it changes.
//
// See also: `sim.rs` which owns the config, `terrain.rs` for the generator
// that reads `TerrainProfile`, `entity.rs` for `Stats`.

use crate::entity::Stats;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Why a config could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Cellular-automata cave parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainProfile {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// World units per grid cell.
    pub tile_size: f64,
    /// Chance that a non-reserved cell starts as wall.
    pub fill_probability: f64,
    /// Smoothing rounds.
    pub iterations: u32,
    /// An open cell turns to wall when more than this many neighbours are wall.
    pub birth_limit: u8,
    /// A wall cell opens when fewer than this many neighbours are wall.
    pub death_limit: u8,
    /// Half-extent of the always-open spawn rectangle, in cells. Cells with
    /// `|col - width/2| < spawn_half_extent` (same for rows) are reserved.
    pub spawn_half_extent: u32,
    /// Target wall percentage. `None` skips density targeting.
    pub target_wall_percent: Option<f64>,
    /// Regeneration attempts before the exact correction pass.
    pub density_attempts: u32,
    /// Acceptable distance from the target, in percentage points.
    pub density_tolerance: f64,
}

impl TerrainProfile {
    /// Sparse caves with broad corridors.
    pub fn cavern() -> Self {
        Self {
            width: 160,
            height: 120,
            tile_size: 20.0,
            fill_probability: 0.36,
            iterations: 3,
            birth_limit: 4,
            death_limit: 3,
            spawn_half_extent: 5,
            target_wall_percent: None,
            density_attempts: 5,
            density_tolerance: 3.0,
        }
    }

    /// Denser rock with one extra smoothing round and a fixed density
    /// target.
    pub fn open_caves() -> Self {
        Self {
            fill_probability: 0.4,
            iterations: 4,
            target_wall_percent: Some(35.0),
            ..Self::cavern()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let min_side = 2 * self.spawn_half_extent + 2;
        if self.width < min_side || self.height < min_side {
            return Err(ConfigError::Invalid(format!(
                "terrain {}x{} cannot hold a border and a spawn area of half-extent {}",
                self.width, self.height, self.spawn_half_extent
            )));
        }
        if !(0.0..=1.0).contains(&self.fill_probability) {
            return Err(ConfigError::Invalid(format!(
                "fill_probability {} outside [0, 1]",
                self.fill_probability
            )));
        }
        if self.tile_size <= 0.0 {
            return Err(ConfigError::Invalid("tile_size must be positive".into()));
        }
        match self.target_wall_percent {
            Some(target) if !(0.0..=100.0).contains(&target) => {
                return Err(ConfigError::Invalid(format!(
                    "target_wall_percent {target} outside [0, 100]"
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for TerrainProfile {
    fn default() -> Self {
        Self::cavern()
    }
}

// ---------------------------------------------------------------------------
// Scheduling and cadences
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerParams {
    /// Ticks per second. Clamped to [1, 60] when applied.
    pub tick_rate: u32,
    /// Game-time multiplier. Clamped to [0.1, 10] when applied.
    pub time_scale: f64,
    /// Ticks allowed per `update` before the remaining time is dropped.
    pub max_ticks_per_update: u32,
    /// Length of the rolling tick-duration history.
    pub history_len: usize,
    /// A tick slower than this fraction of the interval logs a warning.
    pub slow_tick_fraction: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            time_scale: 1.0,
            max_ticks_per_update: 5,
            history_len: 60,
            slow_tick_fraction: 0.8,
        }
    }
}

/// Per-unit sub-update intervals, in game milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceParams {
    pub fog_interval_ms: f64,
    pub perception_interval_ms: f64,
    pub decision_interval_ms: f64,
}

impl Default for CadenceParams {
    fn default() -> Self {
        Self {
            fog_interval_ms: 200.0,
            perception_interval_ms: 250.0,
            decision_interval_ms: 400.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit behavior tuning
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementParams {
    /// Distance at which a destination counts as reached.
    pub arrival_radius: f64,
    /// Units stay this far inside the world bounds.
    pub bounds_margin: f64,
    /// Speed multiplier while cargo weight exceeds capacity.
    pub overload_factor: f64,
    /// Speed multiplier while health is below `wounded_threshold`.
    pub wounded_factor: f64,
    /// Fraction of max health below which the wounded factor applies.
    pub wounded_threshold: f64,
    /// Ask the world for a path when a straight step hits a wall.
    pub reroute_on_collision: bool,
    /// Distance at which an intermediate waypoint counts as reached.
    pub waypoint_radius: f64,
    /// Steps without moving, while rerouting is on, before a destination
    /// is abandoned as unreachable.
    pub stall_limit: u32,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            arrival_radius: 15.0,
            bounds_margin: 50.0,
            overload_factor: 0.5,
            wounded_factor: 0.5,
            wounded_threshold: 0.3,
            reroute_on_collision: true,
            waypoint_radius: 4.0,
            stall_limit: 12,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionParams {
    pub fog_enabled: bool,
    /// Fog-of-war cell size in world units.
    pub fog_cell_size: f64,
    /// Range within which objects can be analyzed.
    pub interaction_range: f64,
    /// Flat percentage added by each analysis call.
    pub analysis_base_rate: f64,
    /// Perception stat is divided by this and added to each analysis call.
    pub analysis_perception_divisor: f64,
    /// Most objects a single unit remembers.
    pub memory_capacity: usize,
    /// Exploration legs are this fraction of the perception radius.
    pub explore_distance_factor: f64,
    /// Extra fog cells searched beyond the perception radius when picking
    /// an unexplored heading.
    pub explore_search_padding: i32,
}

impl Default for PerceptionParams {
    fn default() -> Self {
        Self {
            fog_enabled: true,
            fog_cell_size: 50.0,
            interaction_range: 15.0,
            analysis_base_rate: 5.0,
            analysis_perception_divisor: 10.0,
            memory_capacity: 128,
            explore_distance_factor: 0.8,
            explore_search_padding: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationParams {
    /// BFS radius, in cells, when the goal cell is a wall.
    pub fallback_radius: u32,
}

impl Default for NavigationParams {
    fn default() -> Self {
        Self { fallback_radius: 10 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatheringParams {
    /// Resources within this distance of an arriving gatherer are mined.
    pub gather_radius: f64,
    /// A returning unit this close to its base starts depositing.
    pub deposit_radius: f64,
    /// Experience per unit of resource gathered.
    pub xp_per_unit: f64,
}

impl Default for GatheringParams {
    fn default() -> Self {
        Self {
            gather_radius: 30.0,
            deposit_radius: 20.0,
            xp_per_unit: 0.5,
        }
    }
}

/// What `Simulation::new` scatters over the generated caves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationParams {
    /// Deposits placed per resource kind.
    pub resources_per_kind: u32,
    /// Initial quantity is drawn from this range.
    pub resource_quantity: (f64, f64),
    /// Static enemy markers.
    pub enemy_count: u32,
    /// Unidentified objects worth analyzing.
    pub artifact_count: u32,
    /// Nothing is placed closer than this to the base.
    pub min_base_distance: f64,
    /// Placement draws before giving up on one object.
    pub placement_attempts: u32,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            resources_per_kind: 12,
            resource_quantity: (50.0, 150.0),
            enemy_count: 3,
            artifact_count: 4,
            min_base_distance: 250.0,
            placement_attempts: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World seed. The same seed rebuilds the same caves and population.
    pub seed: u64,
    pub terrain: TerrainProfile,
    pub scheduler: SchedulerParams,
    pub cadence: CadenceParams,
    pub movement: MovementParams,
    pub perception: PerceptionParams,
    pub navigation: NavigationParams,
    pub gathering: GatheringParams,
    pub population: PopulationParams,
    /// Stat block for newly spawned workers.
    pub worker: Stats,
    /// Most unit events the shared log holds before dropping the oldest.
    pub event_log_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x00b0_7707,
            terrain: TerrainProfile::default(),
            scheduler: SchedulerParams::default(),
            cadence: CadenceParams::default(),
            movement: MovementParams::default(),
            perception: PerceptionParams::default(),
            navigation: NavigationParams::default(),
            gathering: GatheringParams::default(),
            population: PopulationParams::default(),
            worker: Stats::worker(),
            event_log_capacity: 4096,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;
        if self.scheduler.max_ticks_per_update == 0 {
            return Err(ConfigError::Invalid(
                "max_ticks_per_update must be at least 1".into(),
            ));
        }
        if self.perception.fog_cell_size <= 0.0 {
            return Err(ConfigError::Invalid("fog_cell_size must be positive".into()));
        }
        if self.perception.analysis_perception_divisor <= 0.0 {
            return Err(ConfigError::Invalid(
                "analysis_perception_divisor must be positive".into(),
            ));
        }
        let intervals = [
            self.cadence.fog_interval_ms,
            self.cadence.perception_interval_ms,
            self.cadence.decision_interval_ms,
        ];
        if intervals.iter().any(|&ms| ms <= 0.0) {
            return Err(ConfigError::Invalid("cadence intervals must be positive".into()));
        }
        let (low, high) = self.population.resource_quantity;
        if low < 0.0 || high < low {
            return Err(ConfigError::Invalid(format!(
                "resource_quantity range ({low}, {high}) is empty or negative"
            )));
        }
        Ok(())
    }
}
