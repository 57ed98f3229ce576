// Core types shared across the simulation.
//
// Defines the two coordinate spaces (continuous `WorldPoint` for unit
// positions, integer `GridCell` for terrain, fog and pathfinding cells), the
// world `Bounds` rectangle, compact typed identifiers, and the small enums
// (`ObjectKind`, `ResourceKind`, `UnitState`) that the rest of the crate
// matches on. Everything derives `Serialize`/`Deserialize` so views can be
// dumped as JSON by the headless runner.
//
// Grid cells and world points are related only through a cell size. Terrain
// and navigation use the tile size from `TerrainProfile`; fog of war uses its
// own coarser cell size from `PerceptionParams`. `GridCell::containing()` and
// `GridCell::center()` are the only conversions.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A continuous position in world units. X grows east, Y grows south.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Heading from `self` towards `other`, in radians.
    pub fn angle_to(self, other: Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// The point `distance` units away along `angle`.
    pub fn offset(self, angle: f64, distance: f64) -> Self {
        Self::new(
            self.x + angle.cos() * distance,
            self.y + angle.sin() * distance,
        )
    }

    /// Reflect `other` through `self`. Used to pick a flee point directly
    /// away from a threat.
    pub fn mirror(self, other: Self) -> Self {
        Self::new(2.0 * self.x - other.x, 2.0 * self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// An integer cell in some square grid. Which grid depends on the cell size
/// used to build it.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridCell {
    pub col: i32,
    pub row: i32,
}

impl GridCell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The cell containing `point` for a grid of `cell_size` units.
    pub fn containing(point: WorldPoint, cell_size: f64) -> Self {
        Self::new(
            (point.x / cell_size).floor() as i32,
            (point.y / cell_size).floor() as i32,
        )
    }

    /// World-space centre of this cell.
    pub fn center(self, cell_size: f64) -> WorldPoint {
        WorldPoint::new(
            (self.col as f64 + 0.5) * cell_size,
            (self.row as f64 + 0.5) * cell_size,
        )
    }

    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.col - other.col).unsigned_abs() + (self.row - other.row).unsigned_abs()
    }

    pub const fn offset(self, dc: i32, dr: i32) -> Self {
        Self::new(self.col + dc, self.row + dr)
    }

    /// Right, left, down, up. The order is fixed so searches are repeatable.
    pub const fn neighbors4(self) -> [Self; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

/// Axis-aligned world rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Clamp `point` to the rectangle shrunk by `margin` on every side. When
    /// the margin swallows an axis entirely, that axis collapses to its
    /// midpoint.
    pub fn clamp(&self, point: WorldPoint, margin: f64) -> WorldPoint {
        WorldPoint::new(
            clamp_axis(point.x, self.min_x + margin, self.max_x - margin),
            clamp_axis(point.y, self.min_y + margin, self.max_y - margin),
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

fn clamp_axis(value: f64, low: f64, high: f64) -> f64 {
    if low > high {
        (low + high) / 2.0
    } else {
        value.clamp(low, high)
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Declares a compact `u32` identifier with a display prefix.
macro_rules! compact_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

compact_id!(
    /// A unit registered with the scheduler.
    EntityId,
    "unit"
);
compact_id!(
    /// A world object: resource deposit, enemy marker, or obstacle.
    ObjectId,
    "object"
);
compact_id!(
    /// A base that accepts deposited cargo.
    BaseId,
    "base"
);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Resource,
    Enemy,
    Obstacle,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Energy,
    Matter,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Energy, ResourceKind::Matter];

    /// Units regenerated per second of game time.
    pub fn regeneration_per_second(self) -> f64 {
        match self {
            ResourceKind::Energy => 0.1,
            ResourceKind::Matter => 0.05,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Energy => "energy",
            ResourceKind::Matter => "matter",
        })
    }
}

/// The controller state machine. There is no terminal state; removal
/// happens outside the machine when a unit dies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    #[default]
    Idle,
    Moving,
    Gathering,
    Attacking,
    Analyzing,
    Exploring,
    Fleeing,
    Returning,
    Depositing,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnitState::Idle => "idle",
            UnitState::Moving => "moving",
            UnitState::Gathering => "gathering",
            UnitState::Attacking => "attacking",
            UnitState::Analyzing => "analyzing",
            UnitState::Exploring => "exploring",
            UnitState::Fleeing => "fleeing",
            UnitState::Returning => "returning",
            UnitState::Depositing => "depositing",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_containing_floors_negative_coordinates() {
        assert_eq!(
            GridCell::containing(WorldPoint::new(-1.0, 49.9), 50.0),
            GridCell::new(-1, 0)
        );
        assert_eq!(
            GridCell::containing(WorldPoint::new(50.0, 100.0), 50.0),
            GridCell::new(1, 2)
        );
    }

    #[test]
    fn cell_center_round_trips_through_containing() {
        let cell = GridCell::new(3, 7);
        assert_eq!(GridCell::containing(cell.center(20.0), 20.0), cell);
    }

    #[test]
    fn bounds_clamp_respects_margin() {
        let bounds = Bounds::new(0.0, 0.0, 400.0, 300.0);
        let p = bounds.clamp(WorldPoint::new(-10.0, 500.0), 50.0);
        assert_eq!(p, WorldPoint::new(50.0, 250.0));
    }

    #[test]
    fn bounds_clamp_collapses_when_margin_too_large() {
        let bounds = Bounds::new(0.0, 0.0, 60.0, 300.0);
        let p = bounds.clamp(WorldPoint::new(5.0, 100.0), 50.0);
        assert_eq!(p.x, 30.0);
        assert_eq!(p.y, 100.0);
    }

    #[test]
    fn mirror_points_away() {
        let me = WorldPoint::new(10.0, 10.0);
        let threat = WorldPoint::new(15.0, 10.0);
        assert_eq!(me.mirror(threat), WorldPoint::new(5.0, 10.0));
    }

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(EntityId(4).to_string(), "unit#4");
        assert_eq!(ObjectId(12).to_string(), "object#12");
    }

    #[test]
    fn unit_state_serializes_lowercase() {
        let json = serde_json::to_string(&UnitState::Returning).unwrap();
        assert_eq!(json, "\"returning\"");
    }
}
