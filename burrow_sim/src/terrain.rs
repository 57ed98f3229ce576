// Procedural cave terrain.
//
// Produces a 2D occupancy grid of `Cell::Open` / `Cell::Wall` with the
// classic cellular-automata recipe: random noise, then a few smoothing rounds
// where each cell looks at its 8 neighbours (off-grid counts as wall). A wall
// with fewer than `death_limit` wall neighbours opens up; an open cell with
// more than `birth_limit` wall neighbours fills in.
//
// Two cell families are reserved: the outer border (always wall) and a
// centred spawn rectangle (always open). They are clamped when the noise is
// seeded and again after every smoothing round, so no smoothing pass can
// open the border or seal the spawn area.
//
// `generate_with_density()` adds density targeting on top: it rescales the
// fill probability (x0.8 / x1.2) and regenerates until the wall share lands
// within tolerance of the target, then flips shuffled non-reserved cells one
// at a time until the exact wall count is reached or the candidates run out.
//
// The `CollisionIndex` (a hash set of wall cells) is rebuilt whenever the
// grid is finalized. It is what `is_wall` queries consult.
//
// See also: `config.rs` for `TerrainProfile`, `pathfinding.rs` for the
// navigator that searches this grid, `world.rs` which owns the terrain.

use crate::config::TerrainProfile;
use crate::types::{GridCell, WorldPoint};
use burrow_prng::SimRng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Open,
    Wall,
}

/// Set of wall cells for constant-time lookups.
#[derive(Clone, Debug, Default)]
pub struct CollisionIndex {
    walls: FxHashSet<GridCell>,
}

impl CollisionIndex {
    pub fn contains(&self, cell: GridCell) -> bool {
        self.walls.contains(&cell)
    }

    pub fn len(&self) -> usize {
        self.walls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }
}

/// A finished cave grid.
#[derive(Clone, Debug)]
pub struct Terrain {
    width: u32,
    height: u32,
    tile_size: f64,
    spawn_half_extent: u32,
    /// Flat storage: index = col + row * width.
    cells: Vec<Cell>,
    collision: CollisionIndex,
}

impl Terrain {
    /// A grid with only the border walled in.
    pub fn open(width: u32, height: u32, tile_size: f64) -> Self {
        let mut terrain = Self::blank(width, height, tile_size, 0);
        terrain.clamp_reserved();
        terrain.rebuild_collision();
        terrain
    }

    /// Build a grid from text rows, `#` for wall and anything else open.
    /// Rows shorter than the longest are padded with open cells. No border
    /// is added.
    pub fn from_ascii(rows: &[&str], tile_size: f64) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut terrain = Self::blank(width, height, tile_size, 0);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch == '#' {
                    terrain.set(GridCell::new(col as i32, row as i32), Cell::Wall);
                }
            }
        }
        terrain.rebuild_collision();
        terrain
    }

    fn blank(width: u32, height: u32, tile_size: f64, spawn_half_extent: u32) -> Self {
        Self {
            width,
            height,
            tile_size,
            spawn_half_extent,
            cells: vec![Cell::Open; width as usize * height as usize],
            collision: CollisionIndex::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn collision(&self) -> &CollisionIndex {
        &self.collision
    }

    pub fn in_bounds(&self, cell: GridCell) -> bool {
        cell.col >= 0
            && cell.row >= 0
            && (cell.col as u32) < self.width
            && (cell.row as u32) < self.height
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.col as usize + cell.row as usize * self.width as usize)
        } else {
            None
        }
    }

    /// Read a cell. Off-grid reads as wall.
    pub fn get(&self, cell: GridCell) -> Cell {
        self.index(cell).map(|i| self.cells[i]).unwrap_or(Cell::Wall)
    }

    /// Write a cell. No-op off-grid. Does not touch the collision index;
    /// call `rebuild_collision()` once edits are done.
    fn set(&mut self, cell: GridCell, value: Cell) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = value;
        }
    }

    /// Collision query by cell. Off-grid cells are solid.
    pub fn is_wall_cell(&self, cell: GridCell) -> bool {
        !self.in_bounds(cell) || self.collision.contains(cell)
    }

    /// Collision query by world position.
    pub fn is_wall(&self, point: WorldPoint) -> bool {
        self.is_wall_cell(self.cell_at(point))
    }

    pub fn cell_at(&self, point: WorldPoint) -> GridCell {
        GridCell::containing(point, self.tile_size)
    }

    /// Centre of the spawn rectangle.
    pub fn spawn_cell(&self) -> GridCell {
        GridCell::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    pub fn is_border(&self, cell: GridCell) -> bool {
        cell.col == 0
            || cell.row == 0
            || cell.col == self.width as i32 - 1
            || cell.row == self.height as i32 - 1
    }

    pub fn is_spawn(&self, cell: GridCell) -> bool {
        let half = self.spawn_half_extent as i32;
        let center = self.spawn_cell();
        half > 0 && (cell.col - center.col).abs() < half && (cell.row - center.row).abs() < half
    }

    fn is_reserved(&self, cell: GridCell) -> bool {
        self.is_border(cell) || self.is_spawn(cell)
    }

    pub fn cells(&self) -> impl Iterator<Item = (GridCell, Cell)> + '_ {
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &c)| (GridCell::new((i % width) as i32, (i / width) as i32), c))
    }

    pub fn open_cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.cells()
            .filter(|&(_, c)| c == Cell::Open)
            .map(|(cell, _)| cell)
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Wall).count()
    }

    /// Share of wall cells, in percent.
    pub fn wall_percent(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.wall_count() as f64 * 100.0 / self.cells.len() as f64
    }

    /// Count of the 8 neighbours that are wall, off-grid included.
    pub fn wall_neighbors(&self, cell: GridCell) -> u8 {
        let mut count = 0;
        for dr in -1..=1 {
            for dc in -1..=1 {
                if (dc, dr) != (0, 0) && self.get(cell.offset(dc, dr)) == Cell::Wall {
                    count += 1;
                }
            }
        }
        count
    }

    fn clamp_reserved(&mut self) {
        for row in 0..self.height as i32 {
            for col in 0..self.width as i32 {
                let cell = GridCell::new(col, row);
                if self.is_border(cell) {
                    self.set(cell, Cell::Wall);
                } else if self.is_spawn(cell) {
                    self.set(cell, Cell::Open);
                }
            }
        }
    }

    fn rebuild_collision(&mut self) {
        let walls = self
            .cells()
            .filter(|&(_, c)| c == Cell::Wall)
            .map(|(cell, _)| cell)
            .collect();
        self.collision = CollisionIndex { walls };
    }

    /// One smoothing round. Reads from the old grid, writes a new one.
    fn smooth(&mut self, birth_limit: u8, death_limit: u8) {
        let mut next = self.cells.clone();
        for (i, (cell, current)) in self.cells().enumerate() {
            let walls = self.wall_neighbors(cell);
            next[i] = match current {
                Cell::Wall if walls < death_limit => Cell::Open,
                Cell::Open if walls > birth_limit => Cell::Wall,
                other => other,
            };
        }
        self.cells = next;
    }

    /// Flip non-reserved cells until exactly `target` cells are wall, or
    /// the candidate pool is exhausted.
    fn correct_wall_count(&mut self, target: usize, rng: &mut SimRng) {
        let current = self.wall_count();
        if current == target {
            return;
        }
        let (from, to, needed) = if current < target {
            (Cell::Open, Cell::Wall, target - current)
        } else {
            (Cell::Wall, Cell::Open, current - target)
        };
        let mut candidates: Vec<GridCell> = self
            .cells()
            .filter(|&(cell, c)| c == from && !self.is_reserved(cell))
            .map(|(cell, _)| cell)
            .collect();
        rng.shuffle(&mut candidates);
        let flips = needed.min(candidates.len());
        for &cell in &candidates[..flips] {
            self.set(cell, to);
        }
        if flips < needed {
            debug!(
                target,
                reached = self.wall_count(),
                "density correction ran out of candidates"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Generation entry points
// ---------------------------------------------------------------------------

/// Generate a cave grid from `profile`, using its own fill probability.
/// Density targeting is not applied; see `build()`.
pub fn generate(profile: &TerrainProfile, rng: &mut SimRng) -> Terrain {
    generate_with_fill(profile, profile.fill_probability, rng)
}

/// Generate with density targeting when the profile asks for it.
pub fn build(profile: &TerrainProfile, rng: &mut SimRng) -> Terrain {
    match profile.target_wall_percent {
        Some(target) => generate_with_density(profile, target, rng),
        None => generate(profile, rng),
    }
}

/// Generate, then steer the wall share to `target_percent`.
pub fn generate_with_density(
    profile: &TerrainProfile,
    target_percent: f64,
    rng: &mut SimRng,
) -> Terrain {
    let target_percent = target_percent.clamp(0.0, 100.0);
    let mut fill = profile.fill_probability;
    let mut terrain = generate_with_fill(profile, fill, rng);

    for attempt in 1..profile.density_attempts.max(1) {
        let measured = terrain.wall_percent();
        if (measured - target_percent).abs() <= profile.density_tolerance {
            break;
        }
        fill = if measured < target_percent {
            fill * 1.2
        } else {
            fill * 0.8
        }
        .clamp(0.0, 1.0);
        debug!(attempt, measured, fill, "regenerating terrain towards target density");
        terrain = generate_with_fill(profile, fill, rng);
    }

    let total = terrain.cells.len() as f64;
    let target_count = (target_percent / 100.0 * total).round() as usize;
    terrain.correct_wall_count(target_count, rng);
    terrain.rebuild_collision();
    terrain
}

fn generate_with_fill(profile: &TerrainProfile, fill: f64, rng: &mut SimRng) -> Terrain {
    let mut terrain = Terrain::blank(
        profile.width,
        profile.height,
        profile.tile_size,
        profile.spawn_half_extent,
    );
    for value in terrain.cells.iter_mut() {
        if rng.chance(fill) {
            *value = Cell::Wall;
        }
    }
    terrain.clamp_reserved();

    for _ in 0..profile.iterations {
        terrain.smooth(profile.birth_limit, profile.death_limit);
        terrain.clamp_reserved();
    }

    terrain.rebuild_collision();
    terrain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_profile() -> TerrainProfile {
        TerrainProfile {
            width: 60,
            height: 40,
            ..TerrainProfile::cavern()
        }
    }

    fn assert_reserved_cells(terrain: &Terrain) {
        for (cell, value) in terrain.cells() {
            if terrain.is_border(cell) {
                assert_eq!(value, Cell::Wall, "border cell {cell} is open");
            } else if terrain.is_spawn(cell) {
                assert_eq!(value, Cell::Open, "spawn cell {cell} is wall");
            }
        }
    }

    #[test]
    fn border_is_wall_and_spawn_is_open_across_seeds() {
        for seed in 0..20 {
            let mut rng = SimRng::new(seed);
            assert_reserved_cells(&generate(&small_profile(), &mut rng));
            let dense = TerrainProfile {
                fill_probability: 0.9,
                ..small_profile()
            };
            assert_reserved_cells(&generate(&dense, &mut rng));
        }
    }

    #[test]
    fn spawn_rectangle_is_nine_by_nine() {
        let terrain = generate(&small_profile(), &mut SimRng::new(1));
        let spawn_cells = terrain.cells().filter(|&(c, _)| terrain.is_spawn(c)).count();
        assert_eq!(spawn_cells, 81);
        assert!(terrain.is_spawn(GridCell::new(30 - 4, 20 + 4)));
        assert!(!terrain.is_spawn(GridCell::new(30 - 5, 20)));
    }

    #[test]
    fn zero_fill_without_smoothing_leaves_only_the_border() {
        let profile = TerrainProfile {
            fill_probability: 0.0,
            iterations: 0,
            ..small_profile()
        };
        let terrain = generate(&profile, &mut SimRng::new(3));
        assert_eq!(terrain.wall_count(), 2 * 60 + 2 * 40 - 4);
    }

    #[test]
    fn off_grid_neighbors_count_as_wall() {
        let terrain = Terrain::from_ascii(&["...", "...", "..."], 10.0);
        assert_eq!(terrain.wall_neighbors(GridCell::new(0, 0)), 5);
        assert_eq!(terrain.wall_neighbors(GridCell::new(1, 1)), 0);
        assert_eq!(terrain.wall_neighbors(GridCell::new(1, 0)), 3);
    }

    #[test]
    fn smoothing_applies_birth_and_death_limits() {
        // Centre wall with no wall neighbours dies; the open cell boxed in
        // by eight walls is born.
        let mut lonely = Terrain::from_ascii(&[".....", ".....", "..#..", ".....", "....."], 1.0);
        lonely.smooth(4, 3);
        assert_eq!(lonely.get(GridCell::new(2, 2)), Cell::Open);

        let mut boxed = Terrain::from_ascii(&["#####", "#####", "##.##", "#####", "#####"], 1.0);
        boxed.smooth(4, 3);
        assert_eq!(boxed.get(GridCell::new(2, 2)), Cell::Wall);
    }

    #[test]
    fn collision_index_matches_grid() {
        let terrain = generate(&small_profile(), &mut SimRng::new(9));
        assert_eq!(terrain.collision().len(), terrain.wall_count());
        for (cell, value) in terrain.cells() {
            assert_eq!(terrain.is_wall_cell(cell), value == Cell::Wall);
        }
        assert!(terrain.is_wall_cell(GridCell::new(-1, 5)));
        assert!(terrain.is_wall_cell(GridCell::new(60, 5)));
    }

    #[test]
    fn world_point_queries_use_tile_size() {
        let terrain = Terrain::from_ascii(&["..", ".#"], 20.0);
        assert!(!terrain.is_wall(WorldPoint::new(19.9, 19.9)));
        assert!(terrain.is_wall(WorldPoint::new(20.0, 25.0)));
        assert!(terrain.is_wall(WorldPoint::new(-0.1, 5.0)));
    }

    #[test]
    fn density_targeting_hits_exact_count() {
        let profile = small_profile();
        let terrain = generate_with_density(&profile, 40.0, &mut SimRng::new(5));
        assert_eq!(terrain.wall_count(), 960);
        assert_eq!(terrain.collision().len(), 960);
        assert_reserved_cells(&terrain);
    }

    #[test]
    fn density_targeting_can_open_cells_too() {
        let profile = TerrainProfile {
            fill_probability: 0.7,
            ..small_profile()
        };
        let terrain = generate_with_density(&profile, 20.0, &mut SimRng::new(6));
        assert_eq!(terrain.wall_count(), 480);
        assert_reserved_cells(&terrain);
    }

    #[test]
    fn unreachable_density_stops_at_best_count() {
        let profile = small_profile();
        let terrain = generate_with_density(&profile, 100.0, &mut SimRng::new(2));
        // Only the 81 spawn cells stay open.
        assert_eq!(terrain.wall_count(), 60 * 40 - 81);
        assert_reserved_cells(&terrain);
    }

    #[test]
    fn same_seed_same_caves() {
        let a = generate(&small_profile(), &mut SimRng::new(77));
        let b = generate(&small_profile(), &mut SimRng::new(77));
        assert_eq!(a.cells, b.cells);
    }

    #[test]
    fn open_grid_has_border_only() {
        let terrain = Terrain::open(10, 8, 5.0);
        assert_eq!(terrain.wall_count(), 2 * 10 + 2 * 8 - 4);
        assert!(!terrain.is_wall_cell(GridCell::new(1, 1)));
    }
}
