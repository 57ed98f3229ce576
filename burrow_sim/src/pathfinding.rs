// A* pathfinding over the terrain grid.
//
// `GridNavigator` borrows a `Terrain` and answers `find_path(start, goal)`
// in world coordinates. Points are converted to cells via the tile size,
// searched with A* over 4-connected neighbours (uniform cost 1, Manhattan
// heuristic, which is admissible and consistent on this grid), and the cell
// path is converted back to cell centres.
//
// The open set is a `BinaryHeap` turned into a min-heap by reversing
// `Ord`, keyed by `(f_score, sequence)`. The sequence number is a push
// counter, so entries with equal f pop in insertion order. Scores and
// back-pointers live in `Vec`s indexed by flat cell index.
//
// When the goal cell is a wall, a breadth-first search bounded to
// `fallback_radius` steps looks for the nearest open cell and the search
// targets that instead. No open cell within the radius means no path.
//
// See also: `terrain.rs` for the grid and its collision index, `world.rs`
// which exposes the navigator through the `World` trait, `controller.rs`
// for the opt-in reroute-on-collision movement that consumes paths.

use crate::terrain::Terrain;
use crate::types::{GridCell, WorldPoint};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use tracing::debug;

/// A successful grid search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellPath {
    /// Cells from start to goal, inclusive.
    pub cells: Vec<GridCell>,
    /// Cost from the start for each entry of `cells`.
    pub g_scores: Vec<u32>,
}

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    cell: GridCell,
    f_score: u32,
    sequence: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score == other.f_score && self.sequence == other.sequence
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: the smallest (f, sequence) is the greatest.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

pub struct GridNavigator<'a> {
    terrain: &'a Terrain,
    fallback_radius: u32,
}

impl<'a> GridNavigator<'a> {
    pub fn new(terrain: &'a Terrain, fallback_radius: u32) -> Self {
        Self {
            terrain,
            fallback_radius,
        }
    }

    /// Shortest path between two world points, as cell centres. The first
    /// point is the centre of the start cell.
    pub fn find_path(&self, start: WorldPoint, goal: WorldPoint) -> Option<Vec<WorldPoint>> {
        let start_cell = self.terrain.cell_at(start);
        let mut goal_cell = self.terrain.cell_at(goal);

        if self.terrain.is_wall_cell(goal_cell) {
            goal_cell = self.nearest_walkable(goal_cell)?;
        }

        let path = self.find_cell_path(start_cell, goal_cell);
        match &path {
            Some(p) => debug!(%start_cell, %goal_cell, steps = p.cells.len() - 1, "path found"),
            None => debug!(%start_cell, %goal_cell, "no path"),
        }
        let tile = self.terrain.tile_size();
        path.map(|p| p.cells.into_iter().map(|c| c.center(tile)).collect())
    }

    /// A* between two cells. The start cell may itself be a wall (a unit
    /// pushed against geometry still gets routed out); off-grid endpoints
    /// and wall goals fail.
    pub fn find_cell_path(&self, start: GridCell, goal: GridCell) -> Option<CellPath> {
        let start_idx = self.index(start)?;
        let goal_idx = self.index(goal)?;
        if self.terrain.is_wall_cell(goal) {
            return None;
        }
        if start_idx == goal_idx {
            return Some(CellPath {
                cells: vec![start],
                g_scores: vec![0],
            });
        }

        let n = self.terrain.width() as usize * self.terrain.height() as usize;
        let mut g_score = vec![u32::MAX; n];
        let mut came_from: Vec<Option<GridCell>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut sequence = 0u64;

        g_score[start_idx] = 0;
        let mut open = BinaryHeap::new();
        open.push(OpenEntry {
            cell: start,
            f_score: start.manhattan_distance(goal),
            sequence,
        });

        while let Some(current) = open.pop() {
            let Some(ci) = self.index(current.cell) else {
                continue;
            };
            if ci == goal_idx {
                return Some(reconstruct_path(&came_from, &g_score, self, start, goal));
            }
            if closed[ci] {
                continue;
            }
            closed[ci] = true;

            let tentative_g = g_score[ci] + 1;
            for neighbor in current.cell.neighbors4() {
                if self.terrain.is_wall_cell(neighbor) {
                    continue;
                }
                let Some(ni) = self.index(neighbor) else {
                    continue;
                };
                if closed[ni] || tentative_g >= g_score[ni] {
                    continue;
                }
                g_score[ni] = tentative_g;
                came_from[ni] = Some(current.cell);
                sequence += 1;
                open.push(OpenEntry {
                    cell: neighbor,
                    f_score: tentative_g + neighbor.manhattan_distance(goal),
                    sequence,
                });
            }
        }

        None
    }

    /// Nearest open cell to `cell` within `fallback_radius` 4-connected
    /// steps, searched breadth-first. Returns `cell` itself when open.
    pub fn nearest_walkable(&self, cell: GridCell) -> Option<GridCell> {
        let mut queue = VecDeque::from([(cell, 0u32)]);
        let mut visited = FxHashSet::default();
        visited.insert(cell);

        while let Some((current, depth)) = queue.pop_front() {
            if self.terrain.in_bounds(current) && !self.terrain.is_wall_cell(current) {
                return Some(current);
            }
            if depth >= self.fallback_radius {
                continue;
            }
            for neighbor in current.neighbors4() {
                if self.terrain.in_bounds(neighbor) && visited.insert(neighbor) {
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }
        None
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        if self.terrain.in_bounds(cell) {
            Some(cell.col as usize + cell.row as usize * self.terrain.width() as usize)
        } else {
            None
        }
    }
}

fn reconstruct_path(
    came_from: &[Option<GridCell>],
    g_score: &[u32],
    nav: &GridNavigator<'_>,
    start: GridCell,
    goal: GridCell,
) -> CellPath {
    let mut cells = Vec::new();
    let mut g_scores = Vec::new();
    let mut current = goal;

    loop {
        let Some(i) = nav.index(current) else {
            break;
        };
        cells.push(current);
        g_scores.push(g_score[i]);
        if current == start {
            break;
        }
        match came_from[i] {
            Some(prev) => current = prev,
            None => break,
        }
    }

    cells.reverse();
    g_scores.reverse();
    CellPath { cells, g_scores }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_5x5() -> Terrain {
        Terrain::from_ascii(&[".....", ".....", ".....", ".....", "....."], 10.0)
    }

    #[test]
    fn astar_open_grid_corner_to_corner() {
        let terrain = open_5x5();
        let nav = GridNavigator::new(&terrain, 10);
        let path = nav
            .find_cell_path(GridCell::new(0, 0), GridCell::new(4, 4))
            .unwrap();
        assert_eq!(path.cells.len(), 9);
        assert_eq!(path.cells[0], GridCell::new(0, 0));
        assert_eq!(path.cells[8], GridCell::new(4, 4));
        assert!(path.g_scores.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(path.g_scores[8], 8);
        for step in path.cells.windows(2) {
            assert_eq!(step[0].manhattan_distance(step[1]), 1);
        }
    }

    #[test]
    fn world_path_returns_cell_centres() {
        let terrain = open_5x5();
        let nav = GridNavigator::new(&terrain, 10);
        let points = nav
            .find_path(WorldPoint::new(2.0, 3.0), WorldPoint::new(44.0, 41.0))
            .unwrap();
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], WorldPoint::new(5.0, 5.0));
        assert_eq!(points[8], WorldPoint::new(45.0, 45.0));
    }

    #[test]
    fn astar_trivial_path() {
        let terrain = open_5x5();
        let nav = GridNavigator::new(&terrain, 10);
        let path = nav
            .find_cell_path(GridCell::new(2, 2), GridCell::new(2, 2))
            .unwrap();
        assert_eq!(path.cells, vec![GridCell::new(2, 2)]);
    }

    #[test]
    fn astar_routes_around_wall() {
        let terrain = Terrain::from_ascii(&[".....", ".###.", ".#.#.", ".#.#.", "....."], 10.0);
        let nav = GridNavigator::new(&terrain, 10);
        let path = nav
            .find_cell_path(GridCell::new(0, 0), GridCell::new(2, 2))
            .map(|p| p.cells);
        // (2,2) is only reachable from below through (2,3).
        let cells = path.unwrap();
        assert_eq!(cells.len(), 9);
        assert!(cells.iter().all(|&c| !terrain.is_wall_cell(c)));
        assert_eq!(cells[cells.len() - 2], GridCell::new(2, 3));
    }

    #[test]
    fn astar_no_path() {
        let terrain = Terrain::from_ascii(&["..#..", "..#..", "..#.."], 10.0);
        let nav = GridNavigator::new(&terrain, 10);
        assert!(
            nav.find_cell_path(GridCell::new(0, 0), GridCell::new(4, 0))
                .is_none()
        );
    }

    #[test]
    fn astar_deterministic() {
        let terrain = open_5x5();
        let nav = GridNavigator::new(&terrain, 10);
        let a = nav.find_cell_path(GridCell::new(0, 4), GridCell::new(4, 0));
        let b = nav.find_cell_path(GridCell::new(0, 4), GridCell::new(4, 0));
        assert_eq!(a, b);
    }

    #[test]
    fn wall_goal_falls_back_to_nearest_open_cell() {
        let terrain = Terrain::from_ascii(&[".....", ".###.", ".###.", ".###.", "....."], 10.0);
        let nav = GridNavigator::new(&terrain, 10);
        let centre = GridCell::new(2, 2);
        let fallback = nav.nearest_walkable(centre).unwrap();
        assert_eq!(centre.manhattan_distance(fallback), 2);
        let points = nav
            .find_path(WorldPoint::new(5.0, 5.0), centre.center(10.0))
            .unwrap();
        let last = *points.last().unwrap();
        assert!(!terrain.is_wall(last));
    }

    #[test]
    fn wall_goal_without_open_cell_in_radius_fails() {
        let rows = ["#######"; 7];
        let mut rows: Vec<&str> = rows.to_vec();
        rows[0] = ".######";
        let terrain = Terrain::from_ascii(&rows, 10.0);
        // The only open cell is 6 steps from the centre.
        let nav = GridNavigator::new(&terrain, 5);
        assert!(nav.nearest_walkable(GridCell::new(3, 3)).is_none());
        assert!(
            nav.find_path(WorldPoint::new(5.0, 5.0), WorldPoint::new(35.0, 35.0))
                .is_none()
        );
        let wider = GridNavigator::new(&terrain, 6);
        assert_eq!(
            wider.nearest_walkable(GridCell::new(3, 3)),
            Some(GridCell::new(0, 0))
        );
    }

    #[test]
    fn off_grid_goal_fails() {
        let terrain = open_5x5();
        let nav = GridNavigator::new(&terrain, 0);
        assert!(
            nav.find_path(WorldPoint::new(5.0, 5.0), WorldPoint::new(500.0, 5.0))
                .is_none()
        );
    }
}
