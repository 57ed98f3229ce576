// Per-unit fog of war and object memory.
//
// `FogOfWar` tracks two sets of coarse cells (50 units by default). The
// visible set is rebuilt from scratch on every refresh: every cell whose
// offset from the unit's cell lies inside a circle of
// `ceil(perception_radius / cell_size)` cells. Cells with a negative
// coordinate are never visible. The explored set only grows, and `refresh`
// reports each cell the first time it joins it. With fog disabled every
// point is visible and nothing is ever explored.
//
// `PerceptionMemory` is the unit's private record of world objects it has
// seen. Entries are keyed by `ObjectId` and hold a last-known snapshot plus
// analysis progress. The memory is bounded; when a new sighting would
// exceed capacity, the entry seen longest ago is evicted first.
// Analysis progress only moves upward, and revealed properties are only
// ever appended.
//
// See also: `controller.rs` which runs fog refreshes, perception scans and
// analysis on its cadences, `world.rs` for the `WorldObject`s being
// remembered.

use crate::types::{GridCell, ObjectId, ObjectKind, ResourceKind, WorldPoint};
use crate::world::WorldObject;
use burrow_prng::SimRng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Fog of war
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct FogOfWar {
    enabled: bool,
    cell_size: f64,
    visible: FxHashSet<GridCell>,
    explored: FxHashSet<GridCell>,
}

impl FogOfWar {
    pub fn new(cell_size: f64, enabled: bool) -> Self {
        Self {
            enabled,
            cell_size,
            visible: FxHashSet::default(),
            explored: FxHashSet::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Rebuild the visible set around `center`. Returns the cells that were
    /// explored for the first time, in scan order (rows top to bottom).
    pub fn refresh(&mut self, center: WorldPoint, radius: f64) -> Vec<GridCell> {
        if !self.enabled {
            return Vec::new();
        }
        self.visible.clear();
        let origin = GridCell::containing(center, self.cell_size);
        let reach = (radius / self.cell_size).ceil() as i32;
        let mut newly_explored = Vec::new();

        for dr in -reach..=reach {
            for dc in -reach..=reach {
                if dc * dc + dr * dr > reach * reach {
                    continue;
                }
                let cell = origin.offset(dc, dr);
                if cell.col < 0 || cell.row < 0 {
                    continue;
                }
                self.visible.insert(cell);
                if self.explored.insert(cell) {
                    newly_explored.push(cell);
                }
            }
        }
        newly_explored
    }

    pub fn is_visible(&self, point: WorldPoint) -> bool {
        !self.enabled || self.visible.contains(&GridCell::containing(point, self.cell_size))
    }

    pub fn is_explored(&self, cell: GridCell) -> bool {
        self.explored.contains(&cell)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    pub fn explored_count(&self) -> usize {
        self.explored.len()
    }

    /// Heading towards a random unexplored cell near `center`, searching
    /// `ceil(radius / cell_size) + padding` cells out. `None` when fog is
    /// off, nothing has been explored yet, or every nearby cell is
    /// explored; callers then pick a random heading.
    pub fn unexplored_heading(
        &self,
        center: WorldPoint,
        radius: f64,
        padding: i32,
        rng: &mut SimRng,
    ) -> Option<f64> {
        if !self.enabled || self.explored.is_empty() {
            return None;
        }
        let origin = GridCell::containing(center, self.cell_size);
        let reach = (radius / self.cell_size).ceil() as i32 + padding;
        let mut candidates = Vec::new();
        for dr in -reach..=reach {
            for dc in -reach..=reach {
                let cell = origin.offset(dc, dr);
                if cell.col >= 0 && cell.row >= 0 && !self.explored.contains(&cell) {
                    candidates.push(cell);
                }
            }
        }
        let target = rng.pick(&candidates)?;
        Some(center.angle_to(target.center(self.cell_size)))
    }
}

// ---------------------------------------------------------------------------
// Perception memory
// ---------------------------------------------------------------------------

/// What a unit remembers about one world object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerceivedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub resource: Option<ResourceKind>,
    pub position: WorldPoint,
    /// Distance from the observer at the last sighting.
    pub distance: f64,
    /// Bearing from the observer at the last sighting, in radians.
    pub direction: f64,
    pub size: f64,
    pub color: String,
    /// 0 to 100.
    pub analyzed_percentage: f64,
    pub analyzed: bool,
    /// Properties revealed so far.
    pub properties: SmallVec<[String; 4]>,
    pub first_seen_ms: f64,
    pub last_seen_ms: f64,
}

/// Outcome of recording a sighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sighting {
    /// First time this object was seen.
    New,
    /// Already known; the snapshot was refreshed.
    Updated,
    /// Already fully analyzed; only the sighting time was refreshed.
    Ignored,
    /// Not remembered: memory is full of objects seen this instant.
    Full,
}

/// Outcome of one analysis step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnalysisStep {
    Partial(f64),
    /// This step reached 100%.
    Completed,
    /// The object was already fully analyzed.
    AlreadyAnalyzed,
}

#[derive(Clone, Debug)]
pub struct PerceptionMemory {
    objects: BTreeMap<ObjectId, PerceivedObject>,
    capacity: usize,
}

impl PerceptionMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            objects: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&PerceivedObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// All remembered objects, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PerceivedObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn forget(&mut self, id: ObjectId) -> Option<PerceivedObject> {
        self.objects.remove(&id)
    }

    /// Record a sighting of `object` from `observer` at time `now_ms`.
    /// Analysis progress and revealed properties survive the merge.
    pub fn observe(&mut self, object: &WorldObject, observer: WorldPoint, now_ms: f64) -> Sighting {
        let distance = observer.distance(object.position);
        let direction = observer.angle_to(object.position);

        if let Some(known) = self.objects.get_mut(&object.id) {
            known.last_seen_ms = now_ms;
            if known.analyzed {
                return Sighting::Ignored;
            }
            known.position = object.position;
            known.distance = distance;
            known.direction = direction;
            known.size = object.size;
            known.kind = object.kind;
            return Sighting::Updated;
        }

        if self.objects.len() >= self.capacity && !self.evict_stalest(now_ms) {
            return Sighting::Full;
        }
        self.objects.insert(
            object.id,
            PerceivedObject {
                id: object.id,
                kind: object.kind,
                resource: object.resource_kind(),
                position: object.position,
                distance,
                direction,
                size: object.size,
                color: object.color.clone(),
                analyzed_percentage: 0.0,
                analyzed: false,
                properties: SmallVec::new(),
                first_seen_ms: now_ms,
                last_seen_ms: now_ms,
            },
        );
        Sighting::New
    }

    /// Drop the least recently seen entry. Entries seen at `now_ms` are
    /// still in view and are never dropped; returns false when only those
    /// remain.
    fn evict_stalest(&mut self, now_ms: f64) -> bool {
        let stalest = self
            .objects
            .values()
            .filter(|o| o.last_seen_ms < now_ms)
            .min_by(|a, b| a.last_seen_ms.total_cmp(&b.last_seen_ms))
            .map(|o| o.id);
        match stalest {
            Some(id) => self.objects.remove(&id).is_some(),
            None => false,
        }
    }

    /// Advance analysis of a remembered object by `increment` percent,
    /// revealing a share of `source`'s properties proportional to the new
    /// percentage. Analyzing counts as seeing: position and `last_seen_ms`
    /// are refreshed from `source`. `None` when the object is not
    /// remembered.
    pub fn analyze(
        &mut self,
        id: ObjectId,
        source: &WorldObject,
        increment: f64,
        now_ms: f64,
    ) -> Option<AnalysisStep> {
        let known = self.objects.get_mut(&id)?;
        known.position = source.position;
        known.last_seen_ms = now_ms;
        if known.analyzed {
            return Some(AnalysisStep::AlreadyAnalyzed);
        }

        known.analyzed_percentage += increment.max(0.0);
        if known.analyzed_percentage >= 100.0 {
            known.analyzed_percentage = 100.0;
            known.analyzed = true;
            reveal(&mut known.properties, &source.properties);
            return Some(AnalysisStep::Completed);
        }

        let shown =
            (source.properties.len() as f64 * known.analyzed_percentage / 100.0).floor() as usize;
        reveal(&mut known.properties, &source.properties[..shown]);
        Some(AnalysisStep::Partial(known.analyzed_percentage))
    }
}

/// Append each of `source` not already in `revealed`.
fn reveal(revealed: &mut SmallVec<[String; 4]>, source: &[String]) {
    for property in source {
        if !revealed.contains(property) {
            revealed.push(property.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: u32, x: f64, y: f64, properties: &[&str]) -> WorldObject {
        WorldObject {
            id: ObjectId(id),
            position: WorldPoint::new(x, y),
            kind: ObjectKind::Unknown,
            size: 10.0,
            color: "#ffffff".into(),
            resource: None,
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn visible_set_is_a_cell_disc() {
        let mut fog = FogOfWar::new(50.0, true);
        // Radius 100 -> 2 cells; a radius-2 disc has 13 cells.
        let fresh = fog.refresh(WorldPoint::new(525.0, 525.0), 100.0);
        assert_eq!(fresh.len(), 13);
        assert_eq!(fog.visible_count(), 13);
        assert!(fog.is_visible(WorldPoint::new(525.0, 425.0)));
        assert!(!fog.is_visible(WorldPoint::new(425.0, 425.0)));
    }

    #[test]
    fn negative_cells_are_never_visible() {
        let mut fog = FogOfWar::new(50.0, true);
        fog.refresh(WorldPoint::new(10.0, 10.0), 100.0);
        // Only the quarter disc with non-negative coordinates: 6 cells.
        assert_eq!(fog.visible_count(), 6);
        assert!(!fog.is_visible(WorldPoint::new(-10.0, 10.0)));
    }

    #[test]
    fn explored_set_only_reports_new_cells() {
        let mut fog = FogOfWar::new(50.0, true);
        let first = fog.refresh(WorldPoint::new(525.0, 525.0), 100.0);
        let again = fog.refresh(WorldPoint::new(525.0, 525.0), 100.0);
        assert_eq!(first.len(), 13);
        assert!(again.is_empty());
        let moved = fog.refresh(WorldPoint::new(575.0, 525.0), 100.0);
        // Shifting one cell east uncovers one new column of the disc.
        assert_eq!(moved.len(), 5);
        assert_eq!(fog.explored_count(), 18);
        // The old western edge is no longer visible but stays explored.
        assert!(!fog.is_visible(WorldPoint::new(425.0, 525.0)));
        assert!(fog.is_explored(GridCell::new(8, 10)));
    }

    #[test]
    fn disabled_fog_sees_everything() {
        let mut fog = FogOfWar::new(50.0, false);
        assert!(fog.refresh(WorldPoint::new(100.0, 100.0), 100.0).is_empty());
        assert!(fog.is_visible(WorldPoint::new(9_000.0, 9_000.0)));
        assert!(
            fog.unexplored_heading(WorldPoint::new(0.0, 0.0), 100.0, 2, &mut SimRng::new(1))
                .is_none()
        );
    }

    #[test]
    fn unexplored_heading_points_at_unexplored_side() {
        let mut fog = FogOfWar::new(50.0, true);
        let center = WorldPoint::new(25.0, 25.0);
        fog.refresh(center, 0.0);
        let mut rng = SimRng::new(4);
        for _ in 0..20 {
            let heading = fog.unexplored_heading(center, 0.0, 1, &mut rng).unwrap();
            // Only cells east/south of (0,0) qualify, so the heading stays
            // in the first quadrant.
            assert!((0.0..=std::f64::consts::FRAC_PI_2).contains(&heading));
        }
    }

    #[test]
    fn observe_upserts_and_keeps_progress() {
        let mut memory = PerceptionMemory::new(8);
        let obj = object(1, 30.0, 40.0, &["a", "b"]);
        assert_eq!(memory.observe(&obj, WorldPoint::new(0.0, 0.0), 10.0), Sighting::New);
        memory.analyze(obj.id, &obj, 50.0, 15.0);
        assert_eq!(memory.observe(&obj, WorldPoint::new(30.0, 0.0), 20.0), Sighting::Updated);
        let known = memory.get(obj.id).unwrap();
        assert_eq!(known.distance, 40.0);
        assert_eq!(known.analyzed_percentage, 50.0);
        assert_eq!(known.first_seen_ms, 10.0);
        assert_eq!(known.last_seen_ms, 20.0);
    }

    #[test]
    fn fully_analyzed_objects_are_ignored() {
        let mut memory = PerceptionMemory::new(8);
        let obj = object(1, 0.0, 0.0, &[]);
        memory.observe(&obj, WorldPoint::new(0.0, 0.0), 0.0);
        assert_eq!(memory.analyze(obj.id, &obj, 200.0, 0.0), Some(AnalysisStep::Completed));
        assert_eq!(memory.observe(&obj, WorldPoint::new(5.0, 0.0), 1.0), Sighting::Ignored);
        assert_eq!(memory.analyze(obj.id, &obj, 5.0, 2.0), Some(AnalysisStep::AlreadyAnalyzed));
    }

    #[test]
    fn analysis_reveals_property_prefix_then_everything() {
        let mut memory = PerceptionMemory::new(8);
        let obj = object(2, 0.0, 0.0, &["hot", "heavy", "shiny", "old"]);
        memory.observe(&obj, WorldPoint::new(0.0, 0.0), 0.0);

        assert_eq!(memory.analyze(obj.id, &obj, 20.0, 0.0), Some(AnalysisStep::Partial(20.0)));
        assert!(memory.get(obj.id).unwrap().properties.is_empty());

        memory.analyze(obj.id, &obj, 40.0, 0.0);
        let props: Vec<&str> = memory.get(obj.id).unwrap().properties.iter().map(|s| s.as_str()).collect();
        assert_eq!(props, ["hot", "heavy"]);

        assert_eq!(memory.analyze(obj.id, &obj, 45.0, 0.0), Some(AnalysisStep::Completed));
        let known = memory.get(obj.id).unwrap();
        assert_eq!(known.analyzed_percentage, 100.0);
        assert!(known.analyzed);
        assert_eq!(known.properties.len(), 4);
    }

    #[test]
    fn analyze_unknown_object_is_none() {
        let mut memory = PerceptionMemory::new(8);
        let obj = object(3, 0.0, 0.0, &[]);
        assert!(memory.analyze(obj.id, &obj, 10.0, 0.0).is_none());
    }

    #[test]
    fn full_memory_evicts_stalest_entry() {
        let mut memory = PerceptionMemory::new(2);
        let here = WorldPoint::new(0.0, 0.0);
        memory.observe(&object(1, 0.0, 0.0, &[]), here, 5.0);
        memory.observe(&object(2, 0.0, 0.0, &[]), here, 1.0);
        memory.observe(&object(3, 0.0, 0.0, &[]), here, 9.0);
        assert_eq!(memory.len(), 2);
        assert!(!memory.contains(ObjectId(2)));
        assert!(memory.contains(ObjectId(1)) && memory.contains(ObjectId(3)));
    }

    #[test]
    fn analyzed_objects_in_view_survive_eviction() {
        let mut memory = PerceptionMemory::new(2);
        let here = WorldPoint::new(0.0, 0.0);
        let relic = object(1, 10.0, 0.0, &["old"]);
        let rock = object(2, 20.0, 0.0, &[]);
        let stranger = object(3, 30.0, 0.0, &[]);
        memory.observe(&relic, here, 0.0);
        memory.observe(&rock, here, 0.0);
        memory.analyze(relic.id, &relic, 100.0, 0.0);

        assert_eq!(memory.observe(&relic, here, 10.0), Sighting::Ignored);
        assert_eq!(memory.observe(&rock, here, 10.0), Sighting::Updated);
        // Both remembered objects are in view this scan.
        assert_eq!(memory.observe(&stranger, here, 10.0), Sighting::Full);

        assert_eq!(memory.observe(&relic, here, 20.0), Sighting::Ignored);
        let known = memory.get(relic.id).unwrap();
        assert!(known.analyzed);
        assert_eq!(known.last_seen_ms, 20.0);
        // The rock was not seen at 20, so it makes room.
        assert_eq!(memory.observe(&stranger, here, 20.0), Sighting::New);
        assert!(!memory.contains(rock.id));
        assert!(memory.contains(relic.id));
    }

    #[test]
    fn analysis_refreshes_position_and_sighting_time() {
        let mut memory = PerceptionMemory::new(4);
        let mut obj = object(1, 10.0, 0.0, &[]);
        memory.observe(&obj, WorldPoint::new(0.0, 0.0), 0.0);
        obj.position = WorldPoint::new(40.0, 5.0);
        memory.analyze(obj.id, &obj, 10.0, 300.0);
        let known = memory.get(obj.id).unwrap();
        assert_eq!(known.position, WorldPoint::new(40.0, 5.0));
        assert_eq!(known.last_seen_ms, 300.0);
    }

    #[test]
    fn forget_removes_entry() {
        let mut memory = PerceptionMemory::new(4);
        memory.observe(&object(1, 0.0, 0.0, &[]), WorldPoint::new(0.0, 0.0), 0.0);
        assert!(memory.forget(ObjectId(1)).is_some());
        assert!(memory.is_empty());
        assert!(memory.forget(ObjectId(1)).is_none());
    }
}
