// The world collaborator: terrain, objects and bases behind one trait.
//
// Controllers never own the world. Every call that needs it (`update`,
// `analyze_object`, `gather_resource`, `injure`) takes a world handle as an
// argument, typed by the `World` trait so tests can swap in small fixtures.
// The trait covers the spatial queries perception needs (`objects_in_radius`,
// `object`), the collision and bounds queries movement needs, and the two
// mutations gathering needs (`extract_resource`, `deposit`). `find_path`
// defaults to "no path", so a world without navigation still works.
//
// `CaveWorld` is the concrete implementation over a generated `Terrain`.
// Objects and bases are stored in `BTreeMap`s, so every query returns them
// in id order. Resources regenerate slowly and count as depleted at or
// below half a unit.
//
// See also: `terrain.rs` for the grid, `pathfinding.rs` for the navigator
// behind `find_path`, `sim.rs` which populates a `CaveWorld`.

use crate::entity::Cargo;
use crate::pathfinding::GridNavigator;
use crate::terrain::Terrain;
use crate::types::{BaseId, Bounds, ObjectId, ObjectKind, ResourceKind, WorldPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quantity at or below which a deposit counts as empty.
const DEPLETED_AT: f64 = 0.5;

/// The minable part of a resource object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeposit {
    pub kind: ResourceKind,
    pub quantity: f64,
    pub max_quantity: f64,
}

impl ResourceDeposit {
    pub fn new(kind: ResourceKind, quantity: f64) -> Self {
        Self {
            kind,
            quantity,
            max_quantity: quantity,
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.quantity <= DEPLETED_AT
    }

    /// Remove up to `amount`, returning what was actually taken.
    pub fn extract(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.quantity);
        self.quantity -= taken;
        taken
    }

    fn regenerate(&mut self, dt_ms: f64) {
        let gained = self.kind.regeneration_per_second() * dt_ms / 1000.0;
        self.quantity = (self.quantity + gained).min(self.max_quantity);
    }
}

/// Something placed in the world that units can perceive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: ObjectId,
    pub position: WorldPoint,
    pub kind: ObjectKind,
    pub size: f64,
    pub color: String,
    pub resource: Option<ResourceDeposit>,
    /// Facts revealed by analysis, in reveal order.
    pub properties: Vec<String>,
}

impl WorldObject {
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        self.resource.as_ref().map(|r| r.kind)
    }

    /// A resource object that still has something to mine.
    pub fn is_minable(&self) -> bool {
        self.resource.as_ref().is_some_and(|r| !r.is_depleted())
    }
}

/// A drop-off point with its stockpile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub id: BaseId,
    pub position: WorldPoint,
    pub energy: f64,
    pub matter: f64,
}

/// Everything a unit controller needs from the world.
pub trait World {
    fn is_wall(&self, point: WorldPoint) -> bool;

    fn bounds(&self) -> Bounds;

    /// Objects whose position lies within `radius` of `center`, optionally
    /// filtered by kind.
    fn objects_in_radius(
        &self,
        center: WorldPoint,
        radius: f64,
        kind: Option<ObjectKind>,
    ) -> Vec<&WorldObject>;

    fn object(&self, id: ObjectId) -> Option<&WorldObject>;

    /// Take up to `amount` from a resource object. Returns the amount taken;
    /// zero for missing or non-resource objects.
    fn extract_resource(&mut self, id: ObjectId, amount: f64) -> f64;

    /// Add cargo to a base stockpile. Returns `false` for unknown bases.
    fn deposit(&mut self, base: BaseId, cargo: Cargo) -> bool;

    fn find_path(&self, _start: WorldPoint, _goal: WorldPoint) -> Option<Vec<WorldPoint>> {
        None
    }
}

/// The cave map plus everything placed on it.
#[derive(Clone, Debug)]
pub struct CaveWorld {
    terrain: Terrain,
    fallback_radius: u32,
    objects: BTreeMap<ObjectId, WorldObject>,
    bases: BTreeMap<BaseId, Base>,
    next_object: u32,
    next_base: u32,
}

impl CaveWorld {
    pub fn new(terrain: Terrain, fallback_radius: u32) -> Self {
        Self {
            terrain,
            fallback_radius,
            objects: BTreeMap::new(),
            bases: BTreeMap::new(),
            next_object: 0,
            next_base: 0,
        }
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn navigator(&self) -> GridNavigator<'_> {
        GridNavigator::new(&self.terrain, self.fallback_radius)
    }

    /// Place an object and return its new id.
    pub fn add_object(
        &mut self,
        position: WorldPoint,
        kind: ObjectKind,
        size: f64,
        color: &str,
        resource: Option<ResourceDeposit>,
        properties: Vec<String>,
    ) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.objects.insert(
            id,
            WorldObject {
                id,
                position,
                kind,
                size,
                color: color.to_string(),
                resource,
                properties,
            },
        );
        id
    }

    /// Place a resource deposit with the standard look and properties for
    /// its kind.
    pub fn add_resource(
        &mut self,
        position: WorldPoint,
        kind: ResourceKind,
        quantity: f64,
    ) -> ObjectId {
        let (color, properties): (&str, &[&str]) = match kind {
            ResourceKind::Energy => ("#f5d142", &["luminous", "volatile", "regenerating", "conductive"]),
            ResourceKind::Matter => ("#5fa8d3", &["dense", "crystalline", "inert", "heavy"]),
        };
        self.add_object(
            position,
            ObjectKind::Resource,
            12.0,
            color,
            Some(ResourceDeposit::new(kind, quantity)),
            properties.iter().map(|p| p.to_string()).collect(),
        )
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<WorldObject> {
        self.objects.remove(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    pub fn add_base(&mut self, position: WorldPoint) -> BaseId {
        let id = BaseId(self.next_base);
        self.next_base += 1;
        self.bases.insert(
            id,
            Base {
                id,
                position,
                energy: 0.0,
                matter: 0.0,
            },
        );
        id
    }

    pub fn base(&self, id: BaseId) -> Option<&Base> {
        self.bases.get(&id)
    }

    pub fn bases(&self) -> impl Iterator<Item = &Base> {
        self.bases.values()
    }

    /// Regrow every deposit by `dt_ms` of game time.
    pub fn regenerate(&mut self, dt_ms: f64) {
        for deposit in self.objects.values_mut().filter_map(|o| o.resource.as_mut()) {
            deposit.regenerate(dt_ms);
        }
    }
}

impl World for CaveWorld {
    fn is_wall(&self, point: WorldPoint) -> bool {
        self.terrain.is_wall(point)
    }

    fn bounds(&self) -> Bounds {
        let tile = self.terrain.tile_size();
        Bounds::new(
            0.0,
            0.0,
            self.terrain.width() as f64 * tile,
            self.terrain.height() as f64 * tile,
        )
    }

    fn objects_in_radius(
        &self,
        center: WorldPoint,
        radius: f64,
        kind: Option<ObjectKind>,
    ) -> Vec<&WorldObject> {
        self.objects
            .values()
            .filter(|o| kind.is_none_or(|k| o.kind == k))
            .filter(|o| o.position.distance(center) <= radius)
            .collect()
    }

    fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    fn extract_resource(&mut self, id: ObjectId, amount: f64) -> f64 {
        self.objects
            .get_mut(&id)
            .and_then(|o| o.resource.as_mut())
            .map_or(0.0, |r| r.extract(amount))
    }

    fn deposit(&mut self, base: BaseId, cargo: Cargo) -> bool {
        match self.bases.get_mut(&base) {
            Some(b) => {
                b.energy += cargo.energy;
                b.matter += cargo.matter;
                true
            }
            None => false,
        }
    }

    fn find_path(&self, start: WorldPoint, goal: WorldPoint) -> Option<Vec<WorldPoint>> {
        self.navigator().find_path(start, goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> CaveWorld {
        CaveWorld::new(Terrain::open(20, 20, 10.0), 10)
    }

    #[test]
    fn bounds_cover_whole_grid() {
        let w = world();
        assert_eq!(w.bounds(), Bounds::new(0.0, 0.0, 200.0, 200.0));
    }

    #[test]
    fn radius_query_filters_distance_and_kind() {
        let mut w = world();
        let near = w.add_resource(WorldPoint::new(50.0, 50.0), ResourceKind::Energy, 10.0);
        w.add_resource(WorldPoint::new(150.0, 150.0), ResourceKind::Matter, 10.0);
        let enemy = w.add_object(
            WorldPoint::new(60.0, 50.0),
            ObjectKind::Enemy,
            16.0,
            "#d9453b",
            None,
            Vec::new(),
        );
        let center = WorldPoint::new(55.0, 50.0);
        let all: Vec<ObjectId> = w
            .objects_in_radius(center, 20.0, None)
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(all, vec![near, enemy]);
        let enemies = w.objects_in_radius(center, 20.0, Some(ObjectKind::Enemy));
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].id, enemy);
    }

    #[test]
    fn extraction_never_exceeds_quantity() {
        let mut w = world();
        let id = w.add_resource(WorldPoint::new(50.0, 50.0), ResourceKind::Matter, 3.0);
        assert_eq!(w.extract_resource(id, 5.0), 3.0);
        assert_eq!(w.extract_resource(id, 5.0), 0.0);
        assert!(!w.object(id).unwrap().is_minable());
        assert_eq!(w.extract_resource(ObjectId(99), 5.0), 0.0);
    }

    #[test]
    fn resources_regenerate_up_to_max() {
        let mut w = world();
        let id = w.add_resource(WorldPoint::new(50.0, 50.0), ResourceKind::Energy, 10.0);
        w.extract_resource(id, 4.0);
        w.regenerate(10_000.0);
        let quantity = w.object(id).unwrap().resource.as_ref().unwrap().quantity;
        assert!((quantity - 7.0).abs() < 1e-9);
        w.regenerate(1_000_000.0);
        let quantity = w.object(id).unwrap().resource.as_ref().unwrap().quantity;
        assert_eq!(quantity, 10.0);
    }

    #[test]
    fn deposit_adds_to_stockpile() {
        let mut w = world();
        let base = w.add_base(WorldPoint::new(100.0, 100.0));
        let cargo = Cargo {
            energy: 4.0,
            matter: 6.0,
        };
        assert!(w.deposit(base, cargo));
        assert!(w.deposit(base, cargo));
        let stock = w.base(base).unwrap();
        assert_eq!((stock.energy, stock.matter), (8.0, 12.0));
        assert!(!w.deposit(BaseId(42), cargo));
    }

    #[test]
    fn find_path_goes_through_navigator() {
        let w = world();
        let path = w
            .find_path(WorldPoint::new(15.0, 15.0), WorldPoint::new(45.0, 15.0))
            .unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(*path.last().unwrap(), WorldPoint::new(45.0, 15.0));
    }
}
