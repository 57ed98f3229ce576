// Unit records: identity, position, vitals, cargo, and the state machine
// fields the controller drives.
//
// A unit is a single `Entity` value with an attached `Stats` block. There is
// no specialization hierarchy; a worker is an entity whose stats came from
// `Stats::worker()` and whose controller carries the worker behavior set.
//
// Two invariants are enforced here rather than by callers, which is why the
// relevant fields are private:
// - cargo weight never exceeds carry capacity (`store()` clamps);
// - `mode` always mirrors `state` (`set_state()` writes both).
//
// See also: `controller.rs` which owns one `Entity` per unit, `config.rs`
// where the worker `Stats` preset is configured, `task.rs` for
// `current_task`.

use crate::config::MovementParams;
use crate::task::Task;
use crate::types::{EntityId, ResourceKind, UnitState, WorldPoint};
use serde::{Deserialize, Serialize};

/// Tunable per-unit numbers. Grows on level-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub max_health: f64,
    /// World units per second.
    pub speed: f64,
    pub carry_capacity: f64,
    /// Analysis skill; each analysis call adds `perception / 10` on top of
    /// the base rate.
    pub perception: f64,
    /// World units the unit can see.
    pub perception_radius: f64,
    /// Health regenerated per second.
    pub regen_speed: f64,
    /// Most units gathered per gather action.
    pub gathering_speed: f64,
    /// Multiplier on gathered amounts.
    pub mining_efficiency: f64,
    pub attack_power: f64,
    pub defense: f64,
}

impl Stats {
    pub fn worker() -> Self {
        Self {
            max_health: 100.0,
            speed: 40.0,
            carry_capacity: 30.0,
            perception: 50.0,
            perception_radius: 150.0,
            regen_speed: 1.0,
            gathering_speed: 5.0,
            mining_efficiency: 1.0,
            attack_power: 10.0,
            defense: 5.0,
        }
    }

    fn level_up(&mut self) {
        self.max_health += 10.0;
        self.speed += 0.2;
        self.carry_capacity += 5.0;
        self.perception += 2.0;
        self.perception_radius += 5.0;
        self.gathering_speed += 0.5;
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::worker()
    }
}

/// Typed cargo hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub energy: f64,
    pub matter: f64,
}

impl Cargo {
    pub fn weight(&self) -> f64 {
        self.energy + self.matter
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Energy => self.energy,
            ResourceKind::Matter => self.matter,
        }
    }

    fn add(&mut self, kind: ResourceKind, amount: f64) {
        match kind {
            ResourceKind::Energy => self.energy += amount,
            ResourceKind::Matter => self.matter += amount,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weight() <= 0.0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: WorldPoint,
    /// Facing, in radians. Updated on every step.
    pub direction: f64,
    pub health: f64,
    pub stats: Stats,
    pub destination: Option<WorldPoint>,
    pub current_task: Option<Task>,
    pub is_moving: bool,
    pub level: u32,
    pub experience: f64,
    cargo: Cargo,
    state: UnitState,
    mode: UnitState,
}

impl Entity {
    pub fn new(id: EntityId, position: WorldPoint, stats: Stats) -> Self {
        Self {
            id,
            position,
            direction: 0.0,
            health: stats.max_health,
            stats,
            destination: None,
            current_task: None,
            is_moving: false,
            level: 1,
            experience: 0.0,
            cargo: Cargo::default(),
            state: UnitState::Idle,
            mode: UnitState::Idle,
        }
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Mirror of `state`, kept for views that read the older name.
    pub fn mode(&self) -> UnitState {
        self.mode
    }

    /// Returns `true` when the state changed.
    pub fn set_state(&mut self, state: UnitState) -> bool {
        let changed = self.state != state;
        self.state = state;
        self.mode = state;
        changed
    }

    pub fn cargo(&self) -> Cargo {
        self.cargo
    }

    pub fn remaining_capacity(&self) -> f64 {
        (self.stats.carry_capacity - self.cargo.weight()).max(0.0)
    }

    pub fn is_full(&self) -> bool {
        self.cargo.weight() >= self.stats.carry_capacity
    }

    pub fn is_overloaded(&self) -> bool {
        self.cargo.weight() > self.stats.carry_capacity
    }

    /// Add cargo, clamped to the remaining capacity. Returns what was
    /// actually stored.
    pub fn store(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let stored = amount.max(0.0).min(self.remaining_capacity());
        self.cargo.add(kind, stored);
        stored
    }

    /// Empty the hold, returning what it held.
    pub fn unload(&mut self) -> Cargo {
        std::mem::take(&mut self.cargo)
    }

    pub fn health_fraction(&self) -> f64 {
        if self.stats.max_health <= 0.0 {
            0.0
        } else {
            self.health / self.stats.max_health
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health_fraction() > 0.7
    }

    pub fn is_injured(&self) -> bool {
        self.health_fraction() < 0.7
    }

    pub fn is_critical(&self) -> bool {
        self.health_fraction() <= 0.3
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn heal(&mut self, amount: f64) {
        self.health = (self.health + amount).min(self.stats.max_health);
    }

    /// Subtract health, never below zero. Returns the new health.
    pub fn take_damage(&mut self, amount: f64) -> f64 {
        self.health = (self.health - amount.max(0.0)).max(0.0);
        self.health
    }

    /// Current speed in units per second after load and wound penalties.
    pub fn effective_speed(&self, movement: &MovementParams) -> f64 {
        let mut speed = self.stats.speed;
        if self.is_overloaded() {
            speed *= movement.overload_factor;
        }
        if self.health_fraction() < movement.wounded_threshold {
            speed *= movement.wounded_factor;
        }
        speed
    }

    /// Add experience, levelling up as many times as it covers. Each level
    /// costs `level * 100` and the remainder carries over. Returns the
    /// number of levels gained.
    pub fn gain_experience(&mut self, amount: f64) -> u32 {
        self.experience += amount.max(0.0);
        let mut gained = 0;
        loop {
            let cost = self.level as f64 * 100.0;
            if self.experience < cost {
                break;
            }
            self.experience -= cost;
            self.level += 1;
            self.stats.level_up();
            self.health = self.stats.max_health;
            gained += 1;
        }
        gained
    }

    pub fn distance_to(&self, point: WorldPoint) -> f64 {
        self.position.distance(point)
    }
}
