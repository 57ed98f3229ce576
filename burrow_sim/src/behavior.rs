// Pluggable unit behavior: events in, action descriptors out.
//
// A behavior is a typed callback registered for one `BehaviorEvent`. It gets
// a read-only view of the unit (`&Entity`) and a `BehaviorContext` carrying
// the event payload, and answers with an `ActionDescriptor` (or `None` to
// leave the unit alone). Callbacks never mutate the unit; the controller's
// dispatcher is the only code that turns a descriptor into a destination
// and a state. A callback that fails returns `Err(BehaviorError)`, which the
// controller reports and otherwise ignores.
//
// `ActionDescriptor` is a closed enum and serializes with a `kind` tag, so
// behavior tables authored outside Rust can be expressed as plain JSON
// values.
//
// `BehaviorSet::worker_defaults()` is the stock gatherer: explore when idle,
// mine what it spots, run from enemies, and study anything unidentified.
//
// See also: `controller.rs` for the dispatcher and the cadences that fire
// these events, `entity.rs` for the view callbacks receive.

use crate::entity::Entity;
use crate::error::BehaviorError;
use crate::perception::PerceivedObject;
use crate::types::{ObjectId, ObjectKind, ResourceKind, WorldPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// An intended action. Interpreted by the controller's dispatcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionDescriptor {
    Move {
        target: WorldPoint,
    },
    Approach {
        target: WorldPoint,
    },
    Flee {
        target: WorldPoint,
    },
    Gather {
        target: WorldPoint,
        #[serde(default)]
        resource: Option<ObjectId>,
    },
    Attack {
        target: WorldPoint,
    },
    #[serde(rename_all = "camelCase")]
    MoveAndAttack {
        target: WorldPoint,
        #[serde(default)]
        attack_target: Option<ObjectId>,
    },
    ReturnToBase,
    Analyze {
        object: ObjectId,
    },
    Explore,
}

/// Events a unit can react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BehaviorEvent {
    #[serde(rename = "onIdle")]
    Idle,
    #[serde(rename = "onResourceSpotted")]
    ResourceSpotted,
    #[serde(rename = "onEnemySpotted")]
    EnemySpotted,
    #[serde(rename = "onDamaged")]
    Damaged,
    #[serde(rename = "onNewObjectPerceived")]
    NewObjectPerceived,
}

impl BehaviorEvent {
    pub const ALL: [BehaviorEvent; 5] = [
        BehaviorEvent::Idle,
        BehaviorEvent::ResourceSpotted,
        BehaviorEvent::EnemySpotted,
        BehaviorEvent::Damaged,
        BehaviorEvent::NewObjectPerceived,
    ];

    /// The script-facing event name.
    pub fn name(self) -> &'static str {
        match self {
            BehaviorEvent::Idle => "onIdle",
            BehaviorEvent::ResourceSpotted => "onResourceSpotted",
            BehaviorEvent::EnemySpotted => "onEnemySpotted",
            BehaviorEvent::Damaged => "onDamaged",
            BehaviorEvent::NewObjectPerceived => "onNewObjectPerceived",
        }
    }
}

impl fmt::Display for BehaviorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown event name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownEvent(pub String);

impl FromStr for BehaviorEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Whoever dealt damage, as far as the victim can tell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageSource {
    pub position: WorldPoint,
    pub health: f64,
}

/// Payload handed to a behavior callback.
#[derive(Clone, Debug, PartialEq)]
pub enum BehaviorContext {
    Idle,
    ResourceSpotted {
        object: ObjectId,
        resource: Option<ResourceKind>,
        position: WorldPoint,
    },
    EnemySpotted {
        object: ObjectId,
        position: WorldPoint,
    },
    Damaged {
        amount: f64,
        source: Option<DamageSource>,
    },
    NewObjectPerceived {
        object: PerceivedObject,
    },
}

impl BehaviorContext {
    pub fn event(&self) -> BehaviorEvent {
        match self {
            BehaviorContext::Idle => BehaviorEvent::Idle,
            BehaviorContext::ResourceSpotted { .. } => BehaviorEvent::ResourceSpotted,
            BehaviorContext::EnemySpotted { .. } => BehaviorEvent::EnemySpotted,
            BehaviorContext::Damaged { .. } => BehaviorEvent::Damaged,
            BehaviorContext::NewObjectPerceived { .. } => BehaviorEvent::NewObjectPerceived,
        }
    }
}

pub type BehaviorResult = Result<Option<ActionDescriptor>, BehaviorError>;

/// A registered behavior callback.
pub type BehaviorFn = Box<dyn FnMut(&Entity, &BehaviorContext) -> BehaviorResult>;

/// Callbacks keyed by event. At most one per event.
#[derive(Default)]
pub struct BehaviorSet {
    callbacks: BTreeMap<BehaviorEvent, BehaviorFn>,
}

impl fmt::Debug for BehaviorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.callbacks.keys()).finish()
    }
}

impl BehaviorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`, replacing any previous one.
    pub fn set(
        &mut self,
        event: BehaviorEvent,
        callback: impl FnMut(&Entity, &BehaviorContext) -> BehaviorResult + 'static,
    ) {
        self.callbacks.insert(event, Box::new(callback));
    }

    pub fn set_boxed(&mut self, event: BehaviorEvent, callback: BehaviorFn) {
        self.callbacks.insert(event, callback);
    }

    pub fn remove(&mut self, event: BehaviorEvent) -> bool {
        self.callbacks.remove(&event).is_some()
    }

    pub fn has(&self, event: BehaviorEvent) -> bool {
        self.callbacks.contains_key(&event)
    }

    /// Run the callback for the context's event. `None` when nothing is
    /// registered for it.
    pub fn invoke(&mut self, entity: &Entity, context: &BehaviorContext) -> Option<BehaviorResult> {
        let callback = self.callbacks.get_mut(&context.event())?;
        Some(callback(entity, context))
    }

    /// The stock worker: explore, gather, flee, analyze.
    pub fn worker_defaults() -> Self {
        let mut set = Self::new();
        set.set(BehaviorEvent::Idle, |_, _| Ok(Some(ActionDescriptor::Explore)));
        set.set(BehaviorEvent::ResourceSpotted, |unit, ctx| {
            let BehaviorContext::ResourceSpotted {
                object, position, ..
            } = ctx
            else {
                return Ok(None);
            };
            if unit.is_full() {
                return Ok(Some(ActionDescriptor::ReturnToBase));
            }
            Ok(Some(ActionDescriptor::Gather {
                target: *position,
                resource: Some(*object),
            }))
        });
        set.set(BehaviorEvent::EnemySpotted, |unit, ctx| {
            let BehaviorContext::EnemySpotted { position, .. } = ctx else {
                return Ok(None);
            };
            Ok(Some(ActionDescriptor::Flee {
                target: unit.position.mirror(*position),
            }))
        });
        set.set(BehaviorEvent::Damaged, |unit, ctx| {
            let BehaviorContext::Damaged { source, .. } = ctx else {
                return Ok(None);
            };
            Ok(react_to_damage(unit, source.as_ref()))
        });
        set.set(BehaviorEvent::NewObjectPerceived, |_, ctx| {
            let BehaviorContext::NewObjectPerceived { object } = ctx else {
                return Ok(None);
            };
            let unidentified = matches!(object.kind, ObjectKind::Unknown | ObjectKind::Obstacle);
            if unidentified && !object.analyzed {
                Ok(Some(ActionDescriptor::Analyze { object: object.id }))
            } else {
                Ok(None)
            }
        });
        set
    }
}

/// Attack reach used when deciding between `attack` and `moveAndAttack`.
const MELEE_REACH: f64 = 15.0;

fn react_to_damage(unit: &Entity, source: Option<&DamageSource>) -> Option<ActionDescriptor> {
    match source {
        None if unit.is_critical() => Some(ActionDescriptor::ReturnToBase),
        None => None,
        Some(src) if unit.is_critical() => Some(ActionDescriptor::Flee {
            target: unit.position.mirror(src.position),
        }),
        Some(src) if src.health < unit.health * 0.5 => {
            if unit.distance_to(src.position) <= MELEE_REACH {
                Some(ActionDescriptor::Attack {
                    target: src.position,
                })
            } else {
                Some(ActionDescriptor::MoveAndAttack {
                    target: src.position,
                    attack_target: None,
                })
            }
        }
        Some(src) => Some(ActionDescriptor::Flee {
            target: unit.position.mirror(src.position),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Stats;
    use crate::types::{EntityId, ResourceKind};

    fn unit_at(x: f64, y: f64) -> Entity {
        Entity::new(EntityId(0), WorldPoint::new(x, y), Stats::worker())
    }

    #[test]
    fn event_names_parse() {
        assert_eq!("onIdle".parse::<BehaviorEvent>(), Ok(BehaviorEvent::Idle));
        assert_eq!(
            "onNewObjectPerceived".parse::<BehaviorEvent>(),
            Ok(BehaviorEvent::NewObjectPerceived)
        );
        assert!("onLunch".parse::<BehaviorEvent>().is_err());
    }

    #[test]
    fn descriptor_json_uses_kind_tag() {
        let action = ActionDescriptor::MoveAndAttack {
            target: WorldPoint::new(1.0, 2.0),
            attack_target: Some(ObjectId(4)),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"moveAndAttack","target":{"x":1.0,"y":2.0},"attackTarget":4}"#
        );
        let parsed: ActionDescriptor = serde_json::from_str(r#"{"kind":"explore"}"#).unwrap();
        assert_eq!(parsed, ActionDescriptor::Explore);
        let parsed: ActionDescriptor =
            serde_json::from_str(r#"{"kind":"gather","target":{"x":0,"y":5}}"#).unwrap();
        assert_eq!(
            parsed,
            ActionDescriptor::Gather {
                target: WorldPoint::new(0.0, 5.0),
                resource: None
            }
        );
    }

    #[test]
    fn invoke_without_callback_is_none() {
        let mut set = BehaviorSet::new();
        assert!(set.invoke(&unit_at(0.0, 0.0), &BehaviorContext::Idle).is_none());
    }

    #[test]
    fn set_replaces_previous_callback() {
        let mut set = BehaviorSet::new();
        set.set(BehaviorEvent::Idle, |_, _| Ok(None));
        set.set(BehaviorEvent::Idle, |_, _| Ok(Some(ActionDescriptor::ReturnToBase)));
        let result = set.invoke(&unit_at(0.0, 0.0), &BehaviorContext::Idle);
        assert_eq!(result, Some(Ok(Some(ActionDescriptor::ReturnToBase))));
        assert!(set.remove(BehaviorEvent::Idle));
        assert!(!set.has(BehaviorEvent::Idle));
    }

    #[test]
    fn worker_gathers_until_full() {
        let mut set = BehaviorSet::worker_defaults();
        let ctx = BehaviorContext::ResourceSpotted {
            object: ObjectId(3),
            resource: Some(ResourceKind::Energy),
            position: WorldPoint::new(50.0, 60.0),
        };
        let mut unit = unit_at(0.0, 0.0);
        assert_eq!(
            set.invoke(&unit, &ctx),
            Some(Ok(Some(ActionDescriptor::Gather {
                target: WorldPoint::new(50.0, 60.0),
                resource: Some(ObjectId(3)),
            })))
        );
        unit.store(ResourceKind::Energy, 30.0);
        assert_eq!(
            set.invoke(&unit, &ctx),
            Some(Ok(Some(ActionDescriptor::ReturnToBase)))
        );
    }

    #[test]
    fn worker_flees_away_from_enemy() {
        let mut set = BehaviorSet::worker_defaults();
        let ctx = BehaviorContext::EnemySpotted {
            object: ObjectId(1),
            position: WorldPoint::new(120.0, 100.0),
        };
        assert_eq!(
            set.invoke(&unit_at(100.0, 100.0), &ctx),
            Some(Ok(Some(ActionDescriptor::Flee {
                target: WorldPoint::new(80.0, 100.0)
            })))
        );
    }

    #[test]
    fn damage_reactions() {
        let mut healthy = unit_at(0.0, 0.0);
        let weak = DamageSource {
            position: WorldPoint::new(10.0, 0.0),
            health: 20.0,
        };
        assert_eq!(
            react_to_damage(&healthy, Some(&weak)),
            Some(ActionDescriptor::Attack {
                target: weak.position
            })
        );
        let far_weak = DamageSource {
            position: WorldPoint::new(100.0, 0.0),
            health: 20.0,
        };
        assert!(matches!(
            react_to_damage(&healthy, Some(&far_weak)),
            Some(ActionDescriptor::MoveAndAttack { .. })
        ));
        let strong = DamageSource {
            position: WorldPoint::new(10.0, 0.0),
            health: 100.0,
        };
        assert_eq!(
            react_to_damage(&healthy, Some(&strong)),
            Some(ActionDescriptor::Flee {
                target: WorldPoint::new(-10.0, 0.0)
            })
        );
        assert_eq!(react_to_damage(&healthy, None), None);

        healthy.take_damage(80.0);
        assert_eq!(
            react_to_damage(&healthy, None),
            Some(ActionDescriptor::ReturnToBase)
        );
        assert!(matches!(
            react_to_damage(&healthy, Some(&weak)),
            Some(ActionDescriptor::Flee { .. })
        ));
    }
}
