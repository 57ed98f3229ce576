// Unit notifications and the sinks that receive them.
//
// Controllers never log domain happenings directly. Each one is built with
// a boxed `EventSink` and reports what it did as `UnitEvent`s: destinations
// reached, fog cells explored, objects perceived and analyzed, damage,
// dispatched actions, failed behaviors, gathering and deposits. Renderers
// and tests pick the sink that suits them:
//
// - `EventLog`: a cloneable shared buffer. Every clone appends to the same
//   list, so one log can collect events from many units. A bounded log
//   drops its oldest events once full.
// - `TracingSink`: forwards each event to `tracing` at debug level.
// - `NullSink`: drops everything.
//
// See also: `controller.rs` which emits these, `sim.rs` which wires a
// shared `EventLog` into every spawned unit.

use crate::behavior::{ActionDescriptor, BehaviorEvent};
use crate::types::{EntityId, GridCell, ObjectId, ResourceKind};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// A notification from one unit, stamped with the unit's own clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitEvent {
    pub entity: EntityId,
    pub at_ms: f64,
    pub kind: UnitEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UnitEventKind {
    DestinationReached,
    /// A fog cell became explored for the first time.
    AreaExplored { cell: GridCell },
    NewObjectPerceived { object: ObjectId },
    ObjectAnalyzed { object: ObjectId, percentage: f64 },
    ObjectFullyAnalyzed { object: ObjectId },
    GotInjured {
        old_health: f64,
        new_health: f64,
        amount: f64,
    },
    ActionDispatched { action: ActionDescriptor },
    /// A behavior callback returned an error, or its action could not be
    /// dispatched. The unit kept its previous state.
    BehaviorFailed { event: BehaviorEvent, reason: String },
    ResourceGathered {
        object: ObjectId,
        resource: ResourceKind,
        amount: f64,
    },
    ResourcesDeposited { energy: f64, matter: f64 },
    LeveledUp { level: u32 },
}

/// Receiver for unit notifications.
pub trait EventSink {
    fn record(&mut self, event: UnitEvent);
}

/// Shared in-memory event buffer.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    inner: Rc<RefCell<LogBuffer>>,
}

#[derive(Debug, Default)]
struct LogBuffer {
    events: VecDeque<UnitEvent>,
    /// `None` keeps everything.
    capacity: Option<usize>,
    dropped: u64,
}

impl EventLog {
    /// A log that keeps every event until drained.
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding at most `capacity` events, oldest dropped first.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LogBuffer {
                events: VecDeque::new(),
                capacity: Some(capacity),
                dropped: 0,
            })),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.inner.borrow().capacity
    }

    /// Events pushed out of a full bounded log so far.
    pub fn dropped(&self) -> u64 {
        self.inner.borrow().dropped
    }

    /// Copy of everything currently held, oldest first.
    pub fn snapshot(&self) -> Vec<UnitEvent> {
        self.inner.borrow().events.iter().cloned().collect()
    }

    /// Take everything currently held, leaving the log empty.
    pub fn drain(&self) -> Vec<UnitEvent> {
        self.inner.borrow_mut().events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().events.is_empty()
    }

    /// Count held events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&UnitEventKind) -> bool) -> usize {
        self.inner
            .borrow()
            .events
            .iter()
            .filter(|e| predicate(&e.kind))
            .count()
    }
}

impl EventSink for EventLog {
    fn record(&mut self, event: UnitEvent) {
        let mut buffer = self.inner.borrow_mut();
        let capacity = buffer.capacity;
        match capacity {
            Some(0) => {
                buffer.dropped += 1;
                return;
            }
            Some(capacity) if buffer.events.len() >= capacity => {
                buffer.events.pop_front();
                buffer.dropped += 1;
            }
            _ => {}
        }
        buffer.events.push_back(event);
    }
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, event: UnitEvent) {
        debug!(entity = %event.entity, at_ms = event.at_ms, kind = ?event.kind, "unit event");
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _event: UnitEvent) {}
}
