// Unit tasks: multi-cadence work a unit is committed to.
//
// A task outlives a single decision cadence. While a unit holds one, the
// controller drives the task forward on each decision tick instead of
// asking the `onIdle` behavior what to do next. Clearing `current_task` is
// the cancellation primitive.
//
// See also: `controller.rs` for the decision step that executes tasks,
// `entity.rs` where the current task is stored.

use crate::types::{BaseId, ObjectId};
use serde::{Deserialize, Serialize};

/// What the task is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskKind {
    /// Walk up to a remembered object and study it until fully analyzed.
    Analyze { object: ObjectId },
    /// Mine the named deposit (or whatever lies in reach) until full.
    Gather { resource: Option<ObjectId> },
    /// Unload all cargo at a base.
    Deposit { base: BaseId },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    /// Unit clock reading when the task was assigned, in ms.
    pub assigned_at_ms: f64,
}

impl Task {
    pub fn new(kind: TaskKind, assigned_at_ms: f64) -> Self {
        Self {
            kind,
            assigned_at_ms,
        }
    }

    /// The world object this task targets, if any.
    pub fn object(&self) -> Option<ObjectId> {
        match self.kind {
            TaskKind::Analyze { object } => Some(object),
            TaskKind::Gather { resource } => resource,
            TaskKind::Deposit { .. } => None,
        }
    }
}
