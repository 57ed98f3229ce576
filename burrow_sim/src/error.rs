// Runtime error types.
//
// None of these are fatal. Behavior failures are reported through the
// unit's event sink and the unit simply keeps its previous state; tick
// failures are logged by the scheduler and the remaining units still run;
// registration failures surface as a `false` return. Config loading errors
// live next to the loader in `config.rs`.

use crate::types::{EntityId, ObjectId, WorldPoint};
use thiserror::Error;

/// A behavior callback, or the dispatch of its result, failed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BehaviorError {
    #[error("behavior callback failed: {0}")]
    Callback(String),
    #[error("no base assigned to return to")]
    NoBase,
    #[error("{0} is not in perception memory")]
    UnknownObject(ObjectId),
    #[error("action target {0} is not a finite point")]
    InvalidTarget(WorldPoint),
}

impl BehaviorError {
    /// Convenience for callbacks that fail with a message.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }
}

/// A scheduled entity failed during a tick.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TickError {
    #[error("{entity} failed to tick: {reason}")]
    Entity { entity: EntityId, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RegistrationError {
    #[error("{0} is already registered")]
    Duplicate(EntityId),
}
