//! Error types.
//!
//! Most variants of [`BridgeError`] are *contract violations*: the caller or
//! the entity store broke an assumption the bridge relies on (double
//! creation, count underflow, adjusting counts on a destroyed object). The
//! context logs them and, with `strict_contracts`, panics. The remaining
//! variants are ordinary capacity and lookup failures.

use std::path::PathBuf;

use thiserror::Error;

use crate::bridge::object::ObjectId;
use crate::bridge::status::ObjectStatus;
use crate::ecs::Entity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("object {0} is stale or was destroyed")]
    StaleObject(ObjectId),

    #[error("object table is full (capacity {capacity})")]
    ObjectTableFull { capacity: usize },

    #[error("deferred creation queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("reclaim pool exhausted (capacity {capacity})")]
    ReclaimPoolExhausted { capacity: usize },

    #[error("object {0} is already in the deferred creation queue")]
    DoubleEnqueue(ObjectId),

    #[error("object {object} already holds {entity} while entering Creating")]
    EntityAlreadyAssigned { object: ObjectId, entity: Entity },

    #[error("object {object} produced an unusable entity {entity}")]
    InvalidEntity { object: ObjectId, entity: Entity },

    #[error("object {object} expected to be {expected:?}, found {found:?}")]
    UnexpectedStatus {
        object: ObjectId,
        expected: ObjectStatus,
        found: ObjectStatus,
    },

    #[error("cannot adjust `{component}` on {entity} in status {status:?}")]
    InvalidStatus {
        entity: Entity,
        status: ObjectStatus,
        component: &'static str,
    },

    #[error("`{component}` missing on {entity}")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("`{component}` on {entity} would become negative ({value})")]
    CountUnderflow {
        entity: Entity,
        component: &'static str,
        value: i32,
    },

    #[error("parent chain of object {0} loops back on itself")]
    ParentCycle(ObjectId),

    #[error("world of object {0} cannot change after its entity was created")]
    AlreadyCreated(ObjectId),

    #[error("world '{0}' does not exist")]
    MissingWorld(String),
}

impl BridgeError {
    /// `true` for errors that mean the bridge and its callers disagree about
    /// an object's state, as opposed to capacity or lookup failures.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            BridgeError::DoubleEnqueue(_)
                | BridgeError::EntityAlreadyAssigned { .. }
                | BridgeError::InvalidEntity { .. }
                | BridgeError::UnexpectedStatus { .. }
                | BridgeError::InvalidStatus { .. }
                | BridgeError::MissingComponent { .. }
                | BridgeError::CountUnderflow { .. }
                | BridgeError::ParentCycle(_)
        )
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
