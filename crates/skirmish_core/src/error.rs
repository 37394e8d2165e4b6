//! Error types for the combat core.
//!
//! Combat intents never surface errors across the command boundary; these
//! types cover programming errors (role violations), configuration problems
//! and the lifecycle paths that report explicit failure codes.

use crate::replication::FieldKey;
use crate::combat::CharacterVariant;
use crate::types::{EntityId, SessionId};
use serde::Serialize;

/// Errors raised by the replication store and registries.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An observer tried to write a replicated field. Always a bug.
    #[error("observer attempted to write {key:?} on {entity}")]
    ObserverWrite { entity: EntityId, key: FieldKey },

    /// A role other than the field's writer tried to write it.
    #[error("{role} is not the writer of {key:?} on {entity}")]
    NotWriter {
        entity: EntityId,
        key: FieldKey,
        role: String,
    },

    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    #[error("entity {0} is already registered")]
    DuplicateEntity(EntityId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Explicit failure codes of the registration and respawn paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum LifecycleError {
    #[error("session {0} is already registered")]
    AlreadyRegistered(SessionId),

    #[error("session {0} is not registered")]
    SessionNotRegistered(SessionId),

    /// The session left before its scheduled respawn fired.
    #[error("session {0} disconnected before respawn")]
    SessionDisconnected(SessionId),

    /// No attack loadout is registered for the requested character.
    #[error("no loadout registered for {0:?}")]
    UnknownVariant(CharacterVariant),
}

impl LifecycleError {
    /// Stable machine-readable code for presentation layers.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::AlreadyRegistered(_) => "already_registered",
            LifecycleError::SessionNotRegistered(_) => "session_not_registered",
            LifecycleError::SessionDisconnected(_) => "session_disconnected",
            LifecycleError::UnknownVariant(_) => "unknown_variant",
        }
    }
}
