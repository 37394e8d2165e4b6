//! # Broadcast Events and Wire Serialization
//!
//! Non-stateful events the authority sends to every observer next to the
//! replicated field updates, and the [`Event`] trait every wire type gets
//! for free through serde.
//!
//! ## Event Categories
//!
//! - Presentation triggers: death animation, area-effect visual, buff icon
//! - Projectile visual spawns carrying the full kinematics of the shot
//! - Lifecycle notices: despawn and respawn of entity instances

use crate::combat::{BuffKind, ProjectileKey};
use crate::replication::FieldUpdate;
use crate::types::{EntityId, ProjectileId, SessionId, TeamIndex, Vec2};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::Any;

// ============================================================================
// Event Trait
// ============================================================================

/// Core trait implemented by everything that crosses the wire.
///
/// Most types get it through the blanket implementation: derive `Serialize`,
/// `Deserialize` and `Debug` and the type is an event.
pub trait Event: Send + Sync + Any + std::fmt::Debug {
    /// Stable type name used in logs.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Serializes the event to JSON bytes.
    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    /// Deserializes an event from JSON bytes.
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;

    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| {
            tracing::error!(
                "🔴 Event serialization failed for type '{}': {} (event debug: {:?})",
                Self::type_name(),
                e,
                self
            );
            EventError::Serialization(e)
        })
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(|e| {
            let data_preview = if data.len() > 200 {
                format!(
                    "{}... (truncated {} bytes)",
                    String::from_utf8_lossy(&data[..200]),
                    data.len() - 200
                )
            } else {
                String::from_utf8_lossy(data).to_string()
            };

            tracing::error!(
                "🔴 Event deserialization failed for type '{}': {} (data length: {} bytes, content preview: '{}')",
                Self::type_name(),
                e,
                data.len(),
                data_preview
            );
            EventError::Deserialization(e)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Broadcast Events
// ============================================================================

/// One-shot notification for presentation layers. Observers react to these;
/// they never change replicated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BroadcastEvent {
    /// Death animation trigger. Fires exactly once per entity instance.
    Death {
        entity: EntityId,
        killer: Option<EntityId>,
        position: Vec2,
    },
    AttackCommitted {
        entity: EntityId,
        slot: usize,
        animation_key: String,
    },
    AreaEffect {
        key: String,
        position: Vec2,
        radius: f32,
    },
    BuffIcon {
        entity: EntityId,
        kind: BuffKind,
        duration_secs: f64,
    },
    /// Spawn a non-authoritative visual twin with these kinematics
    ProjectileVisual {
        projectile: ProjectileId,
        key: ProjectileKey,
        attacker: EntityId,
        team: TeamIndex,
        position: Vec2,
        direction: Vec2,
        speed: f32,
        lifetime_secs: f32,
    },
    /// Entity instance removed; observers drop its mirrored fields
    Despawned { entity: EntityId },
    Respawned {
        session: SessionId,
        entity: EntityId,
        position: Vec2,
        coins: u64,
    },
}

impl BroadcastEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BroadcastEvent::Death { .. } => "death",
            BroadcastEvent::AttackCommitted { .. } => "attack_committed",
            BroadcastEvent::AreaEffect { .. } => "area_effect",
            BroadcastEvent::BuffIcon { .. } => "buff_icon",
            BroadcastEvent::ProjectileVisual { .. } => "projectile_visual",
            BroadcastEvent::Despawned { .. } => "despawned",
            BroadcastEvent::Respawned { .. } => "respawned",
        }
    }
}

/// Everything one authority tick produced, in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub tick: u64,
    /// Authority clock after the tick, in seconds
    pub time: f64,
    pub fields: Vec<FieldUpdate>,
    pub events: Vec<BroadcastEvent>,
}

impl TickOutput {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.events.is_empty()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
}
