//! # Skirmish Core
//!
//! The server-authoritative combat and replication core of the Skirmish arena
//! server. Attack intents, resource costs, cooldowns, damage, death and
//! respawn are decided once by the [`Authority`] and delivered to every
//! observer as ordered, versioned field updates plus broadcast events.
//!
//! ## Architecture Overview
//!
//! - **Replication** ([`replication`]): single-writer versioned fields, the
//!   authority's publish/subscribe store and the observer mirror
//! - **Combat** ([`combat`]): attack descriptors, the capability table, pools,
//!   the per-entity state machine, damage rules and projectiles
//! - **Lifecycle** ([`lifecycle`]): registries, respawn tickets, spawn points
//! - **Authority** ([`authority`]): the tick loop that wires it together
//! - **Observer** ([`observer`]): mirrored state, visual projectile twins and
//!   the client-side optimistic pre-check
//!
//! The core performs no I/O and owns no threads. The host drives
//! [`Authority::tick`] from one task and ships each [`TickOutput`] to every
//! observer.
//!
//! ## Quick Start Example
//!
//! ```rust
//! use skirmish_core::*;
//!
//! let mut authority = Authority::new(CombatConfig::default()).expect("valid config");
//! let session = SessionId::new();
//! let profile = SpawnProfile::new("ada", CharacterVariant::RangedSingle, TeamIndex::NONE);
//! let entity = authority.join(session, profile).expect("fresh session");
//!
//! authority.submit(session, Command::AttackPrimary { pressed: true, aim: None });
//! let output = authority.tick(0.05);
//!
//! let mut view = ObserverView::new();
//! view.apply(&output);
//! assert_eq!(view.read(entity, FieldKey::IsAttacking), Some(&FieldValue::Bool(true)));
//! ```

pub mod authority;
pub mod combat;
pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod observer;
pub mod pickup;
pub mod replication;
pub mod scheduler;
pub mod types;

pub use authority::{Authority, ScheduledTask};
pub use combat::{
    AttackDescriptor, AttackRegistry, BuffKind, CharacterVariant, DamageOutcome, DamageRejection,
    ProjectileKey, ProjectileRegistry,
};
pub use command::{Command, QueuedCommand};
pub use config::CombatConfig;
pub use entity::{Entity, SpawnProfile};
pub use error::{CoreError, LifecycleError};
pub use events::{BroadcastEvent, Event, EventError, TickOutput};
pub use lifecycle::LeaderboardRow;
pub use observer::{LocalPredictor, ObserverView};
pub use pickup::{PickupId, PickupKind};
pub use replication::{FieldFilter, FieldKey, FieldUpdate, FieldValue, Role, SubscriptionId};
pub use scheduler::Scheduler;
pub use types::{EntityId, ProjectileId, SessionId, TeamIndex, Vec2};

#[cfg(test)]
mod tests;
