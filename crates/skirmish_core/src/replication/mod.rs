//! # Replication
//!
//! Versioned, single-writer entity fields with ordered change delivery.
//!
//! - [`ReplicatedField`] - the primitive: one writer role, queued transitions
//! - [`ReplicationStore`] - the authority's table of every entity field
//! - [`ObserverMirror`] - the read-only copy each observer keeps
//! - [`SubscriberSet`] - per-field subscribe/unsubscribe for presentation code

pub mod bus;
pub mod field;
pub mod mirror;
pub mod store;

pub use bus::{FieldFilter, FieldHandler, SubscriberSet, SubscriptionId};
pub use field::{ReplicatedField, Role, Transition, WriteRefusal, Writer};
pub use mirror::ObserverMirror;
pub use store::{FieldKey, FieldUpdate, FieldValue, ReplicationStore};
