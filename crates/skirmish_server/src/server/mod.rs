//! Core server implementation and connection handling.
//!
//! This module contains the main arena server, the task that owns the
//! authority, and the per-session connection logic.

pub mod authority;
pub mod core;
pub mod handlers;

pub use authority::{spawn_authority, AuthorityHandle, Inbound, JoinAccepted};
pub use core::GameServer;
pub use handlers::SessionContext;
