//! Connection management for client sessions.

pub mod manager;

pub use manager::{ConnectionInfo, ConnectionManager};
