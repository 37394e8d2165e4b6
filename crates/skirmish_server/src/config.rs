//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize the arena server: the network surface, the per-session
//! security limits, backfill polling and the embedded combat tuning.

use serde::{Deserialize, Serialize};
use skirmish_core::CombatConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration structure for the arena server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Authority tick interval in milliseconds
    pub tick_interval_ms: u64,

    /// Capacity of the command channel into the authority task
    pub inbound_queue_capacity: usize,

    /// Capacity of the tick broadcast channel; slower clients skip batches
    pub outbound_queue_capacity: usize,

    /// Security configuration settings
    pub security: SecurityConfig,

    /// Matchmaking backfill polling
    pub backfill: BackfillConfig,

    /// Combat and lifecycle tuning handed to the authority
    pub combat: CombatConfig,
}

/// Per-session protection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Enable command rate limiting
    pub enable_rate_limiting: bool,

    /// Sustained command rate allowed per session
    pub max_commands_per_second: u32,

    /// Maximum message size in bytes
    pub max_message_size: usize,
}

/// Bounded polling of the external matchmaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl BackfillConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 64,
            tick_interval_ms: 50, // 20 ticks per second by default
            inbound_queue_capacity: 1024,
            outbound_queue_capacity: 256,
            security: SecurityConfig::default(),
            backfill: BackfillConfig::default(),
            combat: CombatConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_rate_limiting: true,
            max_commands_per_second: 60,
            max_message_size: 16 * 1024, // 16KB
        }
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            poll_interval_ms: 1000,
        }
    }
}
