//! Configuration management for the Skirmish arena server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use serde::{Deserialize, Serialize};
use skirmish_core::CombatConfig;
use skirmish_server::{BackfillConfig, SecurityConfig, ServerConfig};
use std::path::PathBuf;
use tracing::info;

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_max_connections() -> usize {
    64
}

fn default_inbound_queue_capacity() -> usize {
    1024
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_enable_rate_limiting() -> bool {
    true
}

fn default_max_commands_per_second() -> u32 {
    60
}

fn default_max_message_size() -> usize {
    16 * 1024
}

fn default_max_attempts() -> u32 {
    10
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses all server settings
/// including networking, combat tuning, matchmaking and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Combat and lifecycle tuning, every key optional
    #[serde(default)]
    pub combat: CombatConfig,
    /// Backfill polling of the external matchmaker
    #[serde(default)]
    pub matchmaking: MatchmakingSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, connection limits, queue sizes and per-session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Authority tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_inbound_queue_capacity")]
    pub inbound_queue_capacity: usize,
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    #[serde(default = "default_enable_rate_limiting")]
    pub enable_rate_limiting: bool,
    /// Sustained commands per second allowed for one session
    #[serde(default = "default_max_commands_per_second")]
    pub max_commands_per_second: u32,
    /// Largest accepted client frame in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Matchmaking backfill settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingSettings {
    /// Polls per backfill request before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Logging system configuration.
///
/// Controls log output format and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:8080".to_string(),
                max_connections: default_max_connections(),
                tick_interval_ms: default_tick_interval(),
                inbound_queue_capacity: default_inbound_queue_capacity(),
                outbound_queue_capacity: default_outbound_queue_capacity(),
                enable_rate_limiting: default_enable_rate_limiting(),
                max_commands_per_second: default_max_commands_per_second(),
                max_message_size: default_max_message_size(),
            },
            combat: CombatConfig::default(),
            matchmaking: MatchmakingSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to an arena server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            tick_interval_ms: self.server.tick_interval_ms,
            inbound_queue_capacity: self.server.inbound_queue_capacity,
            outbound_queue_capacity: self.server.outbound_queue_capacity,
            security: SecurityConfig {
                enable_rate_limiting: self.server.enable_rate_limiting,
                max_commands_per_second: self.server.max_commands_per_second,
                max_message_size: self.server.max_message_size,
            },
            backfill: BackfillConfig {
                max_attempts: self.matchmaking.max_attempts,
                poll_interval_ms: self.matchmaking.poll_interval_ms,
            },
            combat: self.combat.clone(),
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        // Validate bind address
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.tick_interval_ms == 0 {
            return Err("server.tick_interval_ms must be greater than 0".to_string());
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        if self.server.inbound_queue_capacity == 0 || self.server.outbound_queue_capacity == 0 {
            return Err("server queue capacities must be greater than 0".to_string());
        }

        if self.server.enable_rate_limiting && self.server.max_commands_per_second == 0 {
            return Err("server.max_commands_per_second must be greater than 0".to_string());
        }

        if self.matchmaking.max_attempts == 0 {
            return Err("matchmaking.max_attempts must be greater than 0".to_string());
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        self.combat.validate().map_err(|e| e.to_string())?;

        Ok(())
    }
}
