//! Main application logic and lifecycle management.
//!
//! This module contains the core `Application` struct that orchestrates
//! server startup, periodic health reporting and graceful shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
};
use skirmish_server::{GameServer, ShutdownState};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main application struct.
///
/// The `Application` struct manages the complete lifecycle of the arena
/// server, including configuration loading, server initialization, health
/// reporting, and graceful shutdown handling.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Arena server instance
    server: Arc<GameServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Initialize the arena server with configuration
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let config = AppConfig::load_from_file(&args.config_path).await?;
        let config = Self::apply_overrides(config, &args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        display_banner();

        let server = Arc::new(GameServer::new(config.to_server_config()?));
        info!("📂 Config: {}", args.config_path.display());

        Ok(Self { config, server })
    }

    /// Merges command-line overrides into the loaded configuration.
    pub fn apply_overrides(mut config: AppConfig, args: &CliArgs) -> AppConfig {
        if let Some(bind_address) = &args.bind_address {
            config.server.bind_address = bind_address.clone();
        }

        if let Some(log_level) = &args.log_level {
            config.logging.level = log_level.clone();
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Some(tick_interval_ms) = args.tick_interval_ms {
            config.server.tick_interval_ms = tick_interval_ms;
        }

        config
    }

    /// Runs the server until a termination signal arrives, then shuts down
    /// gracefully.
    ///
    /// # Shutdown Phases
    ///
    /// 1. Stop the accept loop and refuse new commands
    /// 2. Let the authority flush its final tick
    /// 3. Wait for the server task, bounded by a timeout
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Skirmish Arena Server");
        self.log_configuration_summary();

        let shutdown_state = ShutdownState::new();

        let server_handle = {
            let server = self.server.clone();
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move {
                match server.start_with_shutdown_state(shutdown_state).await {
                    Ok(()) => {
                        info!("✅ Server completed successfully");
                    }
                    Err(e) => {
                        error!("❌ Server error: {:?}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        // Periodic health report
        let monitoring_handle = {
            let connections = self.server.get_connection_manager();
            let security = self.server.get_security_manager();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
                let mut last_blocked = 0u64;

                loop {
                    interval.tick().await;

                    let blocked = security.blocked_count();
                    info!(
                        "📊 Arena Health - {} session(s) | {} frame(s) rate limited this minute",
                        connections.connection_count(),
                        blocked - last_blocked
                    );
                    last_blocked = blocked;
                }
            })
        };

        info!("✅ Skirmish Server is now running!");
        info!("🎮 Ready to accept connections on {}", self.config.server.bind_address);
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let signal_shutdown_state = setup_signal_handlers().await?;

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        if signal_shutdown_state.is_shutdown_initiated() {
            shutdown_state.initiate_shutdown();
        }

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        monitoring_handle.abort();

        info!("📡 Phase 1: Stopping the accept loop...");
        self.server.shutdown().await?;

        info!("⏳ Phase 2: Waiting for the final tick...");
        match tokio::time::timeout(tokio::time::Duration::from_secs(8), server_handle).await {
            Ok(_) => info!("✅ Server task completed gracefully"),
            Err(_) => warn!("⏰ Server task did not complete within timeout, proceeding with exit"),
        }

        if !shutdown_state.is_shutdown_complete() {
            warn!("⚠️ Authority did not confirm its final tick");
        }

        info!("✅ Skirmish Server shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  🕒 Tick interval: {}ms", self.config.server.tick_interval_ms);
        info!(
            "  🚦 Rate limit: {} command(s)/s per session ({})",
            self.config.server.max_commands_per_second,
            if self.config.server.enable_rate_limiting { "enabled" } else { "disabled" }
        );
        info!(
            "  ⚔️ Global cooldown: {}s | Respawn delay: {}s",
            self.config.combat.global_cooldown_secs, self.config.combat.respawn_delay_secs
        );
    }
}
