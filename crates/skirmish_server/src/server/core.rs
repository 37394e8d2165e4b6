//! Core arena server implementation.
//!
//! This module contains the main `GameServer` struct, which binds the
//! listener, starts the authority task and runs the accept loop until
//! shutdown.

use crate::{
    config::ServerConfig,
    connection::ConnectionManager,
    error::ServerError,
    matchmaking::{BackfillPoller, MatchmakerClient},
    security::SecurityManager,
    server::authority::spawn_authority,
    server::handlers::{handle_connection, SessionContext},
    shutdown::ShutdownState,
};
use skirmish_core::Authority;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// The arena server.
///
/// `GameServer` owns the network surface: the connection registry, the
/// per-session security gate and the shutdown channel. The authority itself
/// is created when the server starts and lives on its own task.
///
/// # Architecture
///
/// * **Authority task**: sole owner of the combat core, ticked on an interval
/// * **Connection Management**: WebSocket session lifecycle and tick fan-out
/// * **Security**: per-session frame size and command rate limits
pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Manager for client connections and tick broadcast
    connection_manager: Arc<ConnectionManager>,

    /// Inbound frame validation
    security: Arc<SecurityManager>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a new arena server with the specified configuration.
    pub fn new(config: ServerConfig) -> Self {
        let connection_manager = Arc::new(ConnectionManager::new(
            config.max_connections,
            config.outbound_queue_capacity,
        ));
        let security = Arc::new(SecurityManager::new(config.security.clone()));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            connection_manager,
            security,
            shutdown_sender,
        }
    }

    /// Starts the server and runs until shutdown is initiated through the
    /// provided shutdown state.
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_state).await
    }

    /// Starts the server and runs until [`GameServer::shutdown`] is called.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown_state(ShutdownState::new()).await
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))
    }

    /// Runs the server on an already bound listener.
    ///
    /// # Startup Sequence
    ///
    /// 1. Build the authority from the combat configuration
    /// 2. Spawn the authority task
    /// 3. Accept connections until shutdown is initiated or signalled
    /// 4. Let the authority flush its final tick, then mark shutdown complete
    pub async fn serve(&self, listener: TcpListener, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        info!("🚀 Starting arena server on {}", local_addr);

        let authority = Authority::new(self.config.combat.clone()).map_err(|e| ServerError::Internal(e.to_string()))?;
        let (authority_handle, authority_task) = spawn_authority(
            authority,
            self.connection_manager.clone(),
            self.config.inbound_queue_capacity,
            self.config.tick_interval(),
            shutdown_state.clone(),
        );

        let context = SessionContext {
            connections: self.connection_manager.clone(),
            security: self.security.clone(),
            authority: authority_handle,
            tick_interval_ms: self.config.tick_interval_ms,
        };

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let accept_loop = {
            let shutdown_state = shutdown_state.clone();
            async move {
                loop {
                    if shutdown_state.is_shutdown_initiated() {
                        info!("🛑 Accept loop stopping - shutdown initiated");
                        break;
                    }

                    match listener.accept().await {
                        Ok((stream, addr)) => {
                            if shutdown_state.is_shutdown_initiated() {
                                info!("🛑 Refusing {} - shutdown initiated", addr);
                                break;
                            }
                            let context = context.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, addr, context).await {
                                    warn!("Connection {} ended with error: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            break;
                        }
                    }
                }
            }
        };

        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown_receiver.recv() => {
                info!("Internal shutdown signal received");
            }
        }

        info!("🧹 Performing server cleanup...");
        if !shutdown_state.is_shutdown_initiated() {
            shutdown_state.initiate_shutdown();
        }
        match authority_task.await {
            Ok(authority) => info!(
                "🏁 Authority stopped at tick {} with {} live entit(ies)",
                authority.tick_count(),
                authority.entity_count()
            ),
            Err(e) => error!("❌ Authority task failed: {}", e),
        }
        shutdown_state.complete_shutdown();
        info!("✅ Server cleanup completed");
        Ok(())
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop; the authority flushes one more tick and exits.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// Builds a backfill poller for `client` with the configured attempt
    /// budget and poll interval.
    pub fn backfill_poller(&self, client: Arc<dyn MatchmakerClient>) -> BackfillPoller {
        BackfillPoller::new(client, self.config.backfill.clone())
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind_address
    }

    /// Gets the connection manager, e.g. for the live session count.
    pub fn get_connection_manager(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }

    pub fn get_security_manager(&self) -> Arc<SecurityManager> {
        self.security.clone()
    }
}
