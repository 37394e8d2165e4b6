//! Factory functions for creating server instances.

use crate::{config::ServerConfig, server::GameServer};

/// Creates a new arena server with default configuration.
///
/// # Example
///
/// ```rust
/// use skirmish_server::create_server;
///
/// let server = create_server();
/// assert_eq!(server.bind_address().port(), 8080);
/// ```
pub fn create_server() -> GameServer {
    GameServer::new(ServerConfig::default())
}

/// Creates a new arena server with custom configuration.
///
/// # Example
///
/// ```rust
/// use skirmish_server::{create_server_with_config, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "0.0.0.0:9000".parse().expect("valid address"),
///     max_connections: 16,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config);
/// assert_eq!(server.bind_address().port(), 9000);
/// ```
pub fn create_server_with_config(config: ServerConfig) -> GameServer {
    GameServer::new(config)
}
