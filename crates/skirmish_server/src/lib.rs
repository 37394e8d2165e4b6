//! # Skirmish Server
//!
//! The async host around [`skirmish_core`]: it owns the authority on one
//! tokio task, accepts WebSocket sessions and fans every tick batch out to
//! every connected client.
//!
//! ## Architecture Overview
//!
//! * **Authority task** - sole owner of the combat core, ticked on an interval
//! * **Connection Manager** - session registry and the tick broadcast channel
//! * **Security** - per-session frame size and command rate limits
//! * **Matchmaking** - bounded backfill polling of an external matchmaker
//!
//! ### Message Flow
//!
//! 1. A client connects and sends `{"type":"join", ...}`
//! 2. The authority spawns its entity; the client receives `Welcome` with the
//!    current field snapshot
//! 3. Each further frame carries one command, validated and queued in order
//! 4. Every tick that changed something is pushed to all sessions as one
//!    `Tick` frame of versioned field updates and broadcast events
//!
//! ## Error Handling
//!
//! * **Network errors** - binding, handshake and transport failures
//! * **Protocol errors** - frames that break the session protocol
//! * **Lifecycle errors** - refused joins, reported to the client by code
//! * **Internal errors** - a stopped authority task
//!
//! Combat intents never produce errors: invalid ones are dropped by the
//! authority and only logged.

// Re-export core types and functions for easy access
pub use config::{BackfillConfig, SecurityConfig, ServerConfig};
pub use error::{MatchmakingError, ServerError};
pub use server::GameServer;
pub use shutdown::ShutdownState;
pub use utils::{create_server, create_server_with_config};

// Public module declarations
pub mod config;
pub mod connection;
pub mod error;
pub mod matchmaking;
pub mod messaging;
pub mod security;
pub mod server;
pub mod shutdown;
pub mod utils;

mod tests;
