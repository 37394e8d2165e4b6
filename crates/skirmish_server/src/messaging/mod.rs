//! Frame decoding and encoding for client-server communication.

pub mod types;

pub use types::{ClientMessage, ServerMessage};

use crate::error::ServerError;
use skirmish_core::Event;
use tracing::error;

/// Parses one inbound text frame.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ServerError> {
    serde_json::from_str(text).map_err(|e| ServerError::Protocol(format!("malformed frame: {e}")))
}

/// Serializes an outbound frame. Failures are logged by the event codec.
pub fn encode_server_message(message: &ServerMessage) -> Result<String, ServerError> {
    let bytes = Event::serialize(message).map_err(|e| ServerError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| {
        error!("❌ Encoded frame is not UTF-8: {}", e);
        ServerError::Internal(e.to_string())
    })
}
