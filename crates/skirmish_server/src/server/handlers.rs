//! Connection handling logic for WebSocket clients.
//!
//! This module manages the lifecycle of one client session: the WebSocket
//! handshake, the join exchange, command forwarding into the authority and
//! delivery of tick frames back to the client.

use crate::{
    connection::ConnectionManager,
    error::ServerError,
    messaging::{decode_client_message, encode_server_message, ClientMessage, ServerMessage},
    security::SecurityManager,
    server::authority::{AuthorityHandle, JoinAccepted},
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use skirmish_core::{SessionId, SpawnProfile};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

/// How long a fresh connection may take to send its join frame.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

type WsSender = Arc<Mutex<SplitSink<WebSocketStream<TcpStream>, Message>>>;

/// Shared services every connection task needs.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub connections: Arc<ConnectionManager>,
    pub security: Arc<SecurityManager>,
    pub authority: AuthorityHandle,
    pub tick_interval_ms: u64,
}

/// Handles a single client connection from handshake to cleanup.
///
/// # Connection Flow
///
/// 1. Perform the WebSocket handshake and register the session
/// 2. Wait for the join frame and spawn the session's entity
/// 3. Reply with `Welcome` carrying the current field snapshot
/// 4. Run the incoming (commands) and outgoing (tick frames) tasks
/// 5. Disconnect from the authority and release the session
///
/// A refused join is answered with an `Error` frame carrying the lifecycle
/// code, after which the connection is closed.
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, context: SessionContext) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(ws_sender));

    let session = match context.connections.add_connection(addr) {
        Ok(session) => session,
        Err(e) => {
            warn!("🚫 {}", e);
            send_frame(&ws_sender, &ServerMessage::error("server_full", e.to_string())).await?;
            close(&ws_sender).await;
            return Ok(());
        }
    };

    // Subscribe before joining so no batch after the snapshot is missed.
    let frames = context.connections.subscribe();

    let result = match wait_for_join(&mut ws_receiver, session).await {
        Ok(profile) => run_session(session, profile, &context, ws_sender.clone(), ws_receiver, frames).await,
        Err(e) => {
            let _ = send_frame(&ws_sender, &ServerMessage::error("join_required", e.to_string())).await;
            Err(e)
        }
    };

    close(&ws_sender).await;
    context.security.forget_session(session).await;
    context.connections.remove_connection(session);
    result
}

async fn run_session<S>(
    session: SessionId,
    profile: SpawnProfile,
    context: &SessionContext,
    ws_sender: WsSender,
    ws_receiver: S,
    frames: broadcast::Receiver<Arc<str>>,
) -> Result<(), ServerError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let name = profile.name.clone();
    let accepted = match context.authority.join(session, profile).await {
        Ok(accepted) => accepted,
        Err(ServerError::Lifecycle(e)) => {
            info!("🚪 Join of {} refused: {}", session, e);
            send_frame(&ws_sender, &ServerMessage::error(e.code(), e.to_string())).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    context.connections.set_joined(session, name.clone(), accepted.entity);
    info!("🎮 {} joined as {} on session {}", name, accepted.entity, session);

    // Every exit after a successful join releases the entity.
    let outcome = drive_session(session, accepted, context, ws_sender, ws_receiver, frames).await;
    context.authority.disconnect(session).await?;
    outcome
}

/// Sends the welcome, then pumps commands in and tick frames out until
/// either side ends.
async fn drive_session<S>(
    session: SessionId,
    accepted: JoinAccepted,
    context: &SessionContext,
    ws_sender: WsSender,
    mut ws_receiver: S,
    mut frames: broadcast::Receiver<Arc<str>>,
) -> Result<(), ServerError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    send_frame(
        &ws_sender,
        &ServerMessage::Welcome {
            session,
            entity: accepted.entity,
            tick_interval_ms: context.tick_interval_ms,
            snapshot: accepted.snapshot,
        },
    )
    .await?;

    let incoming_task = {
        let ws_sender = ws_sender.clone();
        async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = context.security.validate_message(session, text.as_bytes()).await {
                            trace!("🚦 Dropped frame from {}: {}", session, e);
                            continue;
                        }
                        match decode_client_message(&text) {
                            Ok(ClientMessage::Command(command)) => {
                                if context.authority.submit(session, command).await.is_err() {
                                    break;
                                }
                            }
                            Ok(message @ ClientMessage::Join { .. }) => {
                                debug!("🔁 Ignoring repeated {} from {}", message.kind(), session);
                            }
                            Err(e) => trace!("❌ {} from {}", e, session),
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("🔌 Client {} requested close", session);
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        let mut ws_sender = ws_sender.lock().await;
                        let _ = ws_sender.send(Message::Pong(data)).await;
                    }
                    Err(e) => {
                        error!("WebSocket error for session {}: {}", session, e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    };

    let outgoing_task = {
        let ws_sender = ws_sender.clone();
        async move {
            loop {
                let frame = match frames.recv().await {
                    Ok(frame) => frame,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("🐢 Session {} skipped {} tick frame(s), resending snapshot", session, skipped);
                        match context.authority.snapshot().await {
                            Ok(fields) => match encode_server_message(&ServerMessage::Snapshot { fields }) {
                                Ok(frame) => Arc::from(frame),
                                Err(_) => break,
                            },
                            Err(_) => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let mut ws_sender = ws_sender.lock().await;
                if let Err(e) = ws_sender.send(Message::Text(frame.to_string().into())).await {
                    debug!("Failed to send frame to {}: {}", session, e);
                    break;
                }
            }
        }
    };

    // Run both tasks concurrently until one completes
    tokio::select! {
        _ = incoming_task => {},
        _ = outgoing_task => {},
    }
    Ok(())
}

/// Reads frames until the join arrives. Pings are answered implicitly by the
/// protocol layer; anything else before the join is a protocol error.
async fn wait_for_join<S>(ws_receiver: &mut S, session: SessionId) -> Result<SpawnProfile, ServerError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let first_text = async {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => return Ok(text.to_string()),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => return Err(ServerError::Network(e.to_string())),
            }
        }
        Err(ServerError::Network(format!("session {session} closed before joining")))
    };

    let text = tokio::time::timeout(JOIN_TIMEOUT, first_text)
        .await
        .map_err(|_| ServerError::Protocol(format!("session {session} did not join in time")))??;

    decode_client_message(&text)?
        .spawn_profile()
        .ok_or_else(|| ServerError::Protocol("the first frame must be a join".to_string()))
}

async fn send_frame(ws_sender: &WsSender, message: &ServerMessage) -> Result<(), ServerError> {
    let text = encode_server_message(message)?;
    let mut ws_sender = ws_sender.lock().await;
    ws_sender
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| ServerError::Network(e.to_string()))
}

async fn close(ws_sender: &WsSender) {
    let mut ws_sender = ws_sender.lock().await;
    let _ = ws_sender.close().await;
}
