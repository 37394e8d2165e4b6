//! Connection manager for tracking client sessions.
//!
//! This module provides the central registry of connected sessions and the
//! broadcast channel every connection's outgoing task reads tick frames from.

use crate::error::ServerError;
use dashmap::DashMap;
use skirmish_core::{EntityId, SessionId};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{info, trace};

/// Metadata of one connected session.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub remote_addr: SocketAddr,
    pub connected_at: SystemTime,
    /// Set once the join frame has been accepted
    pub name: Option<String>,
    pub entity: Option<EntityId>,
}

/// Central registry for all client connections.
///
/// * `DashMap` for concurrent session lookups from every connection task
/// * Atomic connection counter for the connection limit
/// * Broadcast channel fanning each encoded tick frame out to every session
#[derive(Debug)]
pub struct ConnectionManager {
    connections: DashMap<SessionId, ConnectionInfo>,
    active: AtomicUsize,
    max_connections: usize,
    sender: broadcast::Sender<Arc<str>>,
}

impl ConnectionManager {
    pub fn new(max_connections: usize, outbound_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(outbound_capacity.max(1));
        Self {
            connections: DashMap::new(),
            active: AtomicUsize::new(0),
            max_connections,
            sender,
        }
    }

    /// Registers a fresh connection under a new session id.
    pub fn add_connection(&self, remote_addr: SocketAddr) -> Result<SessionId, ServerError> {
        let previous = self.active.fetch_add(1, Ordering::AcqRel);
        if previous >= self.max_connections {
            self.active.fetch_sub(1, Ordering::AcqRel);
            return Err(ServerError::Network(format!(
                "connection limit of {} reached, refusing {}",
                self.max_connections, remote_addr
            )));
        }

        let session = SessionId::new();
        self.connections.insert(
            session,
            ConnectionInfo {
                remote_addr,
                connected_at: SystemTime::now(),
                name: None,
                entity: None,
            },
        );
        info!("🔗 Session {} connected from {}", session, remote_addr);
        Ok(session)
    }

    /// Records the accepted join of a session.
    pub fn set_joined(&self, session: SessionId, name: String, entity: EntityId) {
        if let Some(mut info) = self.connections.get_mut(&session) {
            info.name = Some(name);
            info.entity = Some(entity);
        }
    }

    pub fn remove_connection(&self, session: SessionId) {
        if let Some((_, info)) = self.connections.remove(&session) {
            self.active.fetch_sub(1, Ordering::AcqRel);
            info!("❌ Session {} from {} disconnected", session, info.remote_addr);
        }
    }

    pub fn get(&self, session: SessionId) -> Option<ConnectionInfo> {
        self.connections.get(&session).map(|entry| entry.value().clone())
    }

    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Sends one encoded frame to every connected session. Returns the number
    /// of receivers.
    pub fn broadcast(&self, frame: Arc<str>) -> usize {
        match self.sender.send(frame) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("📭 No sessions listening for tick frames");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }
}
