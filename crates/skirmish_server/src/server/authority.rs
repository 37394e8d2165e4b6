//! The authority task.
//!
//! Exactly one tokio task owns the [`Authority`]. Connection tasks talk to it
//! through an [`AuthorityHandle`]: joins, commands and disconnects travel over
//! one bounded channel, so everything a session sends reaches the authority in
//! the order it was sent. Each tick's output is encoded once and fanned out
//! through the [`ConnectionManager`] broadcast channel.

use crate::connection::ConnectionManager;
use crate::error::ServerError;
use crate::messaging::{encode_server_message, ServerMessage};
use crate::shutdown::ShutdownState;
use skirmish_core::{Authority, Command, EntityId, FieldUpdate, LifecycleError, SessionId, SpawnProfile};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

/// Accepted join: the new entity and the field state the session starts from.
#[derive(Debug, Clone)]
pub struct JoinAccepted {
    pub entity: EntityId,
    pub snapshot: Vec<FieldUpdate>,
}

/// Requests sent from connection tasks into the authority task.
#[derive(Debug)]
pub enum Inbound {
    Join {
        session: SessionId,
        profile: SpawnProfile,
        reply: oneshot::Sender<Result<JoinAccepted, LifecycleError>>,
    },
    Command {
        session: SessionId,
        command: Command,
    },
    Disconnect {
        session: SessionId,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<FieldUpdate>>,
    },
}

/// Cloneable sender side of the authority task.
#[derive(Debug, Clone)]
pub struct AuthorityHandle {
    sender: mpsc::Sender<Inbound>,
}

impl AuthorityHandle {
    pub async fn join(&self, session: SessionId, profile: SpawnProfile) -> Result<JoinAccepted, ServerError> {
        let (reply, response) = oneshot::channel();
        self.send(Inbound::Join { session, profile, reply }).await?;
        let accepted = response.await.map_err(|_| stopped())??;
        Ok(accepted)
    }

    /// Queues a command. Ordering is preserved per sender.
    pub async fn submit(&self, session: SessionId, command: Command) -> Result<(), ServerError> {
        self.send(Inbound::Command { session, command }).await
    }

    pub async fn disconnect(&self, session: SessionId) -> Result<(), ServerError> {
        self.send(Inbound::Disconnect { session }).await
    }

    pub async fn snapshot(&self) -> Result<Vec<FieldUpdate>, ServerError> {
        let (reply, response) = oneshot::channel();
        self.send(Inbound::Snapshot { reply }).await?;
        response.await.map_err(|_| stopped())
    }

    async fn send(&self, inbound: Inbound) -> Result<(), ServerError> {
        self.sender.send(inbound).await.map_err(|_| stopped())
    }
}

fn stopped() -> ServerError {
    ServerError::Internal("authority task has stopped".to_string())
}

/// Spawns the authority task.
///
/// The task ticks every `tick_interval` with the measured elapsed time and
/// stops after the first tick that observes shutdown, or once every handle
/// has been dropped. It hands the authority back when it ends.
pub fn spawn_authority(
    authority: Authority,
    connections: Arc<ConnectionManager>,
    queue_capacity: usize,
    tick_interval: Duration,
    shutdown_state: ShutdownState,
) -> (AuthorityHandle, JoinHandle<Authority>) {
    let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
    let task = AuthorityTask {
        authority,
        receiver,
        connections,
        tick_interval,
        shutdown_state,
    };
    let join_handle = tokio::spawn(task.run());
    (AuthorityHandle { sender }, join_handle)
}

struct AuthorityTask {
    authority: Authority,
    receiver: mpsc::Receiver<Inbound>,
    connections: Arc<ConnectionManager>,
    tick_interval: Duration,
    shutdown_state: ShutdownState,
}

impl AuthorityTask {
    async fn run(mut self) -> Authority {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();
        info!("🕒 Authority tick started with interval: {:?}", self.tick_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f64();
                    last_tick = now;
                    self.step(dt);

                    if self.shutdown_state.is_shutdown_initiated() {
                        info!("🕒 Authority stopping - shutdown initiated");
                        break;
                    }
                }
                inbound = self.receiver.recv() => match inbound {
                    Some(inbound) => self.handle(inbound),
                    None => {
                        info!("📪 Every authority handle dropped, stopping tick loop");
                        break;
                    }
                },
            }
        }

        info!(
            "✅ Authority tick loop completed after {} tick(s)",
            self.authority.tick_count()
        );
        self.authority
    }

    fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Join { session, profile, reply } => {
                let result = self.authority.join(session, profile).map(|entity| JoinAccepted {
                    entity,
                    snapshot: self.authority.snapshot(),
                });
                if reply.send(result).is_err() {
                    debug!("📭 Session {} left before its join was answered", session);
                }
            }
            Inbound::Command { session, command } => {
                if self.shutdown_state.is_shutdown_initiated() {
                    trace!("🛑 Dropping {} from {} during shutdown", command.name(), session);
                    return;
                }
                self.authority.submit(session, command);
            }
            Inbound::Disconnect { session } => {
                if let Err(e) = self.authority.disconnect(session) {
                    trace!("👋 Disconnect of {} ignored: {}", session, e);
                }
            }
            Inbound::Snapshot { reply } => {
                let _ = reply.send(self.authority.snapshot());
            }
        }
    }

    fn step(&mut self, dt: f64) {
        let output = self.authority.tick(dt);
        if output.is_empty() {
            return;
        }

        trace!(
            "📦 Tick {}: {} field update(s), {} event(s)",
            output.tick,
            output.fields.len(),
            output.events.len()
        );
        match encode_server_message(&ServerMessage::Tick(output)) {
            Ok(frame) => {
                self.connections.broadcast(Arc::from(frame));
            }
            Err(e) => error!("❌ Failed to encode tick frame: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{BroadcastEvent, CharacterVariant, CombatConfig, Event, TeamIndex};

    fn spawn(connections: Arc<ConnectionManager>, shutdown: ShutdownState) -> (AuthorityHandle, JoinHandle<Authority>) {
        let authority = Authority::new(CombatConfig::default()).expect("default config is valid");
        spawn_authority(authority, connections, 64, Duration::from_millis(5), shutdown)
    }

    async fn next_tick(receiver: &mut tokio::sync::broadcast::Receiver<Arc<str>>) -> skirmish_core::TickOutput {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
                .await
                .expect("a tick frame arrives")
                .expect("channel open");
            if let ServerMessage::Tick(output) =
                <ServerMessage as Event>::deserialize(frame.as_bytes()).expect("valid frame")
            {
                return output;
            }
        }
    }

    #[tokio::test]
    async fn test_commands_reach_the_authority_and_ticks_are_broadcast() {
        let connections = Arc::new(ConnectionManager::new(8, 64));
        let mut frames = connections.subscribe();
        let (handle, task) = spawn(connections.clone(), ShutdownState::new());

        let session = SessionId::new();
        let accepted = handle
            .join(session, SpawnProfile::new("ada", CharacterVariant::RangedSingle, TeamIndex::NONE))
            .await
            .expect("join accepted");
        assert!(accepted.snapshot.iter().any(|u| u.entity == accepted.entity));

        handle
            .submit(session, Command::AttackPrimary { pressed: true, aim: None })
            .await
            .expect("queued");

        let mut committed = false;
        for _ in 0..50 {
            let output = next_tick(&mut frames).await;
            if output
                .events
                .iter()
                .any(|e| matches!(e, BroadcastEvent::AttackCommitted { entity, .. } if *entity == accepted.entity))
            {
                committed = true;
                break;
            }
        }
        assert!(committed, "the attack commit was broadcast");

        drop(handle);
        let authority = task.await.expect("task ends cleanly");
        assert_eq!(authority.entity_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_join_is_refused_with_a_lifecycle_code() {
        let connections = Arc::new(ConnectionManager::new(8, 64));
        let (handle, _task) = spawn(connections, ShutdownState::new());
        let session = SessionId::new();
        let profile = SpawnProfile::new("ada", CharacterVariant::MeleeSingle, TeamIndex::NONE);

        handle.join(session, profile.clone()).await.expect("first join");
        match handle.join(session, profile).await {
            Err(ServerError::Lifecycle(e)) => assert_eq!(e.code(), "already_registered"),
            other => panic!("expected a lifecycle refusal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_tick_loop() {
        let connections = Arc::new(ConnectionManager::new(8, 64));
        let shutdown = ShutdownState::new();
        let (handle, task) = spawn(connections, shutdown.clone());

        let session = SessionId::new();
        handle
            .join(session, SpawnProfile::new("bo", CharacterVariant::MeleeSingle, TeamIndex::NONE))
            .await
            .expect("join accepted");
        shutdown.initiate_shutdown();

        let authority = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("stops promptly")
            .expect("task ends cleanly");
        assert!(authority.tick_count() > 0);
        assert!(handle.submit(session, Command::Interact).await.is_err());
    }
}
