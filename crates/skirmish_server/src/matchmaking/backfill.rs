use super::{Assignment, BackfillRequest, BackfillStatus, BackfillTicket, MatchmakerClient};
use crate::config::BackfillConfig;
use crate::error::MatchmakingError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bounded polling of one backfill request.
#[derive(Clone)]
pub struct BackfillPoller {
    client: Arc<dyn MatchmakerClient>,
    config: BackfillConfig,
}

impl std::fmt::Debug for BackfillPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackfillPoller").field("config", &self.config).finish()
    }
}

impl BackfillPoller {
    pub fn new(client: Arc<dyn MatchmakerClient>, config: BackfillConfig) -> Self {
        Self { client, config }
    }

    /// Files `request` and polls until it resolves.
    ///
    /// Every call to the matchmaker, the initial request included, spends one
    /// attempt. Transport failures are retried after the poll interval; a
    /// rejection ends polling immediately.
    pub async fn run(&self, request: &BackfillRequest) -> Result<Assignment, MatchmakingError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;
        let mut ticket: Option<BackfillTicket> = None;
        info!("🎯 Requesting backfill of {} slot(s)", request.open_slots);

        while attempts < max_attempts {
            if attempts > 0 {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
            attempts += 1;

            let current = match ticket.clone() {
                Some(current) => current,
                None => {
                    match self.client.request_backfill(request).await {
                        Ok(filed) => {
                            debug!("🎫 Backfill ticket {} filed", filed.0);
                            ticket = Some(filed);
                        }
                        Err(MatchmakingError::Transport(e)) => {
                            warn!("📡 Backfill request failed (attempt {}/{}): {}", attempts, max_attempts, e);
                        }
                        Err(e) => return Err(e),
                    }
                    continue;
                }
            };

            match self.client.poll(&current).await {
                Ok(BackfillStatus::Assigned(assignment)) => {
                    info!("✅ Backfill assigned {} player(s) after {} attempt(s)", assignment.players.len(), attempts);
                    return Ok(assignment);
                }
                Ok(BackfillStatus::Rejected { code }) => {
                    warn!("🚫 Backfill rejected: {}", code);
                    return Err(MatchmakingError::Rejected { code });
                }
                Ok(BackfillStatus::Pending) => {
                    debug!("⏳ Backfill pending (attempt {}/{})", attempts, max_attempts);
                }
                Err(MatchmakingError::Transport(e)) => {
                    warn!("📡 Backfill poll failed (attempt {}/{}): {}", attempts, max_attempts, e);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("⌛ Backfill gave up after {} attempt(s)", attempts);
        Err(MatchmakingError::AttemptsExhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted poll results; an empty script means pending forever.
    struct ScriptedMatchmaker {
        request: Mutex<VecDeque<Result<BackfillTicket, MatchmakingError>>>,
        polls: Mutex<VecDeque<Result<BackfillStatus, MatchmakingError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedMatchmaker {
        fn new(
            request: Vec<Result<BackfillTicket, MatchmakingError>>,
            polls: Vec<Result<BackfillStatus, MatchmakingError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                request: Mutex::new(request.into()),
                polls: Mutex::new(polls.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("lock")
        }
    }

    #[async_trait]
    impl MatchmakerClient for ScriptedMatchmaker {
        async fn request_backfill(&self, _request: &BackfillRequest) -> Result<BackfillTicket, MatchmakingError> {
            *self.calls.lock().expect("lock") += 1;
            self.request
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Ok(BackfillTicket("t-1".to_string())))
        }

        async fn poll(&self, _ticket: &BackfillTicket) -> Result<BackfillStatus, MatchmakingError> {
            *self.calls.lock().expect("lock") += 1;
            self.polls
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or(Ok(BackfillStatus::Pending))
        }
    }

    fn poller(client: Arc<ScriptedMatchmaker>, max_attempts: u32) -> BackfillPoller {
        BackfillPoller::new(
            client,
            BackfillConfig {
                max_attempts,
                poll_interval_ms: 1,
            },
        )
    }

    fn request() -> BackfillRequest {
        BackfillRequest {
            open_slots: 2,
            connection: "127.0.0.1:8080".to_string(),
        }
    }

    #[tokio::test]
    async fn test_assignment_after_pending_polls() {
        let assignment = Assignment {
            connection: "127.0.0.1:8080".to_string(),
            players: vec!["ada".to_string(), "bo".to_string()],
        };
        let client = ScriptedMatchmaker::new(
            vec![],
            vec![
                Ok(BackfillStatus::Pending),
                Ok(BackfillStatus::Pending),
                Ok(BackfillStatus::Assigned(assignment.clone())),
            ],
        );

        let result = poller(client.clone(), 10).run(&request()).await;
        assert_eq!(result, Ok(assignment));
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn test_polling_is_bounded() {
        let client = ScriptedMatchmaker::new(vec![], vec![]);
        let result = poller(client.clone(), 3).run(&request()).await;
        assert_eq!(result, Err(MatchmakingError::AttemptsExhausted { attempts: 3 }));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_rejection_ends_polling_with_its_code() {
        let client = ScriptedMatchmaker::new(
            vec![],
            vec![Ok(BackfillStatus::Rejected {
                code: "region_full".to_string(),
            })],
        );
        let error = poller(client.clone(), 10).run(&request()).await.expect_err("rejected");
        assert_eq!(error.code(), "region_full");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried_within_budget() {
        let client = ScriptedMatchmaker::new(
            vec![Err(MatchmakingError::Transport("connection refused".to_string()))],
            vec![
                Err(MatchmakingError::Transport("timeout".to_string())),
                Ok(BackfillStatus::Assigned(Assignment {
                    connection: "127.0.0.1:8080".to_string(),
                    players: vec![],
                })),
            ],
        );
        assert!(poller(client.clone(), 4).run(&request()).await.is_ok());
        assert_eq!(client.calls(), 4);

        let failing = ScriptedMatchmaker::new(
            vec![
                Err(MatchmakingError::Transport("down".to_string())),
                Err(MatchmakingError::Transport("down".to_string())),
            ],
            vec![],
        );
        assert_eq!(
            poller(failing, 2).run(&request()).await,
            Err(MatchmakingError::AttemptsExhausted { attempts: 2 })
        );
    }
}
