//! Error types and handling for the arena server.
//!
//! Transport and protocol failures are reported as [`ServerError`]; the
//! matchmaking collaborator reports its terminal outcomes as
//! [`MatchmakingError`].

use skirmish_core::LifecycleError;

/// Enumeration of possible server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal server errors such as a stopped authority task
    #[error("Internal error: {0}")]
    Internal(String),

    /// A client sent a frame that does not follow the session protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The authority refused a join or disconnect
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// Terminal failures of a backfill request.
///
/// Every variant is final: the poller never retries past one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    /// The ticket was still pending after the last allowed poll.
    #[error("backfill gave up after {attempts} attempt(s)")]
    AttemptsExhausted { attempts: u32 },

    /// The matchmaker refused the request.
    #[error("backfill rejected: {code}")]
    Rejected { code: String },

    /// The matchmaker could not be reached.
    #[error("matchmaker transport failure: {0}")]
    Transport(String),
}

impl MatchmakingError {
    /// Stable machine-readable code for the UI layer.
    pub fn code(&self) -> &str {
        match self {
            MatchmakingError::AttemptsExhausted { .. } => "attempts_exhausted",
            MatchmakingError::Rejected { code } => code,
            MatchmakingError::Transport(_) => "transport",
        }
    }
}
