//! Matchmaking backfill.
//!
//! The matchmaker is an external collaborator reached through the
//! [`MatchmakerClient`] trait. A [`BackfillPoller`] files one backfill request
//! and polls its ticket at a fixed interval for a bounded number of attempts,
//! ending in an assignment or an explicit [`MatchmakingError`].

pub mod backfill;

pub use backfill::BackfillPoller;

use crate::error::MatchmakingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque handle of a filed backfill request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackfillTicket(pub String);

/// Where the matchmaker placed the requested players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub connection: String,
    pub players: Vec<String>,
}

/// One poll result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackfillStatus {
    Pending,
    Assigned(Assignment),
    Rejected { code: String },
}

/// What the server asks the matchmaker for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillRequest {
    pub open_slots: usize,
    pub connection: String,
}

/// Transport to the external matchmaker.
///
/// Implementations report unreachable or failing services as
/// [`MatchmakingError::Transport`]; the poller retries those within its
/// attempt budget.
#[async_trait]
pub trait MatchmakerClient: Send + Sync {
    async fn request_backfill(&self, request: &BackfillRequest) -> Result<BackfillTicket, MatchmakingError>;

    async fn poll(&self, ticket: &BackfillTicket) -> Result<BackfillStatus, MatchmakingError>;
}
