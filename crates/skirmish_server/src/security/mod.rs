//! Frame validation and rate limiting for inbound client traffic.

use crate::config::SecurityConfig;
use skirmish_core::SessionId;
use tracing::trace;

pub mod rate_limiter;

pub use rate_limiter::RateLimiter;

/// Gatekeeper applied to every inbound frame before it is decoded.
#[derive(Debug)]
pub struct SecurityManager {
    config: SecurityConfig,
    rate_limiter: RateLimiter,
}

impl SecurityManager {
    pub fn new(config: SecurityConfig) -> Self {
        let rate_limiter = RateLimiter::per_second(config.max_commands_per_second);
        Self { config, rate_limiter }
    }

    /// Validates an inbound frame from `session`.
    pub async fn validate_message(&self, session: SessionId, message: &[u8]) -> Result<(), SecurityError> {
        if message.len() > self.config.max_message_size {
            return Err(SecurityError::MessageTooLarge(message.len()));
        }

        if self.config.enable_rate_limiting && !self.rate_limiter.check_rate_limit(session).await {
            trace!("🚦 Session {} is over its command budget", session);
            return Err(SecurityError::RateLimitExceeded(session));
        }

        Ok(())
    }

    /// Releases per-session state once the session has left.
    pub async fn forget_session(&self, session: SessionId) {
        self.rate_limiter.remove(session).await;
    }

    pub fn blocked_count(&self) -> u64 {
        self.rate_limiter.blocked_count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    #[error("message of {0} bytes exceeds the size limit")]
    MessageTooLarge(usize),

    #[error("rate limit exceeded for session {0}")]
    RateLimitExceeded(SessionId),
}
