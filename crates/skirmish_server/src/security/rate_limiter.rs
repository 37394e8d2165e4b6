//! Per-session command rate limiting using a token bucket.

use skirmish_core::SessionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Token bucket rate limiter keyed by session.
///
/// A bucket holds up to `max_tokens` and regains one token per
/// `refill_interval`.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<SessionId, TokenBucket>>>,
    max_tokens: u32,
    refill_interval: Duration,
    blocked_count: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            max_tokens: max_tokens.max(1),
            refill_interval: refill_interval.max(Duration::from_micros(1)),
            blocked_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A limiter allowing `per_second` commands per second with an equal burst.
    pub fn per_second(per_second: u32) -> Self {
        let per_second = per_second.max(1);
        Self::new(per_second, Duration::from_secs(1) / per_second)
    }

    /// Takes one token for `session`. Returns false when the bucket is empty.
    pub async fn check_rate_limit(&self, session: SessionId) -> bool {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();

        let bucket = buckets.entry(session).or_insert(TokenBucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill);
        let intervals = (elapsed.as_nanos() / self.refill_interval.as_nanos()) as u64;
        if intervals > 0 {
            let refill = intervals.min(u64::from(self.max_tokens)) as u32;
            bucket.tokens = bucket.tokens.saturating_add(refill).min(self.max_tokens);
            bucket.last_refill = if bucket.tokens == self.max_tokens {
                now
            } else {
                bucket.last_refill + self.refill_interval * refill
            };
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            self.blocked_count.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Gets the total number of blocked commands
    pub fn blocked_count(&self) -> u64 {
        self.blocked_count.load(Ordering::Relaxed)
    }

    /// Drops the bucket of a session that has left.
    pub async fn remove(&self, session: SessionId) {
        self.buckets.write().await.remove(&session);
    }

    pub async fn tracked_sessions(&self) -> usize {
        self.buckets.read().await.len()
    }
}
