//! Per-user rate limiting for the command surface
//!
//! Every attempt is recorded, including denied ones, so a caller retrying
//! in a tight loop keeps its window full instead of slipping back in the
//! moment the oldest allowed call expires.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::trace;

use crate::UserId;
use crate::window::SlidingWindowCounter;

/// Sliding-window rate limiter keyed by user identity
///
/// Shared across concurrent command handlers; the window is serialized
/// behind a mutex. A denial is a control-flow signal for the caller, never
/// an error.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period_seconds: u64,
    calls: Mutex<SlidingWindowCounter<UserId>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, period_seconds: u64) -> Self {
        Self {
            max_calls,
            period_seconds,
            calls: Mutex::new(SlidingWindowCounter::new()),
        }
    }

    /// Record an attempt for `identity` and decide whether it is admitted.
    pub async fn allow(&self, identity: UserId) -> bool {
        self.allow_at(identity, Utc::now()).await
    }

    /// Like [`allow`](Self::allow) with an explicit clock, for deterministic tests.
    pub async fn allow_at(&self, identity: UserId, now: DateTime<Utc>) -> bool {
        let mut calls = self.calls.lock().await;

        calls.record(identity, now);
        let count = calls.count_in_window(&identity, now, self.period_seconds);
        let allowed = count <= self.max_calls;

        trace!(
            "rate limit check for {identity}: {count}/{} in {}s -> {}",
            self.max_calls,
            self.period_seconds,
            if allowed { "allow" } else { "deny" }
        );

        allowed
    }
}
