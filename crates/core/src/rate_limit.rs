//! Per-client throttling of verification attempts.
//!
//! Each client identifier gets a sliding-window log of attempt timestamps.
//! An attempt is admitted when fewer than `max_attempts` timestamps fall in
//! the trailing `window`; admitted attempts are recorded, rejected ones are
//! not. The check and the record happen under one lock, so two concurrent
//! requests from the same client can never both take the last slot.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::types::Timestamp;

/// Default number of attempts allowed per window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: i64 = 300;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How many attempts a client may make in how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: chrono::Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: chrono::Duration::seconds(DEFAULT_WINDOW_SECS),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    /// The client has used its budget for the current window.
    #[error("Attempt budget exhausted, retry after {retry_after_secs}s")]
    Exhausted { retry_after_secs: u64 },

    /// The limiter could not reach its storage.
    #[error("Rate-limit backend failure: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Sliding window
// ---------------------------------------------------------------------------

/// Attempt timestamps for one client, oldest first.
#[derive(Debug, Default, Clone)]
pub struct SlidingWindow {
    hits: VecDeque<Timestamp>,
}

impl SlidingWindow {
    /// Drop hits that have left the window ending at `now`.
    fn evict(&mut self, now: Timestamp, window: chrono::Duration) {
        let horizon = now - window;
        while self.hits.front().is_some_and(|t| *t <= horizon) {
            self.hits.pop_front();
        }
    }

    /// Admit and record an attempt at `now`, or return the seconds until
    /// the oldest counted attempt leaves the window.
    pub fn try_record(&mut self, now: Timestamp, policy: &RateLimitPolicy) -> Result<(), u64> {
        self.evict(now, policy.window);

        if self.hits.len() >= policy.max_attempts as usize {
            let oldest = self.hits.front().copied().unwrap_or(now);
            return Err(retry_after_secs(oldest + policy.window, now));
        }

        self.hits.push_back(now);
        Ok(())
    }

    /// Forget hits strictly older than `cutoff`. Returns `true` if nothing is left.
    pub fn forget_before(&mut self, cutoff: Timestamp) -> bool {
        while self.hits.front().is_some_and(|t| *t < cutoff) {
            self.hits.pop_front();
        }
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Whole seconds from `now` until `free_at`, never less than one.
pub fn retry_after_secs(free_at: Timestamp, now: Timestamp) -> u64 {
    let millis = (free_at - now).num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

// ---------------------------------------------------------------------------
// Limiter trait
// ---------------------------------------------------------------------------

/// Storage-agnostic attempt limiter.
///
/// Implementations must make [`check_and_record`](Self::check_and_record)
/// atomic per client identifier.
#[async_trait]
pub trait AttemptLimiter: Send + Sync {
    /// Admit and record one attempt for `client_identifier` at `now`.
    async fn check_and_record(
        &self,
        client_identifier: &str,
        now: Timestamp,
    ) -> Result<(), LimiterError>;

    /// Drop bookkeeping older than `cutoff`. Returns how many entries went away.
    async fn prune(&self, cutoff: Timestamp) -> Result<u64, LimiterError>;
}

// ---------------------------------------------------------------------------
// In-memory limiter
// ---------------------------------------------------------------------------

/// Single-process limiter. Counters are lost on restart and are not shared
/// between instances.
#[derive(Debug, Default)]
pub struct InMemoryAttemptLimiter {
    policy: RateLimitPolicy,
    windows: Mutex<HashMap<String, SlidingWindow>>,
}

impl InMemoryAttemptLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl AttemptLimiter for InMemoryAttemptLimiter {
    async fn check_and_record(
        &self,
        client_identifier: &str,
        now: Timestamp,
    ) -> Result<(), LimiterError> {
        let mut windows = self.windows.lock().await;
        windows
            .entry(client_identifier.to_string())
            .or_default()
            .try_record(now, &self.policy)
            .map_err(|retry_after_secs| LimiterError::Exhausted { retry_after_secs })
    }

    async fn prune(&self, cutoff: Timestamp) -> Result<u64, LimiterError> {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| !window.forget_before(cutoff));
        Ok((before - windows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
