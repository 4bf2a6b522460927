//! Periodic cleanup of rate-limit bookkeeping.
//!
//! Drops attempt records older than the retention period so the in-memory
//! map or the `tc_verification_attempts` table does not grow without bound.

use std::sync::Arc;
use std::time::Duration;

use tcportal_core::clock::Clock;
use tcportal_core::rate_limit::AttemptLimiter;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Run one pruning pass. Returns how many entries were removed.
pub async fn prune_once(
    limiter: &dyn AttemptLimiter,
    clock: &dyn Clock,
    retention: chrono::Duration,
) -> u64 {
    let cutoff = clock.now() - retention;
    match limiter.prune(cutoff).await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(removed, "Attempt pruning: purged old entries");
            } else {
                tracing::debug!("Attempt pruning: nothing to purge");
            }
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "Attempt pruning: cleanup failed");
            0
        }
    }
}

/// Run the pruning loop until `cancel` is triggered.
pub async fn run(
    limiter: Arc<dyn AttemptLimiter>,
    clock: Arc<dyn Clock>,
    retention: chrono::Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.num_seconds(),
        interval_secs = interval.as_secs(),
        "Attempt pruning job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Attempt pruning job stopping");
                break;
            }
            _ = ticker.tick() => {
                prune_once(limiter.as_ref(), clock.as_ref(), retention).await;
            }
        }
    }
}
