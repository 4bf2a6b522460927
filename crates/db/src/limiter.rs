//! PostgreSQL-backed attempt limiter for multi-instance deployments.

use async_trait::async_trait;
use tcportal_core::rate_limit::{retry_after_secs, AttemptLimiter, LimiterError, RateLimitPolicy};
use tcportal_core::types::Timestamp;

use crate::repositories::{BudgetCheck, VerificationAttemptRepo};
use crate::DbPool;

/// Shares attempt counters between every process connected to the same
/// database.
pub struct PgAttemptLimiter {
    pool: DbPool,
    policy: RateLimitPolicy,
}

impl PgAttemptLimiter {
    pub fn new(pool: DbPool, policy: RateLimitPolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl AttemptLimiter for PgAttemptLimiter {
    async fn check_and_record(
        &self,
        client_identifier: &str,
        now: Timestamp,
    ) -> Result<(), LimiterError> {
        let check =
            VerificationAttemptRepo::record_within_budget(&self.pool, client_identifier, now, &self.policy)
                .await
                .map_err(|e| LimiterError::Backend(e.to_string()))?;

        match check {
            BudgetCheck::Admitted => Ok(()),
            BudgetCheck::Exhausted { oldest } => Err(LimiterError::Exhausted {
                retry_after_secs: retry_after_secs(oldest + self.policy.window, now),
            }),
        }
    }

    async fn prune(&self, cutoff: Timestamp) -> Result<u64, LimiterError> {
        VerificationAttemptRepo::delete_older_than(&self.pool, cutoff)
            .await
            .map_err(|e| LimiterError::Backend(e.to_string()))
    }
}
