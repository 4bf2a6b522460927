//! Repository for the `tc_verification_attempts` table.
//!
//! Rows are rate-limit bookkeeping only: one row per admitted attempt.

use sqlx::PgPool;
use tcportal_core::rate_limit::RateLimitPolicy;
use tcportal_core::types::Timestamp;

/// Result of [`VerificationAttemptRepo::record_within_budget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetCheck {
    /// The attempt was recorded.
    Admitted,
    /// The budget is used up; `oldest` is the earliest attempt still counted.
    Exhausted { oldest: Timestamp },
}

/// Provides rate-limit bookkeeping for verification attempts.
pub struct VerificationAttemptRepo;

impl VerificationAttemptRepo {
    /// Count attempts in the window ending at `now` and, if under budget,
    /// record one more.
    ///
    /// Runs in a transaction holding a transaction-scoped advisory lock keyed
    /// by the client identifier, so concurrent requests for the same client
    /// serialize across every instance sharing the database.
    pub async fn record_within_budget(
        pool: &PgPool,
        client_identifier: &str,
        now: Timestamp,
        policy: &RateLimitPolicy,
    ) -> Result<BudgetCheck, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(client_identifier)
            .execute(&mut *tx)
            .await?;

        let horizon = now - policy.window;
        let (count, oldest): (i64, Option<Timestamp>) = sqlx::query_as(
            "SELECT COUNT(*), MIN(attempted_at) FROM tc_verification_attempts \
             WHERE client_identifier = $1 AND attempted_at > $2",
        )
        .bind(client_identifier)
        .bind(horizon)
        .fetch_one(&mut *tx)
        .await?;

        if count >= i64::from(policy.max_attempts) {
            tx.rollback().await?;
            return Ok(BudgetCheck::Exhausted {
                oldest: oldest.unwrap_or(now),
            });
        }

        sqlx::query(
            "INSERT INTO tc_verification_attempts (client_identifier, attempted_at) \
             VALUES ($1, $2)",
        )
        .bind(client_identifier)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BudgetCheck::Admitted)
    }

    /// Delete attempts older than `cutoff`. Returns the number of rows removed.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tc_verification_attempts WHERE attempted_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
