//! Verification outcomes and the public error taxonomy.
//!
//! The messages here are what a member of the public sees. Unknown records
//! and wrong admission numbers deliberately share one message so the
//! verify endpoint cannot be used to probe which records exist.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// Shown for both an unknown record and a wrong admission number.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Verification failed. Please check the details and try again.";

/// Shown when the human-verification challenge did not pass.
pub const CHALLENGE_FAILURE_MESSAGE: &str = "Please complete the verification challenge again.";

/// Shown when the per-client attempt budget is exhausted.
pub const RATE_LIMITED_MESSAGE: &str = "Too many verification attempts. Please try again later.";

/// Errors a verification request can end in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("{}", GENERIC_FAILURE_MESSAGE)]
    RecordNotFound,

    #[error("{}", GENERIC_FAILURE_MESSAGE)]
    IdentityMismatch,

    #[error("{}", CHALLENGE_FAILURE_MESSAGE)]
    ChallengeFailed,

    /// The client must wait `retry_after_secs` before the window frees a slot.
    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited { retry_after_secs: u64 },
}

impl VerificationError {
    /// Stable machine-readable code for the JSON body.
    ///
    /// `RecordNotFound` and `IdentityMismatch` share a code on purpose.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RecordNotFound | Self::IdentityMismatch => "VERIFICATION_FAILED",
            Self::ChallengeFailed => "CHALLENGE_FAILED",
            Self::RateLimited { .. } => "RATE_LIMITED",
        }
    }
}

/// How a verification attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// One verification attempt, kept only for rate-limit bookkeeping and logs.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationAttempt {
    pub record_id: DbId,
    pub client_identifier: String,
    pub timestamp: Timestamp,
    pub outcome: AttemptOutcome,
}

impl VerificationAttempt {
    pub fn new(
        record_id: DbId,
        client_identifier: &str,
        timestamp: Timestamp,
        result: &Result<impl Sized, VerificationError>,
    ) -> Self {
        Self {
            record_id,
            client_identifier: client_identifier.to_string(),
            timestamp,
            outcome: if result.is_ok() {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::Failure
            },
        }
    }
}
