//! The public verification flow: rate limit, challenge, identity check, and
//! download-link issuance and redemption.

use std::path::PathBuf;
use std::sync::Arc;

use tcportal_core::admission::admission_matches;
use tcportal_core::artifact;
use tcportal_core::clock::Clock;
use tcportal_core::download_token::{DownloadSigner, DownloadToken, TokenError};
use tcportal_core::error::CoreError;
use tcportal_core::rate_limit::{AttemptLimiter, LimiterError};
use tcportal_core::types::{DbId, Timestamp};
use tcportal_core::verification::{VerificationAttempt, VerificationError};
use tcportal_db::models::tc_record::TcRecord;
use tcportal_db::store::RecordStore;

use crate::challenge::ChallengeVerifier;
use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientIdentity;

/// An opened certificate ready to stream.
#[derive(Debug)]
pub struct Artifact {
    pub file: tokio::fs::File,
    pub len: u64,
    /// Suggested download filename, e.g. `TC-2024-001.pdf`.
    pub filename: String,
}

/// Runs verification requests and redeems download links.
pub struct TcVerificationService {
    records: Arc<dyn RecordStore>,
    challenge: Arc<dyn ChallengeVerifier>,
    limiter: Arc<dyn AttemptLimiter>,
    signer: DownloadSigner,
    clock: Arc<dyn Clock>,
    artifact_root: PathBuf,
    public_base_url: String,
}

impl TcVerificationService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        challenge: Arc<dyn ChallengeVerifier>,
        limiter: Arc<dyn AttemptLimiter>,
        signer: DownloadSigner,
        clock: Arc<dyn Clock>,
        artifact_root: PathBuf,
        public_base_url: String,
    ) -> Self {
        Self {
            records,
            challenge,
            limiter,
            signer,
            clock,
            artifact_root,
            public_base_url,
        }
    }

    /// Check a verification request and, if it passes, issue a download
    /// token for the record.
    ///
    /// Order: attempt budget, challenge, record lookup, admission number.
    /// Every admitted attempt counts against the budget whatever its outcome.
    pub async fn verify(
        &self,
        record_id: DbId,
        admission_number: &str,
        challenge_token: &str,
        client: &ClientIdentity,
    ) -> AppResult<DownloadToken> {
        let now = self.clock.now();
        let key = client.key();

        let outcome = self
            .evaluate(record_id, admission_number, challenge_token, client, &key, now)
            .await?;

        let attempt = VerificationAttempt::new(record_id, &key, now, &outcome);
        tracing::info!(
            record_id = attempt.record_id,
            client = %attempt.client_identifier,
            outcome = attempt.outcome.as_str(),
            code = outcome.as_ref().err().map(VerificationError::code),
            "Verification attempt"
        );

        let record = outcome?;
        Ok(self.signer.issue(record.id, now))
    }

    /// The outer `Result` carries infrastructure failures, the inner one the
    /// public verification outcome.
    async fn evaluate(
        &self,
        record_id: DbId,
        admission_number: &str,
        challenge_token: &str,
        client: &ClientIdentity,
        key: &str,
        now: Timestamp,
    ) -> AppResult<Result<TcRecord, VerificationError>> {
        match self.limiter.check_and_record(key, now).await {
            Ok(()) => {}
            Err(LimiterError::Exhausted { retry_after_secs }) => {
                return Ok(Err(VerificationError::RateLimited { retry_after_secs }));
            }
            Err(LimiterError::Backend(msg)) => return Err(AppError::InternalError(msg)),
        }

        let remote_ip = client.ip.map(|ip| ip.to_string());
        if !self
            .challenge
            .verify(challenge_token, remote_ip.as_deref())
            .await
        {
            return Ok(Err(VerificationError::ChallengeFailed));
        }

        let Some(record) = self.records.find_by_id(record_id).await? else {
            return Ok(Err(VerificationError::RecordNotFound));
        };

        if !admission_matches(&record.admission_number, admission_number) {
            return Ok(Err(VerificationError::IdentityMismatch));
        }

        Ok(Ok(record))
    }

    /// Absolute (or root-relative) URL for a token.
    pub fn download_url(&self, token: &DownloadToken) -> String {
        format!(
            "{}/api/v1/tc/{}/download?{}",
            self.public_base_url,
            token.record_id,
            token.query_string()
        )
    }

    /// Check a download token and open the certificate it grants.
    pub async fn redeem(&self, token: &DownloadToken) -> AppResult<Artifact> {
        self.signer.verify(token, self.clock.now())?;

        let record = self
            .records
            .find_by_id(token.record_id)
            .await?
            .ok_or(TokenError::Invalid)?;

        let path = artifact::resolve(&self.artifact_root, &record.artifact_path).map_err(|e| {
            tracing::error!(record_id = record.id, error = %e, "Stored artifact path rejected");
            AppError::InternalError("Certificate file unavailable".into())
        })?;

        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            tracing::error!(record_id = record.id, path = %path.display(), error = %e, "Certificate file missing");
            AppError::Core(CoreError::NotFound {
                entity: "Certificate file",
                id: record.id,
            })
        })?;
        let len = file
            .metadata()
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?
            .len();

        tracing::info!(record_id = record.id, "Certificate download");

        Ok(Artifact {
            file,
            len,
            filename: artifact::attachment_filename(&record.tc_number),
        })
    }
}
