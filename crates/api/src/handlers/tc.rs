//! Public transfer-certificate endpoints: search, verify, download.
//!
//! None of these require authentication. Responses never include the
//! admission number or the artifact location.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use tcportal_core::artifact::PDF_CONTENT_TYPE;
use tcportal_core::download_token::{DownloadToken, TokenError};
use tcportal_core::search;
use tcportal_core::types::{DbId, Timestamp};
use tcportal_db::models::tc_record::PublicTcRecord;

use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientIdentity;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /tc/search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub records: Vec<PublicTcRecord>,
}

/// Case-insensitive substring search over name, father's name, class and
/// certificate number. An empty query lists every record.
pub async fn search_records(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    search::validate_query(&params.query)?;

    let all = state.records.list_all().await?;
    let records: Vec<PublicTcRecord> = search::search(&params.query, all)
        .into_iter()
        .map(PublicTcRecord::from)
        .collect();

    tracing::debug!(results = records.len(), "Certificate search");
    Ok(Json(SearchResponse { records }))
}

// ---------------------------------------------------------------------------
// POST /tc/{id}/verify
// ---------------------------------------------------------------------------

/// Missing fields deserialize as empty strings and fail verification like
/// any other wrong answer.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub admission_number: String,
    #[serde(default)]
    pub challenge_token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub download_url: String,
    pub expires_at: Timestamp,
}

/// Public message for a verify body that is not valid JSON.
pub const INVALID_VERIFY_BODY: &str = "Invalid request. Please submit the form again.";

/// Verify the requester knows the record's admission number and return a
/// short-lived download link.
pub async fn verify_record(
    State(state): State<AppState>,
    Path(record_id): Path<DbId>,
    client: ClientIdentity,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<Json<VerifyResponse>> {
    // Rejected before the limiter, so an unreadable body costs no attempt.
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Unreadable verify request body");
        AppError::MalformedVerifyRequest(INVALID_VERIFY_BODY.to_string())
    })?;

    let token = state
        .verification
        .verify(
            record_id,
            &body.admission_number,
            &body.challenge_token,
            &client,
        )
        .await?;

    Ok(Json(VerifyResponse {
        success: true,
        download_url: state.verification.download_url(&token),
        expires_at: token.expires_at(),
    }))
}

// ---------------------------------------------------------------------------
// GET /tc/{id}/download
// ---------------------------------------------------------------------------

/// Kept as strings so a malformed link is reported as an invalid link
/// rather than a query-parsing error.
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub expires: Option<String>,
    pub signature: Option<String>,
}

impl DownloadParams {
    fn into_token(self, record_id: DbId) -> Result<DownloadToken, TokenError> {
        let expires = self
            .expires
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(TokenError::Invalid)?;
        let signature = self.signature.ok_or(TokenError::Invalid)?;
        Ok(DownloadToken {
            record_id,
            expires,
            signature,
        })
    }
}

/// Stream the certificate PDF for a valid, unexpired link.
pub async fn download_certificate(
    State(state): State<AppState>,
    Path(record_id): Path<DbId>,
    Query(params): Query<DownloadParams>,
) -> AppResult<Response> {
    let token = params.into_token(record_id)?;
    let artifact = state.verification.redeem(&token).await?;

    let headers = [
        (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
        (header::CONTENT_LENGTH, artifact.len.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        ),
        (header::CACHE_CONTROL, "no-store".to_string()),
    ];
    let body = Body::from_stream(ReaderStream::new(artifact.file));

    Ok((headers, body).into_response())
}
