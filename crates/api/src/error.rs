use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tcportal_core::download_token::TokenError;
use tcportal_core::error::CoreError;
use tcportal_core::verification::VerificationError;
use tcportal_db::store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `tcportal_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A failed public verification request.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// A download link that cannot be redeemed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A public verify request whose body could not be read. Rendered in the
    /// verify endpoint's `{ success, message, code }` shape.
    #[error("Malformed verify request: {0}")]
    MalformedVerifyRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Public verification failures use the `{ success, message, code }`
            // shape the verify endpoint returns on success.
            AppError::Verification(err) => return verification_response(err),
            AppError::MalformedVerifyRequest(msg) => {
                let body = json!({
                    "success": false,
                    "message": msg,
                    "code": "BAD_REQUEST",
                });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }

            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Store and database errors ---
            AppError::Store(StoreError::DuplicateTcNumber(tc_number)) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("A certificate with number {tc_number} already exists"),
            ),
            AppError::Store(StoreError::Database(err)) | AppError::Database(err) => {
                classify_sqlx_error(err)
            }

            // --- Download links ---
            AppError::Token(err) => match err {
                TokenError::Expired => (StatusCode::GONE, "LINK_EXPIRED", err.to_string()),
                TokenError::Invalid => (StatusCode::FORBIDDEN, "LINK_INVALID", err.to_string()),
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn verification_response(err: &VerificationError) -> Response {
    let status = match err {
        VerificationError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        VerificationError::RecordNotFound
        | VerificationError::IdentityMismatch
        | VerificationError::ChallengeFailed => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let body = json!({
        "success": false,
        "message": err.to_string(),
        "code": err.code(),
    });

    let mut response = (status, axum::Json(body)).into_response();
    if let VerificationError::RateLimited { retry_after_secs } = err {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
    }
    response
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
