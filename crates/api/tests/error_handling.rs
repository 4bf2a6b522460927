//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use tcportal_api::error::AppError;
use tcportal_core::download_token::TokenError;
use tcportal_core::error::CoreError;
use tcportal_core::verification::VerificationError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "TcRecord",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "TcRecord with id 42 not found");
}

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("artifact_path must not be empty".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("connection refused to 10.0.0.5:5432".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn verification_failures_use_success_envelope() {
    let (status, json) = error_to_response(VerificationError::IdentityMismatch.into()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "VERIFICATION_FAILED");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn malformed_verify_body_uses_success_envelope() {
    let err = AppError::MalformedVerifyRequest("Invalid request.".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["message"], "Invalid request.");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn rate_limited_body_hides_counters() {
    let (status, json) =
        error_to_response(VerificationError::RateLimited { retry_after_secs: 120 }.into()).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "RATE_LIMITED");
    assert!(!json.to_string().contains("120"));
}

#[tokio::test]
async fn expired_link_returns_410() {
    let (status, json) = error_to_response(TokenError::Expired.into()).await;

    assert_eq!(status, StatusCode::GONE);
    assert_eq!(json["code"], "LINK_EXPIRED");
    assert_eq!(
        json["error"],
        "This download link has expired. Please verify again."
    );
}

#[tokio::test]
async fn invalid_link_returns_403() {
    let (status, json) = error_to_response(TokenError::Invalid.into()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "LINK_INVALID");
}
