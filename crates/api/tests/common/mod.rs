#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use tcportal_api::auth::jwt::{generate_access_token, JwtConfig};
use tcportal_api::challenge::{ChallengeConfig, ChallengeMode, ChallengeVerifier};
use tcportal_api::config::{DownloadConfig, RateLimitBackend, RateLimitConfig, ServerConfig};
use tcportal_api::router::build_app_router;
use tcportal_api::state::AppState;
use tcportal_api::verification::TcVerificationService;
use tcportal_core::clock::ManualClock;
use tcportal_core::download_token::DownloadSigner;
use tcportal_core::rate_limit::InMemoryAttemptLimiter;
use tcportal_db::models::tc_record::TcRecord;
use tcportal_db::store::MemoryRecordStore;

/// Token the stub challenge provider accepts.
pub const GOOD_CHALLENGE: &str = "challenge-ok";

/// PDF bytes stored for the scenario record.
pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n% transfer certificate\n%%EOF\n";

const SIGNING_SECRET: &str = "test-download-signing-secret-0123456789";

/// Challenge stub: passes [`GOOD_CHALLENGE`] only.
pub struct StubChallenge;

#[async_trait]
impl ChallengeVerifier for StubChallenge {
    async fn verify(&self, token: &str, _remote_ip: Option<&str>) -> bool {
        token == GOOD_CHALLENGE
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(artifact_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        app_env: "test".to_string(),
        // Lets tests pick the client identity via X-Forwarded-For.
        trust_forwarded_for: true,
        trusted_proxy_hops: 1,
        jwt: JwtConfig {
            secret: "test-jwt-secret-that-is-long-enough".to_string(),
            access_token_expiry_mins: 15,
        },
        download: DownloadConfig {
            signing_secret: SIGNING_SECRET.to_string(),
            ttl_secs: 300,
            artifact_root: artifact_root.to_path_buf(),
            public_base_url: String::new(),
        },
        challenge: ChallengeConfig {
            mode: ChallengeMode::Enforce,
            secret: "unused".to_string(),
            verify_url: "http://127.0.0.1:9/siteverify".to_string(),
            timeout_secs: 1,
        },
        rate_limit: RateLimitConfig {
            max_attempts: 5,
            window_secs: 300,
            backend: RateLimitBackend::Memory,
            retention_hours: 24,
        },
    }
}

/// The record used throughout the verification scenarios.
pub fn scenario_record() -> TcRecord {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    TcRecord {
        id: 42,
        tc_number: "TC-2024-001".into(),
        student_name: "Aarav Singh".into(),
        father_name: "Rohit Singh".into(),
        class: "10".into(),
        admission_number: "ADM1234".into(),
        date_of_issue: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        artifact_path: "2024/TC-2024-001.pdf".into(),
        created_at: at,
        updated_at: at,
    }
}

pub fn second_record() -> TcRecord {
    TcRecord {
        id: 43,
        tc_number: "TC-2024-002".into(),
        student_name: "Meera Iyer".into(),
        father_name: "Suresh Iyer".into(),
        class: "12".into(),
        admission_number: "ADM5678".into(),
        artifact_path: "2024/TC-2024-002.pdf".into(),
        ..scenario_record()
    }
}

/// A running app plus handles to its clock and artifact directory.
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub config: ServerConfig,
    pub artifacts: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_records(vec![scenario_record(), second_record()])
    }

    /// Build the full router over an in-memory store seeded with `records`.
    /// Only the scenario record's PDF is written to disk.
    pub fn with_records(records: Vec<TcRecord>) -> Self {
        let artifacts = tempfile::tempdir().unwrap();
        let pdf = artifacts.path().join("2024/TC-2024-001.pdf");
        std::fs::create_dir_all(pdf.parent().unwrap()).unwrap();
        std::fs::write(&pdf, PDF_BYTES).unwrap();

        let config = test_config(artifacts.path());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        ));
        let records: Arc<MemoryRecordStore> = Arc::new(MemoryRecordStore::with_records(records));

        let verification = TcVerificationService::new(
            records.clone(),
            Arc::new(StubChallenge),
            Arc::new(InMemoryAttemptLimiter::new(config.rate_limit.policy())),
            DownloadSigner::new(
                config.download.signing_secret.as_bytes(),
                chrono::Duration::seconds(config.download.ttl_secs),
            ),
            clock.clone(),
            config.download.artifact_root.clone(),
            config.download.public_base_url.clone(),
        );

        let state = AppState {
            config: Arc::new(config.clone()),
            records,
            verification: Arc::new(verification),
        };

        Self {
            router: build_app_router(state, &config),
            clock,
            config,
            artifacts,
        }
    }

    pub fn admin_token(&self) -> String {
        generate_access_token(1, "admin", &self.config.jwt).unwrap()
    }

    pub fn staff_token(&self, role: &str) -> String {
        generate_access_token(2, role, &self.config.jwt).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_authed(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// POST a verification request on behalf of client `ip`.
    pub async fn verify(
        &self,
        record_id: i64,
        admission_number: &str,
        challenge_token: &str,
        ip: &str,
    ) -> Response<Body> {
        let body = serde_json::json!({
            "admission_number": admission_number,
            "challenge_token": challenge_token,
        });
        self.send(
            Request::post(format!("/api/v1/tc/{record_id}/verify"))
                .header("content-type", "application/json")
                .header("x-forwarded-for", ip)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}
