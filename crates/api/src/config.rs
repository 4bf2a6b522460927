use std::path::PathBuf;

use tcportal_core::download_token::{DEFAULT_TTL_SECS, MIN_SECRET_LEN};
use tcportal_core::rate_limit::{RateLimitPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_SECS};

use crate::auth::jwt::JwtConfig;
use crate::challenge::ChallengeConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deployment environment name (default: `development`).
    pub app_env: String,
    /// Take the client identity from `X-Forwarded-For` instead of the peer
    /// address. Only enable behind a reverse proxy that appends to the header.
    pub trust_forwarded_for: bool,
    /// Number of trusted proxies in front of the server (default: `1`). The
    /// client is the address this many entries from the right of
    /// `X-Forwarded-For`; entries further left are client-supplied.
    pub trusted_proxy_hops: usize,
    /// Admin JWT configuration.
    pub jwt: JwtConfig,
    /// Download link signing and artifact location.
    pub download: DownloadConfig,
    /// Human-verification provider settings.
    pub challenge: ChallengeConfig,
    /// Verification attempt throttling.
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `APP_ENV`              | `development`              |
    /// | `TRUST_FORWARDED_FOR`  | `false`                    |
    /// | `TRUSTED_PROXY_HOPS`   | `1`                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let trust_forwarded_for = parse_bool_env("TRUST_FORWARDED_FOR", false);

        let trusted_proxy_hops: usize = std::env::var("TRUSTED_PROXY_HOPS")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("TRUSTED_PROXY_HOPS must be a valid usize");
        assert!(trusted_proxy_hops > 0, "TRUSTED_PROXY_HOPS must be at least 1");

        let is_production = app_env.eq_ignore_ascii_case("production");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            trust_forwarded_for,
            trusted_proxy_hops,
            jwt: JwtConfig::from_env(),
            download: DownloadConfig::from_env(),
            challenge: ChallengeConfig::from_env(is_production),
            rate_limit: RateLimitConfig::from_env(),
            app_env,
        }
    }
}

// ---------------------------------------------------------------------------
// Download links
// ---------------------------------------------------------------------------

/// Settings for signed certificate download links.
#[derive(Clone)]
pub struct DownloadConfig {
    /// HMAC-SHA256 secret used to sign download links.
    pub signing_secret: String,
    /// Link lifetime in seconds (default: 300).
    pub ttl_secs: i64,
    /// Directory that record `artifact_path`s are relative to.
    pub artifact_root: PathBuf,
    /// Prefix for generated links, e.g. `https://school.example`. Empty
    /// yields a root-relative URL.
    pub public_base_url: String,
}

impl std::fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("signing_secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .field("artifact_root", &self.artifact_root)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl DownloadConfig {
    /// | Env Var                   | Required | Default         |
    /// |---------------------------|----------|-----------------|
    /// | `DOWNLOAD_SIGNING_SECRET` | **yes**  | --              |
    /// | `DOWNLOAD_TTL_SECS`       | no       | `300`           |
    /// | `ARTIFACT_ROOT`           | no       | `./storage/tc`  |
    /// | `PUBLIC_BASE_URL`         | no       | empty           |
    ///
    /// # Panics
    ///
    /// Panics if the signing secret is missing or shorter than 32 bytes.
    pub fn from_env() -> Self {
        let signing_secret = std::env::var("DOWNLOAD_SIGNING_SECRET")
            .expect("DOWNLOAD_SIGNING_SECRET must be set in the environment");
        assert!(
            signing_secret.len() >= MIN_SECRET_LEN,
            "DOWNLOAD_SIGNING_SECRET must be at least {MIN_SECRET_LEN} bytes"
        );

        let ttl_secs: i64 = std::env::var("DOWNLOAD_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_TTL_SECS.to_string())
            .parse()
            .expect("DOWNLOAD_TTL_SECS must be a valid i64");
        assert!(ttl_secs > 0, "DOWNLOAD_TTL_SECS must be positive");

        let artifact_root = std::env::var("ARTIFACT_ROOT")
            .unwrap_or_else(|_| "./storage/tc".into())
            .into();

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        Self {
            signing_secret,
            ttl_secs,
            artifact_root,
            public_base_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// Where attempt counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Process-local counters. Correct only for a single instance.
    Memory,
    /// Counters in the shared PostgreSQL database.
    Postgres,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window_secs: i64,
    pub backend: RateLimitBackend,
    /// How long attempt bookkeeping is kept before pruning.
    pub retention_hours: i64,
}

impl RateLimitConfig {
    /// | Env Var                   | Default  |
    /// |---------------------------|----------|
    /// | `RATE_LIMIT_MAX_ATTEMPTS` | `5`      |
    /// | `RATE_LIMIT_WINDOW_SECS`  | `300`    |
    /// | `RATE_LIMIT_BACKEND`      | `memory` |
    /// | `ATTEMPT_RETENTION_HOURS` | `24`     |
    pub fn from_env() -> Self {
        let max_attempts: u32 = std::env::var("RATE_LIMIT_MAX_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_MAX_ATTEMPTS.to_string())
            .parse()
            .expect("RATE_LIMIT_MAX_ATTEMPTS must be a valid u32");
        assert!(max_attempts > 0, "RATE_LIMIT_MAX_ATTEMPTS must be positive");

        let window_secs: i64 = std::env::var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| DEFAULT_WINDOW_SECS.to_string())
            .parse()
            .expect("RATE_LIMIT_WINDOW_SECS must be a valid i64");
        assert!(window_secs > 0, "RATE_LIMIT_WINDOW_SECS must be positive");

        let backend = match std::env::var("RATE_LIMIT_BACKEND")
            .unwrap_or_else(|_| "memory".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => RateLimitBackend::Memory,
            "postgres" => RateLimitBackend::Postgres,
            other => panic!("RATE_LIMIT_BACKEND must be 'memory' or 'postgres', got '{other}'"),
        };

        let retention_hours: i64 = std::env::var("ATTEMPT_RETENTION_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("ATTEMPT_RETENTION_HOURS must be a valid i64");

        Self {
            max_attempts,
            window_secs,
            backend,
            retention_hours,
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_attempts: self.max_attempts,
            window: chrono::Duration::seconds(self.window_secs),
        }
    }

    /// Bookkeeping older than this is safe to delete. Never shorter than the
    /// window, or pruning would forget attempts that still count.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours).max(chrono::Duration::seconds(self.window_secs))
    }
}

/// Parse a boolean env var (`true`/`1`/`yes`), falling back to `default`.
fn parse_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
