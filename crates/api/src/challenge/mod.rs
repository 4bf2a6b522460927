//! Human-verification (CAPTCHA) checks for the verify endpoint.
//!
//! The verifier is chosen once at startup by [`build_challenge_verifier`]
//! and injected into the verification service. Nothing in a request can
//! change which verifier runs.

pub mod turnstile;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use turnstile::SiteVerifyClient;

/// The only token accepted while challenges are disabled.
pub const BYPASS_TOKEN: &str = "XXXX.DUMMY.TOKEN.XXXX";

/// Cloudflare Turnstile's siteverify endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Default timeout for one siteverify call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Checks an opaque challenge token issued to the browser by the provider.
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// `true` only when the provider positively confirms the token.
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> bool;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMode {
    /// Every token is checked with the provider.
    Enforce,
    /// Only [`BYPASS_TOKEN`] passes. Refused in production.
    Disabled,
}

#[derive(Clone)]
pub struct ChallengeConfig {
    pub mode: ChallengeMode,
    /// Provider secret key. Empty when disabled.
    pub secret: String,
    pub verify_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ChallengeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeConfig")
            .field("mode", &self.mode)
            .field("secret", &"<redacted>")
            .field("verify_url", &self.verify_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ChallengeConfig {
    /// | Env Var                  | Required         | Default                   |
    /// |--------------------------|------------------|---------------------------|
    /// | `CHALLENGE_MODE`         | no               | `enforce`                 |
    /// | `CHALLENGE_SECRET`       | when enforcing   | --                        |
    /// | `CHALLENGE_VERIFY_URL`   | no               | Turnstile siteverify URL  |
    /// | `CHALLENGE_TIMEOUT_SECS` | no               | `5`                       |
    ///
    /// # Panics
    ///
    /// Panics if the mode is `disabled` in production, or if the mode is
    /// `enforce` without a secret.
    pub fn from_env(is_production: bool) -> Self {
        let mode = match std::env::var("CHALLENGE_MODE")
            .unwrap_or_else(|_| "enforce".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "enforce" => ChallengeMode::Enforce,
            "disabled" => ChallengeMode::Disabled,
            other => panic!("CHALLENGE_MODE must be 'enforce' or 'disabled', got '{other}'"),
        };

        let secret = std::env::var("CHALLENGE_SECRET").unwrap_or_default();

        let verify_url =
            std::env::var("CHALLENGE_VERIFY_URL").unwrap_or_else(|_| DEFAULT_VERIFY_URL.into());

        let timeout_secs: u64 = std::env::var("CHALLENGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("CHALLENGE_TIMEOUT_SECS must be a valid u64");

        let config = Self {
            mode,
            secret,
            verify_url,
            timeout_secs,
        };
        config.assert_valid(is_production);
        config
    }

    fn assert_valid(&self, is_production: bool) {
        assert!(
            !(is_production && self.mode == ChallengeMode::Disabled),
            "CHALLENGE_MODE=disabled is not allowed when APP_ENV=production"
        );
        assert!(
            self.mode == ChallengeMode::Disabled || !self.secret.is_empty(),
            "CHALLENGE_SECRET must be set when CHALLENGE_MODE=enforce"
        );
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Verifiers
// ---------------------------------------------------------------------------

/// Development verifier: accepts [`BYPASS_TOKEN`] and nothing else.
#[derive(Debug, Default)]
pub struct DisabledChallengeVerifier;

#[async_trait]
impl ChallengeVerifier for DisabledChallengeVerifier {
    async fn verify(&self, token: &str, _remote_ip: Option<&str>) -> bool {
        token == BYPASS_TOKEN
    }
}

/// Build the verifier selected by `config`.
pub fn build_challenge_verifier(
    config: &ChallengeConfig,
) -> Result<Arc<dyn ChallengeVerifier>, reqwest::Error> {
    match config.mode {
        ChallengeMode::Enforce => Ok(Arc::new(SiteVerifyClient::new(
            config.verify_url.clone(),
            config.secret.clone(),
            config.timeout(),
        )?)),
        ChallengeMode::Disabled => {
            tracing::warn!("Challenge verification is disabled; only the bypass token is accepted");
            Ok(Arc::new(DisabledChallengeVerifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: ChallengeMode, secret: &str) -> ChallengeConfig {
        ChallengeConfig {
            mode,
            secret: secret.into(),
            verify_url: DEFAULT_VERIFY_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[tokio::test]
    async fn disabled_mode_accepts_only_bypass_token() {
        let verifier = DisabledChallengeVerifier;
        assert!(verifier.verify(BYPASS_TOKEN, None).await);
        assert!(!verifier.verify("anything-else", None).await);
        assert!(!verifier.verify("", None).await);
    }

    #[test]
    #[should_panic(expected = "not allowed when APP_ENV=production")]
    fn disabled_mode_refused_in_production() {
        config(ChallengeMode::Disabled, "").assert_valid(true);
    }

    #[test]
    fn disabled_mode_allowed_outside_production() {
        config(ChallengeMode::Disabled, "").assert_valid(false);
    }

    #[test]
    #[should_panic(expected = "CHALLENGE_SECRET must be set")]
    fn enforce_mode_requires_secret() {
        config(ChallengeMode::Enforce, "").assert_valid(false);
    }

    #[tokio::test]
    async fn factory_builds_bypass_verifier_when_disabled() {
        let verifier = build_challenge_verifier(&config(ChallengeMode::Disabled, "")).unwrap();
        assert!(verifier.verify(BYPASS_TOKEN, None).await);
    }

    #[tokio::test]
    async fn enforcing_verifier_rejects_bypass_token_when_provider_unreachable() {
        let mut cfg = config(ChallengeMode::Enforce, "secret");
        // Nothing listens on the discard port.
        cfg.verify_url = "http://127.0.0.1:9/siteverify".into();
        cfg.timeout_secs = 1;
        let verifier = build_challenge_verifier(&cfg).unwrap();
        assert!(!verifier.verify(BYPASS_TOKEN, None).await);
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = config(ChallengeMode::Enforce, "turnstile-secret-value");
        assert!(!format!("{cfg:?}").contains("turnstile-secret-value"));
    }
}
