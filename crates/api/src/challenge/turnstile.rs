//! Client for siteverify-style challenge providers (Cloudflare Turnstile,
//! hCaptcha and reCAPTCHA share the same form-post contract).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::ChallengeVerifier;

/// The provider's answer. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Posts tokens to the provider's siteverify endpoint. Fails closed: any
/// transport error, timeout, non-2xx status or undecodable body is a failed
/// challenge.
pub struct SiteVerifyClient {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl SiteVerifyClient {
    pub fn new(
        verify_url: String,
        secret: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            verify_url,
            secret,
        })
    }

    async fn try_verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<SiteVerifyResponse, reqwest::Error> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        self.client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json::<SiteVerifyResponse>()
            .await
    }
}

#[async_trait]
impl ChallengeVerifier for SiteVerifyClient {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> bool {
        if token.trim().is_empty() {
            return false;
        }

        match self.try_verify(token, remote_ip).await {
            Ok(resp) if resp.success => true,
            Ok(resp) => {
                tracing::info!(error_codes = ?resp.error_codes, "Challenge rejected by provider");
                false
            }
            Err(e) => {
                tracing::warn!(
                    url = %self.verify_url,
                    error = %e,
                    "Challenge provider call failed, treating as failed challenge"
                );
                false
            }
        }
    }
}
