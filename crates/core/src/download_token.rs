//! Signed, time-limited download capabilities for certificate PDFs.
//!
//! A token is the triple `(record_id, expires, signature)` where `expires` is
//! a Unix timestamp and `signature` is the hex HMAC-SHA256 of
//! `tc-download:{record_id}:{expires}` under a server-held secret. Tokens are
//! stateless and stay valid for every redemption until they expire.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::types::{DbId, Timestamp};

type HmacSha256 = Hmac<Sha256>;

/// Default lifetime of a download link.
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Shortest signing secret accepted at startup, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Domain separator so a signature can never be replayed as another kind of MAC.
const MESSAGE_PREFIX: &str = "tc-download";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A download capability for exactly one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadToken {
    pub record_id: DbId,
    /// Expiry as a Unix timestamp in seconds.
    pub expires: i64,
    /// Lowercase hex HMAC-SHA256.
    pub signature: String,
}

impl DownloadToken {
    /// Expiry as a UTC timestamp.
    pub fn expires_at(&self) -> Timestamp {
        chrono::DateTime::from_timestamp(self.expires, 0).unwrap_or_default()
    }

    /// `expires=..&signature=..`, ready to append to the download path.
    pub fn query_string(&self) -> String {
        format!("expires={}&signature={}", self.expires, self.signature)
    }
}

/// Why a token could not be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("This download link has expired. Please verify again.")]
    Expired,

    #[error("This download link is invalid. Please verify again.")]
    Invalid,
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Issues and checks [`DownloadToken`]s.
#[derive(Clone)]
pub struct DownloadSigner {
    key: Vec<u8>,
    ttl: chrono::Duration,
}

impl std::fmt::Debug for DownloadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadSigner")
            .field("key", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl DownloadSigner {
    pub fn new(secret: &[u8], ttl: chrono::Duration) -> Self {
        Self {
            key: secret.to_vec(),
            ttl,
        }
    }

    /// Mint a token for `record_id` that expires `ttl` after `now`.
    pub fn issue(&self, record_id: DbId, now: Timestamp) -> DownloadToken {
        let expires = (now + self.ttl).timestamp();
        let signature = hex::encode(self.mac(record_id, expires).finalize().into_bytes());
        DownloadToken {
            record_id,
            expires,
            signature,
        }
    }

    /// Check a token presented at `now`.
    ///
    /// The signature is checked first (in constant time), so a token whose
    /// expiry was edited is `Invalid`, not `Expired`.
    pub fn verify(&self, token: &DownloadToken, now: Timestamp) -> Result<(), TokenError> {
        let provided = hex::decode(&token.signature).ok_or(TokenError::Invalid)?;
        self.mac(token.record_id, token.expires)
            .verify_slice(&provided)
            .map_err(|_| TokenError::Invalid)?;

        if now.timestamp() >= token.expires {
            return Err(TokenError::Expired);
        }
        Ok(())
    }

    fn mac(&self, record_id: DbId, expires: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(format!("{MESSAGE_PREFIX}:{record_id}:{expires}").as_bytes());
        mac
    }
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string; `None` on odd length or non-hex characters.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
