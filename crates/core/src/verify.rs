//! Inbound request authentication.
//!
//! The provider signs every webhook with `v0=hex(HMAC-SHA256(secret, "v0:{ts}:{body}"))`
//! and sends the timestamp alongside. A request is accepted only when the timestamp is
//! inside the freshness window and the signature matches in constant time.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::errors::VerificationError;

pub const SIGNATURE_VERSION: &str = "v0";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Inputs for a single verification. Never persisted.
pub struct VerificationContext<'a> {
    pub secret: &'a SecretString,
    pub signature: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureVerifier {
    freshness_window_secs: i64,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW_SECS)
    }
}

impl SignatureVerifier {
    pub fn new(freshness_window_secs: u64) -> Self {
        Self { freshness_window_secs: i64::try_from(freshness_window_secs).unwrap_or(i64::MAX) }
    }

    pub fn verify(&self, context: &VerificationContext<'_>) -> Result<(), VerificationError> {
        self.verify_at(context, Utc::now())
    }

    /// Same as [`verify`](Self::verify) with an explicit clock.
    pub fn verify_at(
        &self,
        context: &VerificationContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let signature = context
            .signature
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(VerificationError::MalformedHeaders)?;
        let raw_timestamp = context
            .timestamp
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(VerificationError::MalformedHeaders)?;
        let timestamp =
            raw_timestamp.parse::<i64>().map_err(|_| VerificationError::MalformedHeaders)?;

        let skew = now.timestamp().saturating_sub(timestamp).saturating_abs();
        if skew > self.freshness_window_secs {
            return Err(VerificationError::StaleTimestamp);
        }

        let provided = signature
            .strip_prefix(SIGNATURE_VERSION)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(|digest| hex::decode(digest).ok())
            .ok_or(VerificationError::SignatureMismatch)?;

        // verify_slice compares in constant time.
        signing_mac(context.secret, raw_timestamp, context.body)?
            .verify_slice(&provided)
            .map_err(|_| VerificationError::SignatureMismatch)
    }
}

/// Computes the `v0=<hex>` signature header value for a body.
pub fn sign(
    secret: &SecretString,
    timestamp: &str,
    body: &[u8],
) -> Result<String, VerificationError> {
    let digest = signing_mac(secret, timestamp, body)?.finalize().into_bytes();
    Ok(format!("{SIGNATURE_VERSION}={}", hex::encode(digest)))
}

fn signing_mac(
    secret: &SecretString,
    timestamp: &str,
    body: &[u8],
) -> Result<HmacSha256, VerificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| VerificationError::SignatureMismatch)?;
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}
