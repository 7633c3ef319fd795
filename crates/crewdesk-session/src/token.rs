//! # Access tokens and expiry introspection
//!
//! Tokens are opaque bearer strings issued by the identity provider. When
//! they are JWT-shaped, the `exp` claim of the payload (second segment) is
//! read without verifying the signature. Anything that does not decode
//! degrades to [`TokenStatus::invalid`]; decoding never returns an error.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use zeroize::Zeroizing;

/// Remaining lifetime under which a valid token is reported as expiring soon.
pub const EXPIRY_WARNING_SECS: i64 = 5 * 60;

/// A bearer token. The secret is wiped from memory on drop and redacted
/// from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Zeroizing::new(raw.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Expiry from the `exp` claim, if the token carries a readable one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        decode_expiry_millis(self.as_str()).and_then(DateTime::from_timestamp_millis)
    }

    /// Status of this token at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> TokenStatus {
        TokenStatus::evaluate(self.as_str(), now)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Expiry report for the cached token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub valid: bool,
    /// Whole seconds until expiry, rounded down. Negative once expired.
    /// `None` when no expiry could be read.
    pub seconds_remaining: Option<i64>,
    pub expired: bool,
    pub expiring_soon: bool,
}

impl TokenStatus {
    /// Status reported for a missing or undecodable token.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            seconds_remaining: None,
            expired: true,
            expiring_soon: false,
        }
    }

    /// Evaluate a raw token string at `now`.
    pub fn evaluate(token: &str, now: DateTime<Utc>) -> Self {
        let Some(exp_ms) = decode_expiry_millis(token) else {
            tracing::debug!("access token payload could not be decoded");
            return Self::invalid();
        };
        let remaining_ms = exp_ms.saturating_sub(now.timestamp_millis());
        let valid = remaining_ms > 0;
        Self {
            valid,
            seconds_remaining: Some(remaining_ms.div_euclid(1000)),
            expired: !valid,
            expiring_soon: valid && remaining_ms < EXPIRY_WARNING_SECS * 1000,
        }
    }
}

/// Read the `exp` claim (seconds since the epoch) as milliseconds.
fn decode_expiry_millis(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?.trim_end_matches('=');
    if payload.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_f64()?;
    if !exp.is_finite() {
        return None;
    }
    Some((exp * 1000.0) as i64)
}

/// Encode a JWT-shaped, unsigned token carrying `claims`.
pub(crate) fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.unsigned")
}
