//! Webhook signature verification.
//!
//! The processor signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `t=<unix>,v1=<hex>` in the signature header. Verification runs over the
//! body bytes exactly as received and compares in constant time.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies inbound webhook signatures against the shared secret.
///
/// The secret is held as a [`SecretString`] to prevent accidental exposure in
/// logs or debug output.
pub struct SignatureVerifier {
    secret: SecretString,
    tolerance_secs: u64,
}

impl SignatureVerifier {
    /// Create a verifier with the given timestamp tolerance window.
    #[must_use]
    pub fn new(secret: impl Into<SecretString>, tolerance_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verify the signature header against the raw payload bytes.
    ///
    /// # Errors
    /// Returns an authentication error on a malformed header, an expired
    /// timestamp, or a signature mismatch. Verification mutates nothing.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), WebhookError> {
        let parts = parse_signature_header(header)?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0) as i64;

        let age_seconds = (now - parts.timestamp).abs();
        if age_seconds > self.tolerance_secs as i64 {
            return Err(WebhookError::TimestampExpired { age_seconds });
        }

        let expected = compute_signature(
            self.secret.expose_secret().as_bytes(),
            parts.timestamp,
            payload,
        );
        let provided =
            hex::decode(&parts.signature).map_err(|_| WebhookError::InvalidSignature)?;

        if expected.ct_eq(provided.as_slice()).unwrap_u8() != 1 {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }
}

/// Parsed signature header parts.
struct SignatureParts {
    timestamp: i64,
    signature: String,
}

/// Parse the `t=...,v1=...` signature header.
fn parse_signature_header(header: &str) -> Result<SignatureParts, WebhookError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            return Err(WebhookError::MalformedSignatureHeader {
                message: "expected key=value pairs".to_string(),
            });
        };

        match key.trim() {
            "t" => timestamp = value.parse().ok(),
            "v1" => signature = Some(value.to_string()),
            _ => {} // Ignore other scheme versions
        }
    }

    Ok(SignatureParts {
        timestamp: timestamp.ok_or_else(|| WebhookError::MalformedSignatureHeader {
            message: "missing timestamp".to_string(),
        })?,
        signature: signature.ok_or_else(|| WebhookError::MalformedSignatureHeader {
            message: "missing v1 signature".to_string(),
        })?,
    })
}

/// HMAC-SHA256 over `"{timestamp}." + payload`, kept as raw bytes so the
/// payload is never round-tripped through a string encoding.
fn compute_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Build a valid signature header for a payload (test support).
#[cfg(any(test, feature = "test-clients"))]
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let sig = compute_signature(secret.as_bytes(), timestamp, payload);
    format!("t={},v1={}", timestamp, hex::encode(sig))
}
