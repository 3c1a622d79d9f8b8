//! Inbound payment-processor webhook handling.
//!
//! Verifies signatures over the raw request body, parses the event envelope,
//! and applies successful charges to the earnings ledger exactly once.

pub mod event;
pub mod receiver;
pub mod signature;

pub use event::{Charge, DestinationField, WebhookEnvelope, CHARGE_SUCCEEDED};
pub use receiver::{WebhookOutcome, WebhookReceiver};
pub use signature::SignatureVerifier;

/// Webhook-specific errors.
///
/// Unsupported event types, missing destinations and duplicate deliveries are
/// not errors; they surface as [`WebhookOutcome`] values.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Signature does not match the payload.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Signed timestamp is outside the tolerance window (replay protection).
    #[error("Webhook timestamp expired ({age_seconds} seconds old)")]
    TimestampExpired { age_seconds: i64 },

    /// Signature header is missing required parts or unparseable.
    #[error("Malformed signature header: {message}")]
    MalformedSignatureHeader { message: String },

    /// Payload is missing required fields or is not valid JSON.
    #[error("Invalid webhook payload: {message}")]
    MalformedPayload { message: String },

    /// The ledger commit could not be durably applied. Reported as a server
    /// error so the processor redelivers; redelivery is safe because the
    /// failed commit mutated nothing.
    #[error("Ledger commit failed: {message}")]
    Persistence { message: String },
}

impl WebhookError {
    /// Check if this is an authentication failure (reject, no mutation).
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::TimestampExpired { .. }
                | Self::MalformedSignatureHeader { .. }
        )
    }

    /// Check if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Persistence { .. })
    }
}

impl From<WebhookError> for crate::error::SibylError {
    fn from(err: WebhookError) -> Self {
        if err.is_client_error() {
            crate::error::SibylError::BadRequest(err.to_string())
        } else {
            crate::error::SibylError::Internal(err.to_string())
        }
    }
}
