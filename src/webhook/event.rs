//! Webhook event envelope and charge extraction.

use serde::{Deserialize, Serialize};

use super::WebhookError;

/// Event type announcing a successfully completed charge. The processor's
/// taxonomy is much broader; everything else is acknowledged as a no-op.
pub const CHARGE_SUCCEEDED: &str = "charge.succeeded";

/// Parsed webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Event id, unique per delivery-attempt group; the idempotency key.
    pub id: String,
    /// Event type (e.g. "charge.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    pub data: EventData,
}

/// Event payload wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event describes; shape varies by event type.
    pub object: serde_json::Value,
}

/// Which charge field is authoritative for the payee account.
///
/// The processor exposes several candidate fields; exactly one is chosen by
/// configuration and the others are unsupported. There is deliberately no
/// fallback chain between them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationField {
    /// The charge's direct destination (`destination_account_id`).
    #[default]
    DestinationAccount,
    /// The charge's `on_behalf_of` account.
    OnBehalfOf,
    /// The destination inside `transfer_data`.
    TransferData,
}

impl DestinationField {
    /// Parse from a configuration string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "destination_account" | "destination_account_id" => Some(Self::DestinationAccount),
            "on_behalf_of" => Some(Self::OnBehalfOf),
            "transfer_data" => Some(Self::TransferData),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DestinationAccount => "destination_account",
            Self::OnBehalfOf => "on_behalf_of",
            Self::TransferData => "transfer_data",
        }
    }
}

impl std::fmt::Display for DestinationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A successful charge extracted from an event.
///
/// Ephemeral: derived from the inbound event, never separately persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    /// Amount in integer minor currency units.
    pub amount_minor: i64,
    /// ISO currency code as sent by the processor.
    pub currency: String,
    /// Destination connected account, when the charge names one.
    pub destination: Option<String>,
}

impl WebhookEnvelope {
    /// Parse the verified payload bytes into an envelope.
    ///
    /// # Errors
    /// Returns `MalformedPayload` when the body is not JSON or required
    /// envelope fields are absent.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            WebhookError::MalformedPayload {
                message: e.to_string(),
            }
        })
    }

    /// Extract the charge from a `charge.succeeded` event.
    ///
    /// # Errors
    /// Returns `MalformedPayload` when the charge object is missing its
    /// amount or currency, or the amount is negative.
    pub fn charge(&self, field: DestinationField) -> Result<Charge, WebhookError> {
        let object = self
            .data
            .object
            .as_object()
            .ok_or_else(|| WebhookError::MalformedPayload {
                message: "event data object is not a JSON object".to_string(),
            })?;

        let amount_minor = object
            .get("amount")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| WebhookError::MalformedPayload {
                message: "missing charge amount".to_string(),
            })?;
        if amount_minor < 0 {
            return Err(WebhookError::MalformedPayload {
                message: "negative charge amount".to_string(),
            });
        }

        let currency = object
            .get("currency")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WebhookError::MalformedPayload {
                message: "missing charge currency".to_string(),
            })?
            .to_string();

        let destination = match field {
            DestinationField::DestinationAccount => object
                .get("destination_account_id")
                .and_then(|v| v.as_str())
                .map(String::from),
            DestinationField::OnBehalfOf => object
                .get("on_behalf_of")
                .and_then(|v| v.as_str())
                .map(String::from),
            DestinationField::TransferData => object
                .get("transfer_data")
                .and_then(|v| v.get("destination"))
                .and_then(|v| v.as_str())
                .map(String::from),
        };

        Ok(Charge {
            amount_minor,
            currency,
            destination,
        })
    }
}
