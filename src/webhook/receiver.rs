//! Webhook receiver: verification, routing, and exactly-once crediting.

use std::sync::Arc;

use super::event::{DestinationField, WebhookEnvelope, CHARGE_SUCCEEDED};
use super::signature::SignatureVerifier;
use super::WebhookError;
use crate::ledger::{ApplyOutcome, FeePolicy, LedgerCredit, LedgerStore};
use crate::resolver::AccountResolver;

/// Outcome of processing one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A charge was credited to the ledger.
    Applied,
    /// The event id had already been committed (idempotent redelivery).
    AlreadyApplied,
    /// The event is not oracle income; acknowledged without mutation.
    Ignored,
}

/// Receives processor deliveries and applies them to the ledger exactly once.
///
/// Each delivery runs verify -> parse -> resolve -> fee split -> atomic
/// apply. Name resolution completes before the commit so the critical section
/// is pure data mutation.
pub struct WebhookReceiver {
    verifier: SignatureVerifier,
    store: Arc<dyn LedgerStore>,
    resolver: AccountResolver,
    fee_policy: FeePolicy,
    destination_field: DestinationField,
}

impl WebhookReceiver {
    #[must_use]
    pub fn new(
        verifier: SignatureVerifier,
        store: Arc<dyn LedgerStore>,
        resolver: AccountResolver,
        fee_policy: FeePolicy,
        destination_field: DestinationField,
    ) -> Self {
        Self {
            verifier,
            store,
            resolver,
            fee_policy,
            destination_field,
        }
    }

    /// Process one raw delivery.
    ///
    /// `payload` must be the request body byte-exact as received; the
    /// signature covers the raw bytes, not a re-serialized form.
    ///
    /// # Errors
    /// Authentication and payload errors reject the delivery without any
    /// mutation. A persistence error means the commit did not happen; the
    /// caller must respond non-success so the processor redelivers.
    pub async fn receive(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        self.verifier.verify(payload, signature_header)?;

        let event = WebhookEnvelope::parse(payload)?;

        if event.event_type != CHARGE_SUCCEEDED {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Ignoring unsupported event type"
            );
            return Ok(WebhookOutcome::Ignored);
        }

        let charge = event.charge(self.destination_field)?;

        let Some(account_id) = charge.destination else {
            // No connected-account recipient: not oracle income.
            tracing::debug!(event_id = %event.id, "Charge has no destination account");
            return Ok(WebhookOutcome::Ignored);
        };

        let display_name = self.resolver.resolve(&account_id).await;
        let split = self.fee_policy.split(charge.amount_minor);

        let outcome = self
            .store
            .apply(LedgerCredit {
                event_id: event.id.clone(),
                account_id: account_id.clone(),
                display_name,
                earned_delta_minor: split.earned_minor,
                platform_cut_delta_minor: split.platform_cut_minor,
            })
            .await
            .map_err(|e| WebhookError::Persistence {
                message: e.to_string(),
            })?;

        match outcome {
            ApplyOutcome::Applied => {
                tracing::info!(
                    event_id = %event.id,
                    account_id = %account_id,
                    amount_minor = charge.amount_minor,
                    currency = %charge.currency,
                    "Charge credited"
                );
                Ok(WebhookOutcome::Applied)
            }
            ApplyOutcome::AlreadyApplied => {
                tracing::debug!(event_id = %event.id, "Duplicate delivery skipped");
                Ok(WebhookOutcome::AlreadyApplied)
            }
        }
    }

    /// Read access to the backing store (dashboard surface).
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }
}
