use std::sync::Arc;

use crate::ledger::LedgerStore;
use crate::payouts::{CheckoutLinkClient, OnboardingClient};
use crate::webhook::WebhookReceiver;

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub receiver: Arc<WebhookReceiver>,
    pub ledger: Arc<dyn LedgerStore>,
    pub onboarding: Arc<dyn OnboardingClient>,
    pub checkout: Arc<dyn CheckoutLinkClient>,
    /// Externally reachable base URL for onboarding redirect targets.
    pub public_url: String,
}

impl AppContext {
    #[must_use]
    pub fn new(
        receiver: WebhookReceiver,
        ledger: Arc<dyn LedgerStore>,
        onboarding: Arc<dyn OnboardingClient>,
        checkout: Arc<dyn CheckoutLinkClient>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            receiver: Arc::new(receiver),
            ledger,
            onboarding,
            checkout,
            public_url: public_url.into(),
        }
    }
}
