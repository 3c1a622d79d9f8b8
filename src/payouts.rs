//! Payment-processor collaborator seams for oracle payouts.
//!
//! Onboarding (connected-account creation plus the hosted onboarding link)
//! and paid-reading checkout links are external flows; this module defines
//! the client traits the HTTP layer talks to. Earnings crediting never
//! depends on either: the ledger entry is created lazily by the first charge
//! regardless of onboarding state.

use crate::error::Result;
use async_trait::async_trait;

/// A hosted onboarding link for a newly created connected account.
#[derive(Debug, Clone)]
pub struct OnboardingLink {
    /// Connected-account identifier issued by the processor.
    pub account_id: String,
    /// URL to redirect the prospective oracle to.
    pub url: String,
}

/// Trait for the connected-account onboarding flow.
#[async_trait]
pub trait OnboardingClient: Send + Sync {
    /// Create a connected account and a hosted onboarding link for it.
    async fn create_onboarding_link(
        &self,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<OnboardingLink>;
}

/// Trait for creating checkout links for paid readings.
#[async_trait]
pub trait CheckoutLinkClient: Send + Sync {
    /// Create a checkout session routing a reading fee to the given oracle.
    ///
    /// Returns the URL the buyer completes payment at. The resulting charge
    /// comes back to us asynchronously through the webhook.
    async fn create_reading_checkout(
        &self,
        account_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String>;
}

/// Onboarding client for deployments without the collaborator configured.
pub struct NullOnboardingClient;

#[async_trait]
impl OnboardingClient for NullOnboardingClient {
    async fn create_onboarding_link(
        &self,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<OnboardingLink> {
        Err(crate::SibylError::service_unavailable(
            "Onboarding collaborator not configured",
        ))
    }
}

/// Checkout client for deployments without the collaborator configured.
pub struct NullCheckoutLinkClient;

#[async_trait]
impl CheckoutLinkClient for NullCheckoutLinkClient {
    async fn create_reading_checkout(
        &self,
        _account_id: &str,
        _amount_minor: i64,
        _currency: &str,
    ) -> Result<String> {
        Err(crate::SibylError::service_unavailable(
            "Checkout collaborator not configured",
        ))
    }
}

/// Mock collaborator clients for testing.
#[cfg(any(test, feature = "test-clients"))]
pub mod test {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Mock onboarding client minting predictable account ids.
    #[derive(Default)]
    pub struct MockOnboardingClient {
        account_counter: AtomicU64,
    }

    impl MockOnboardingClient {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl OnboardingClient for MockOnboardingClient {
        async fn create_onboarding_link(
            &self,
            _refresh_url: &str,
            return_url: &str,
        ) -> Result<OnboardingLink> {
            let account_id = format!(
                "acct_mock_{}",
                self.account_counter.fetch_add(1, Ordering::SeqCst)
            );
            Ok(OnboardingLink {
                url: format!("https://connect.example.com/setup/{}?return={}", account_id, return_url),
                account_id,
            })
        }
    }

    /// Mock checkout client.
    #[derive(Default)]
    pub struct MockCheckoutLinkClient {
        session_counter: AtomicU64,
    }

    impl MockCheckoutLinkClient {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl CheckoutLinkClient for MockCheckoutLinkClient {
        async fn create_reading_checkout(
            &self,
            account_id: &str,
            amount_minor: i64,
            _currency: &str,
        ) -> Result<String> {
            let session = self.session_counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!(
                "https://pay.example.com/c/{}?to={}&amount={}",
                session, account_id, amount_minor
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::{MockCheckoutLinkClient, MockOnboardingClient};
    use super::*;

    #[tokio::test]
    async fn test_mock_onboarding_mints_distinct_accounts() {
        let client = MockOnboardingClient::new();
        let first = client
            .create_onboarding_link("https://app/refresh", "https://app/done")
            .await
            .unwrap();
        let second = client
            .create_onboarding_link("https://app/refresh", "https://app/done")
            .await
            .unwrap();

        assert_ne!(first.account_id, second.account_id);
        assert!(first.url.contains(&first.account_id));
    }

    #[tokio::test]
    async fn test_mock_checkout_embeds_destination() {
        let client = MockCheckoutLinkClient::new();
        let url = client
            .create_reading_checkout("acct_A", 250, "usd")
            .await
            .unwrap();
        assert!(url.contains("to=acct_A"));
        assert!(url.contains("amount=250"));
    }
}
