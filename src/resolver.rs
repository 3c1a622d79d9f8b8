//! Connected-account name resolution.
//!
//! Looks up a display name for a connected account through the processor's
//! account-information API. Resolution is best-effort: any failure falls back
//! to a deterministic placeholder, and the caller is never blocked or failed
//! by a lookup. Lookups happen before the ledger's atomic commit, never
//! inside it.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Account details returned by the account-information API.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AccountInfo {
    /// Display name, when the account has completed onboarding.
    #[serde(rename = "displayName", alias = "display_name")]
    pub display_name: Option<String>,
}

/// Trait for the external account-information lookup.
#[async_trait]
pub trait AccountInfoClient: Send + Sync {
    /// Fetch account details. `Ok(None)` means the account is unknown.
    async fn fetch_account(&self, account_id: &str) -> Result<Option<AccountInfo>>;
}

/// HTTP client for the account-information API.
pub struct HttpAccountInfoClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAccountInfoClient {
    /// Create a client with a bounded per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| crate::SibylError::internal(format!("Invalid account-info URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::SibylError::internal(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AccountInfoClient for HttpAccountInfoClient {
    async fn fetch_account(&self, account_id: &str) -> Result<Option<AccountInfo>> {
        let url = format!("{}/accounts/{}", self.base_url, account_id);

        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;

        let info: AccountInfo = response.json().await?;
        Ok(Some(info))
    }
}

/// Deterministic fallback name derived from the identifier's tail.
#[must_use]
pub fn placeholder_name(account_id: &str) -> String {
    let tail: String = account_id
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("Oracle {}", tail)
}

/// Resolves connected-account ids to display names, caching successes.
///
/// The cache is private, append-only, and advisory: a miss or a stale entry
/// never blocks a ledger update. Placeholders are not cached, so a failed
/// lookup retries on the next event for that account.
pub struct AccountResolver {
    client: Arc<dyn AccountInfoClient>,
    cache: RwLock<HashMap<String, String>>,
}

impl AccountResolver {
    #[must_use]
    pub fn new(client: Arc<dyn AccountInfoClient>) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a display name. Never fails; falls back to a placeholder.
    pub async fn resolve(&self, account_id: &str) -> String {
        if let Some(name) = self.cache.read().unwrap().get(account_id) {
            return name.clone();
        }

        match self.client.fetch_account(account_id).await {
            Ok(Some(AccountInfo {
                display_name: Some(name),
            })) if !name.is_empty() => {
                self.cache
                    .write()
                    .unwrap()
                    .insert(account_id.to_string(), name.clone());
                name
            }
            Ok(_) => placeholder_name(account_id),
            Err(e) => {
                tracing::warn!(
                    account_id = %account_id,
                    error = %e,
                    "Account resolution unavailable, using placeholder"
                );
                placeholder_name(account_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubClient {
        name: Option<String>,
        fail: bool,
        calls: AtomicU32,
    }

    impl StubClient {
        fn named(name: &str) -> Self {
            Self {
                name: Some(name.to_string()),
                fail: false,
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                name: None,
                fail: true,
                calls: AtomicU32::new(0),
            }
        }

        fn unknown() -> Self {
            Self {
                name: None,
                fail: false,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl AccountInfoClient for StubClient {
        async fn fetch_account(&self, _account_id: &str) -> Result<Option<AccountInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crate::SibylError::service_unavailable("account api down"));
            }
            Ok(self.name.clone().map(|n| AccountInfo {
                display_name: Some(n),
            }))
        }
    }

    #[test]
    fn test_placeholder_name_uses_tail() {
        assert_eq!(placeholder_name("acct_1GqJ7X"), "Oracle qJ7X");
        assert_eq!(placeholder_name("ab"), "Oracle ab");
    }

    #[test]
    fn test_placeholder_name_is_deterministic() {
        assert_eq!(placeholder_name("acct_123"), placeholder_name("acct_123"));
    }

    #[tokio::test]
    async fn test_resolve_success_is_cached() {
        let client = Arc::new(StubClient::named("Madame Zora"));
        let resolver = AccountResolver::new(client.clone());

        assert_eq!(resolver.resolve("acct_1").await, "Madame Zora");
        assert_eq!(resolver.resolve("acct_1").await, "Madame Zora");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_failure_falls_back_to_placeholder() {
        let client = Arc::new(StubClient::failing());
        let resolver = AccountResolver::new(client.clone());

        assert_eq!(resolver.resolve("acct_1GqJ7X").await, "Oracle qJ7X");
    }

    #[tokio::test]
    async fn test_placeholder_is_not_cached() {
        let client = Arc::new(StubClient::failing());
        let resolver = AccountResolver::new(client.clone());

        resolver.resolve("acct_1").await;
        resolver.resolve("acct_1").await;
        // Retries on every call rather than pinning the placeholder
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_account_resolves_to_placeholder() {
        let client = Arc::new(StubClient::unknown());
        let resolver = AccountResolver::new(client);

        assert_eq!(resolver.resolve("acct_ABCD").await, "Oracle ABCD");
    }
}
