//! Ledger storage contract and the in-memory backend.
//!
//! The processed-event marker and the account totals commit as one atomic
//! unit: either a credit lands together with its event id, or neither does.
//! That single invariant is what makes the processor's at-least-once
//! redelivery safe to accept.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cumulative earnings record for one connected oracle account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Connected-account identifier issued by the payment processor.
    pub account_id: String,
    /// Best-effort display name; may be a deterministic placeholder.
    pub display_name: String,
    /// Cumulative payee earnings in minor units. Monotonically non-decreasing.
    pub earned_minor: i64,
    /// Cumulative platform cut in minor units, summed per charge at ingestion
    /// time. Monotonically non-decreasing; never re-derived from `earned_minor`.
    pub platform_cut_minor: i64,
    /// Unix timestamp of the first applied charge.
    pub first_seen_at: u64,
    /// Unix timestamp of the most recent applied charge.
    pub updated_at: u64,
}

/// One credit to apply: the deltas for a single verified charge event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCredit {
    /// Webhook event id; the idempotency key.
    pub event_id: String,
    /// Destination connected-account identifier.
    pub account_id: String,
    /// Resolved (or placeholder) display name, used only when the entry is
    /// created by this credit.
    pub display_name: String,
    pub earned_delta_minor: i64,
    pub platform_cut_delta_minor: i64,
}

/// Outcome of an `apply` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The credit was committed together with its event marker.
    Applied,
    /// The event id was already recorded; nothing was mutated.
    AlreadyApplied,
}

/// Durable keyed storage of per-account totals plus the processed-event set.
///
/// All mutation goes through `apply`; no caller may read-modify-write an
/// entry around it. Updates to different accounts proceed independently;
/// updates racing on the same account (including two deliveries of the same
/// event id) serialize so exactly one performs the mutation.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Atomically create-if-absent, add both deltas, and record the event id.
    async fn apply(&self, credit: LedgerCredit) -> Result<ApplyOutcome>;

    /// Read-only accessor for one entry.
    async fn get(&self, account_id: &str) -> Result<Option<LedgerEntry>>;

    /// Enumerate all entries (dashboard surface).
    async fn list(&self) -> Result<Vec<LedgerEntry>>;

    /// Check whether a webhook event has been committed.
    async fn is_event_processed(&self, event_id: &str) -> Result<bool>;

    /// Drop processed-event markers older than the given age, returning how
    /// many were removed. Markers must outlive the processor's retry window
    /// (hours to days); the default keeps everything.
    async fn cleanup_old_events(&self, _older_than_days: u32) -> Result<usize> {
        Ok(0)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// In-memory ledger store (for development/testing).
///
/// A single lock guards both the entries and the processed-event set, so the
/// marker and the totals can only move together. In production, use the
/// database-backed store.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    inner: std::sync::Arc<std::sync::RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    entries: std::collections::HashMap<String, LedgerEntry>,
    processed: std::collections::HashMap<String, u64>,
}

impl InMemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of processed event ids (for test assertions).
    pub fn processed_events(&self) -> Vec<String> {
        self.inner.read().unwrap().processed.keys().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn apply(&self, credit: LedgerCredit) -> Result<ApplyOutcome> {
        let mut inner = self.inner.write().unwrap();

        if inner.processed.contains_key(&credit.event_id) {
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let now = unix_now();
        let entry = inner
            .entries
            .entry(credit.account_id.clone())
            .or_insert_with(|| LedgerEntry {
                account_id: credit.account_id.clone(),
                display_name: credit.display_name.clone(),
                earned_minor: 0,
                platform_cut_minor: 0,
                first_seen_at: now,
                updated_at: now,
            });
        entry.earned_minor += credit.earned_delta_minor;
        entry.platform_cut_minor += credit.platform_cut_delta_minor;
        entry.updated_at = now;

        inner.processed.insert(credit.event_id, now);
        Ok(ApplyOutcome::Applied)
    }

    async fn get(&self, account_id: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.inner.read().unwrap().entries.get(account_id).cloned())
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().unwrap();
        let mut entries: Vec<LedgerEntry> = inner.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(entries)
    }

    async fn is_event_processed(&self, event_id: &str) -> Result<bool> {
        Ok(self.inner.read().unwrap().processed.contains_key(event_id))
    }

    async fn cleanup_old_events(&self, older_than_days: u32) -> Result<usize> {
        let cutoff = unix_now().saturating_sub(u64::from(older_than_days) * 86_400);
        let mut inner = self.inner.write().unwrap();
        let initial = inner.processed.len();
        inner.processed.retain(|_, &mut at| at >= cutoff);
        Ok(initial - inner.processed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credit(event_id: &str, account_id: &str, earned: i64, cut: i64) -> LedgerCredit {
        LedgerCredit {
            event_id: event_id.to_string(),
            account_id: account_id.to_string(),
            display_name: format!("Oracle {}", account_id),
            earned_delta_minor: earned,
            platform_cut_delta_minor: cut,
        }
    }

    #[tokio::test]
    async fn test_first_credit_bootstraps_entry() {
        let store = InMemoryLedgerStore::new();
        assert!(store.get("acct_A").await.unwrap().is_none());

        let outcome = store.apply(credit("evt_1", "acct_A", 250, 25)).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let entry = store.get("acct_A").await.unwrap().unwrap();
        assert_eq!(entry.earned_minor, 250);
        assert_eq!(entry.platform_cut_minor, 25);
        assert_eq!(entry.display_name, "Oracle acct_A");
        assert!(store.is_event_processed("evt_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_event_is_not_reapplied() {
        let store = InMemoryLedgerStore::new();
        store.apply(credit("evt_1", "acct_A", 250, 25)).await.unwrap();

        let outcome = store.apply(credit("evt_1", "acct_A", 250, 25)).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::AlreadyApplied);

        let entry = store.get("acct_A").await.unwrap().unwrap();
        assert_eq!(entry.earned_minor, 250);
        assert_eq!(entry.platform_cut_minor, 25);
    }

    #[tokio::test]
    async fn test_distinct_events_accumulate() {
        let store = InMemoryLedgerStore::new();
        store.apply(credit("evt_1", "acct_A", 250, 25)).await.unwrap();
        store.apply(credit("evt_2", "acct_A", 333, 33)).await.unwrap();

        let entry = store.get("acct_A").await.unwrap().unwrap();
        assert_eq!(entry.earned_minor, 583);
        assert_eq!(entry.platform_cut_minor, 58);
    }

    #[tokio::test]
    async fn test_display_name_sticks_after_creation() {
        let store = InMemoryLedgerStore::new();
        store.apply(credit("evt_1", "acct_A", 100, 10)).await.unwrap();

        let mut second = credit("evt_2", "acct_A", 100, 10);
        second.display_name = "Different Name".to_string();
        store.apply(second).await.unwrap();

        let entry = store.get("acct_A").await.unwrap().unwrap();
        assert_eq!(entry.display_name, "Oracle acct_A");
    }

    #[tokio::test]
    async fn test_accounts_are_independent() {
        let store = InMemoryLedgerStore::new();
        store.apply(credit("evt_1", "acct_A", 100, 10)).await.unwrap();
        store.apply(credit("evt_2", "acct_B", 200, 20)).await.unwrap();

        assert_eq!(store.get("acct_A").await.unwrap().unwrap().earned_minor, 100);
        assert_eq!(store.get("acct_B").await.unwrap().unwrap().earned_minor, 200);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_deliveries_apply_once() {
        let store = InMemoryLedgerStore::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.apply(credit("evt_race", "acct_A", 250, 25)).await.unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() == ApplyOutcome::Applied {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
        let entry = store.get("acct_A").await.unwrap().unwrap();
        assert_eq!(entry.earned_minor, 250);
        assert_eq!(entry.platform_cut_minor, 25);
    }

    #[tokio::test]
    async fn test_concurrent_distinct_events_all_apply() {
        let store = InMemoryLedgerStore::new();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .apply(credit(&format!("evt_{}", i), "acct_A", 100, 10))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), ApplyOutcome::Applied);
        }

        let entry = store.get("acct_A").await.unwrap().unwrap();
        assert_eq!(entry.earned_minor, 1_600);
        assert_eq!(entry.platform_cut_minor, 160);
    }
}
