//! Durable ledger store tests against in-memory SQLite.

#![cfg(feature = "database")]

use sea_orm::{ConnectOptions, Database};

use sibyl::ledger::{ApplyOutcome, LedgerCredit, LedgerStore, SeaOrmLedgerStore};

async fn store() -> SeaOrmLedgerStore {
    // Shared cache so every pooled connection sees the same in-memory
    // database; a single connection keeps sqlite's table locking out of the
    // concurrency tests.
    let mut opts = ConnectOptions::new("sqlite::memory:?mode=rwc&cache=shared");
    opts.max_connections(1);
    let db = Database::connect(opts)
        .await
        .expect("Failed to open in-memory sqlite");
    let store = SeaOrmLedgerStore::new(db);
    store.ensure_schema().await.expect("Failed to create schema");
    store
}

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
    let store = store().await;

    assert!(store.get("acct_A").await.unwrap().is_none());
    assert!(!store.is_event_processed("evt_1").await.unwrap());

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
    let store = store().await;

    store.apply(credit("evt_1", "acct_A", 250, 25)).await.unwrap();
    let outcome = store.apply(credit("evt_1", "acct_A", 250, 25)).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::AlreadyApplied);

    let entry = store.get("acct_A").await.unwrap().unwrap();
    assert_eq!(entry.earned_minor, 250);
    assert_eq!(entry.platform_cut_minor, 25);
}

#[tokio::test]
async fn test_distinct_events_accumulate() {
    let store = store().await;

    store.apply(credit("evt_1", "acct_A", 250, 25)).await.unwrap();
    store.apply(credit("evt_2", "acct_A", 333, 33)).await.unwrap();

    let entry = store.get("acct_A").await.unwrap().unwrap();
    assert_eq!(entry.earned_minor, 583);
    assert_eq!(entry.platform_cut_minor, 58);
}

#[tokio::test]
async fn test_entry_name_set_by_first_credit_only() {
    let store = store().await;

    store.apply(credit("evt_1", "acct_A", 100, 10)).await.unwrap();

    let mut second = credit("evt_2", "acct_A", 100, 10);
    second.display_name = "Renamed".to_string();
    store.apply(second).await.unwrap();

    let entry = store.get("acct_A").await.unwrap().unwrap();
    assert_eq!(entry.display_name, "Oracle acct_A");
}

#[tokio::test]
async fn test_list_orders_by_account() {
    let store = store().await;

    store.apply(credit("evt_1", "acct_B", 100, 10)).await.unwrap();
    store.apply(credit("evt_2", "acct_A", 200, 20)).await.unwrap();

    let entries = store.list().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].account_id, "acct_A");
    assert_eq!(entries[1].account_id, "acct_B");
}

#[tokio::test]
async fn test_concurrent_duplicate_deliveries_apply_once() {
    let store = store().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
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
async fn test_cleanup_removes_only_old_markers() {
    let store = store().await;

    store.apply(credit("evt_1", "acct_A", 100, 10)).await.unwrap();

    // Nothing is older than a day yet
    assert_eq!(store.cleanup_old_events(1).await.unwrap(), 0);
    assert!(store.is_event_processed("evt_1").await.unwrap());

    // Zero-day cutoff treats everything up to now as expired
    let removed = store.cleanup_old_events(0).await.unwrap();
    assert!(removed <= 1);
}
