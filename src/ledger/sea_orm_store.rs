//! SeaORM-backed ledger storage.
//!
//! Production persistence for oracle earnings. The dedupe marker and the
//! account totals commit in one database transaction: the event-id insert
//! (`ON CONFLICT DO NOTHING`) is the idempotency gate, and the totals move
//! via an in-SQL additive `UPDATE` so racing writers for the same account
//! serialize on the row lock instead of losing updates.

use async_trait::async_trait;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, TryInsertResult,
};

use super::store::{ApplyOutcome, LedgerCredit, LedgerEntry, LedgerStore};
use crate::error::Result;
use crate::SibylError;

// =============================================================================
// SeaORM Entities
// =============================================================================

mod entity {
    use sea_orm::entity::prelude::*;

    // -------------------------------------------------------------------------
    // Oracle Ledger Entity
    // -------------------------------------------------------------------------
    pub mod oracle_ledger {
        use super::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "oracle_ledger")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub account_id: String,
            pub display_name: String,
            pub earned_minor: i64,
            pub platform_cut_minor: i64,
            pub first_seen_at: i64,
            pub updated_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    // -------------------------------------------------------------------------
    // Processed Webhook Event Entity
    // -------------------------------------------------------------------------
    pub mod processed_webhook_event {
        use super::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "processed_webhook_events")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub event_id: String,
            pub processed_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::{oracle_ledger, processed_webhook_event};

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Convert i64 timestamps from the database to the u64 the entry exposes.
#[inline]
fn i64_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn model_to_entry(model: oracle_ledger::Model) -> LedgerEntry {
    LedgerEntry {
        account_id: model.account_id,
        display_name: model.display_name,
        earned_minor: model.earned_minor,
        platform_cut_minor: model.platform_cut_minor,
        first_seen_at: i64_to_u64(model.first_seen_at),
        updated_at: i64_to_u64(model.updated_at),
    }
}

/// SeaORM-backed ledger store implementing the [`LedgerStore`] trait.
#[derive(Clone, Debug)]
pub struct SeaOrmLedgerStore {
    db: DatabaseConnection,
}

impl SeaOrmLedgerStore {
    /// Create a new SeaORM ledger store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.db
            .execute_unprepared(
                "CREATE TABLE IF NOT EXISTS oracle_ledger (
                    account_id TEXT PRIMARY KEY,
                    display_name TEXT NOT NULL,
                    earned_minor BIGINT NOT NULL DEFAULT 0,
                    platform_cut_minor BIGINT NOT NULL DEFAULT 0,
                    first_seen_at BIGINT NOT NULL,
                    updated_at BIGINT NOT NULL
                )",
            )
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        self.db
            .execute_unprepared(
                "CREATE TABLE IF NOT EXISTS processed_webhook_events (
                    event_id TEXT PRIMARY KEY,
                    processed_at BIGINT NOT NULL
                )",
            )
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore {
    async fn apply(&self, credit: LedgerCredit) -> Result<ApplyOutcome> {
        tracing::debug!(
            event_id = %credit.event_id,
            account_id = %credit.account_id,
            "applying ledger credit"
        );

        let now = unix_now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        // The dedupe gate. A concurrent transaction inserting the same event
        // id blocks on the primary key until the first commits, then lands in
        // the conflict arm.
        let marker = processed_webhook_event::ActiveModel {
            event_id: Set(credit.event_id.clone()),
            processed_at: Set(now),
        };
        let inserted = processed_webhook_event::Entity::insert(marker)
            .on_conflict(
                OnConflict::column(processed_webhook_event::Column::EventId)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&txn)
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        if matches!(inserted, TryInsertResult::Conflicted) {
            txn.rollback()
                .await
                .map_err(|e| SibylError::Database(e.to_string()))?;
            tracing::debug!(event_id = %credit.event_id, "event already applied");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        // Lazy bootstrap: first charge for an account creates its entry at
        // zero. The conflict arm keeps an existing entry (and its name).
        let blank = oracle_ledger::ActiveModel {
            account_id: Set(credit.account_id.clone()),
            display_name: Set(credit.display_name.clone()),
            earned_minor: Set(0),
            platform_cut_minor: Set(0),
            first_seen_at: Set(now),
            updated_at: Set(now),
        };
        oracle_ledger::Entity::insert(blank)
            .on_conflict(
                OnConflict::column(oracle_ledger::Column::AccountId)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&txn)
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        // Additive update in SQL, not read-modify-write in Rust: the row lock
        // serializes same-account writers.
        oracle_ledger::Entity::update_many()
            .col_expr(
                oracle_ledger::Column::EarnedMinor,
                Expr::col(oracle_ledger::Column::EarnedMinor).add(credit.earned_delta_minor),
            )
            .col_expr(
                oracle_ledger::Column::PlatformCutMinor,
                Expr::col(oracle_ledger::Column::PlatformCutMinor)
                    .add(credit.platform_cut_delta_minor),
            )
            .col_expr(oracle_ledger::Column::UpdatedAt, Expr::value(now))
            .filter(oracle_ledger::Column::AccountId.eq(&credit.account_id))
            .exec(&txn)
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        tracing::info!(
            event_id = %credit.event_id,
            account_id = %credit.account_id,
            earned_delta_minor = credit.earned_delta_minor,
            platform_cut_delta_minor = credit.platform_cut_delta_minor,
            "ledger credit applied"
        );

        Ok(ApplyOutcome::Applied)
    }

    async fn get(&self, account_id: &str) -> Result<Option<LedgerEntry>> {
        let model = oracle_ledger::Entity::find_by_id(account_id)
            .one(&self.db)
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        Ok(model.map(model_to_entry))
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>> {
        let models = oracle_ledger::Entity::find()
            .order_by_asc(oracle_ledger::Column::AccountId)
            .all(&self.db)
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        Ok(models.into_iter().map(model_to_entry).collect())
    }

    async fn is_event_processed(&self, event_id: &str) -> Result<bool> {
        let event = processed_webhook_event::Entity::find_by_id(event_id)
            .one(&self.db)
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        Ok(event.is_some())
    }

    async fn cleanup_old_events(&self, older_than_days: u32) -> Result<usize> {
        let cutoff = unix_now() - i64::from(older_than_days) * 86_400;

        let result = processed_webhook_event::Entity::delete_many()
            .filter(processed_webhook_event::Column::ProcessedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(|e| SibylError::Database(e.to_string()))?;

        Ok(result.rows_affected as usize)
    }
}
