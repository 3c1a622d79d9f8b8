//! Earnings ledger for connected oracle accounts.
//!
//! Splits each confirmed charge into payee earnings and a platform cut and
//! applies the result exactly once per webhook event, no matter how many
//! times the payment processor redelivers it.

pub mod fee;
#[cfg(feature = "database")]
pub mod sea_orm_store;
pub mod store;

pub use fee::{format_minor_units, FeePolicy, FeeSplit, DEFAULT_PLATFORM_RATE_BPS};
#[cfg(feature = "database")]
pub use sea_orm_store::SeaOrmLedgerStore;
pub use store::{ApplyOutcome, InMemoryLedgerStore, LedgerCredit, LedgerEntry, LedgerStore};
