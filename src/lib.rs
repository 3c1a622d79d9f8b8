//! sibyl - oracle earnings backend
//!
//! Backend for a relationship-chat oracle product: buyers pay for readings
//! through a payment processor, independent oracles receive the money on
//! connected accounts, and this service keeps the per-oracle earnings ledger
//! fed by the processor's payment-confirmation webhooks.
//!
//! The webhook pipeline is the heart of the crate: deliveries are
//! at-least-once, unordered and sometimes concurrent duplicates, so every
//! credit commits atomically together with its event id and redelivery is
//! always safe.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sibyl::{
//!     AppContext, ConfigBuilder,
//!     ledger::{FeePolicy, InMemoryLedgerStore},
//!     payouts::{NullCheckoutLinkClient, NullOnboardingClient},
//!     resolver::{AccountResolver, HttpAccountInfoClient},
//!     webhook::{SignatureVerifier, WebhookReceiver},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     sibyl::init_tracing();
//!     let config = ConfigBuilder::new().from_env().build();
//!
//!     let store = Arc::new(InMemoryLedgerStore::new());
//!     let accounts = HttpAccountInfoClient::new(
//!         &config.account_info.base_url,
//!         std::time::Duration::from_millis(config.account_info.timeout_ms),
//!     )
//!     .unwrap();
//!
//!     let receiver = WebhookReceiver::new(
//!         SignatureVerifier::new(config.webhook.secret.clone(), config.webhook.tolerance_secs),
//!         store.clone(),
//!         AccountResolver::new(Arc::new(accounts)),
//!         FeePolicy::new(config.fees.platform_rate_bps),
//!         config.webhook.destination_field,
//!     );
//!
//!     let ctx = AppContext::new(
//!         receiver,
//!         store,
//!         Arc::new(NullOnboardingClient),
//!         Arc::new(NullCheckoutLinkClient),
//!         config.server.public_url.clone(),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind(config.server.addr().unwrap())
//!         .await
//!         .unwrap();
//!     axum::serve(listener, sibyl::router(ctx)).await.unwrap();
//! }
//! ```

mod app;
pub mod config;
mod error;
pub mod ledger;
pub mod payouts;
pub mod reading;
pub mod resolver;
mod routes;
pub mod webhook;

// Re-exports for public API
pub use app::AppContext;
pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig};
pub use error::{Result, SibylError};
pub use ledger::{ApplyOutcome, FeePolicy, LedgerCredit, LedgerEntry, LedgerStore};
pub use routes::router;
pub use webhook::{WebhookError, WebhookOutcome, WebhookReceiver};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call this early in main(), before building the application.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "sibyl=debug")
/// - `SIBYL_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("SIBYL_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
