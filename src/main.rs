use std::sync::Arc;
use std::time::Duration;

use sibyl::{
    AppContext, Config, ConfigBuilder,
    ledger::{FeePolicy, InMemoryLedgerStore, LedgerStore},
    payouts::{NullCheckoutLinkClient, NullOnboardingClient},
    resolver::{AccountResolver, HttpAccountInfoClient},
    webhook::{SignatureVerifier, WebhookReceiver},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new().from_env().build();
    sibyl::init_tracing_with_config(&config);

    {
        use secrecy::ExposeSecret;
        if config.webhook.secret.expose_secret().is_empty() {
            tracing::warn!(
                "SIBYL_WEBHOOK_SECRET is not set; all webhook deliveries will be rejected"
            );
        }
    }

    let ledger = build_ledger_store(&config).await?;

    let accounts = HttpAccountInfoClient::new(
        &config.account_info.base_url,
        Duration::from_millis(config.account_info.timeout_ms),
    )?;

    let receiver = WebhookReceiver::new(
        SignatureVerifier::new(config.webhook.secret.clone(), config.webhook.tolerance_secs),
        ledger.clone(),
        AccountResolver::new(Arc::new(accounts)),
        FeePolicy::new(config.fees.platform_rate_bps),
        config.webhook.destination_field,
    );

    let ctx = AppContext::new(
        receiver,
        ledger,
        Arc::new(NullOnboardingClient),
        Arc::new(NullCheckoutLinkClient),
        config.server.public_url.clone(),
    );

    let addr = config.server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server starting on http://{}", addr);

    axum::serve(listener, sibyl::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(feature = "database")]
async fn build_ledger_store(config: &Config) -> anyhow::Result<Arc<dyn LedgerStore>> {
    use sibyl::ledger::SeaOrmLedgerStore;

    match &config.database.url {
        Some(url) => {
            let db = sea_orm::Database::connect(url.as_str()).await?;
            let store = SeaOrmLedgerStore::new(db);
            store.ensure_schema().await?;
            tracing::info!("Using database-backed ledger store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(
                "No database URL configured; using the in-memory ledger (state is lost on restart)"
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
    }
}

#[cfg(not(feature = "database"))]
async fn build_ledger_store(_config: &Config) -> anyhow::Result<Arc<dyn LedgerStore>> {
    tracing::warn!("Built without the database feature; using the in-memory ledger");
    Ok(Arc::new(InMemoryLedgerStore::new()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
