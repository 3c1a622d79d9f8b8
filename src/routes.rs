//! HTTP surface of the service.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::AppContext;
use crate::error::{Result, SibylError};
use crate::ledger::{format_minor_units, LedgerEntry};

/// Header carrying the payment processor's signature over the raw body.
const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Build the application router.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/oracles", get(list_oracles))
        .route("/oracles/:account_id", get(get_oracle))
        .route("/connect/onboard", get(start_onboarding))
        .route("/connect/complete", get(onboarding_complete))
        .route("/readings/checkout", post(create_reading_checkout))
        .route("/health", get(health))
        .with_state(ctx)
}

/// Inbound payment-confirmation deliveries.
///
/// The body is consumed as raw bytes: the signature is computed over the
/// bytes as received, so the payload must never be re-serialized before
/// verification. Applied, duplicate and irrelevant events all acknowledge
/// with 200; a failed commit surfaces as a 5xx so the processor redelivers.
async fn handle_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| SibylError::bad_request("Missing signature header"))?;

    ctx.receiver.receive(&body, signature).await?;

    Ok(Json(json!({ "status": "success" })))
}

/// Dashboard projection of a ledger entry, amounts as 2-decimal strings.
#[derive(Debug, Serialize)]
struct OracleSummary {
    account_id: String,
    display_name: String,
    earned: String,
    platform_cut: String,
}

impl From<LedgerEntry> for OracleSummary {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            account_id: entry.account_id,
            display_name: entry.display_name,
            earned: format_minor_units(entry.earned_minor),
            platform_cut: format_minor_units(entry.platform_cut_minor),
        }
    }
}

async fn list_oracles(State(ctx): State<AppContext>) -> Result<Json<Vec<OracleSummary>>> {
    let entries = ctx.ledger.list().await?;
    Ok(Json(entries.into_iter().map(OracleSummary::from).collect()))
}

async fn get_oracle(
    State(ctx): State<AppContext>,
    Path(account_id): Path<String>,
) -> Result<Json<OracleSummary>> {
    let entry = ctx
        .ledger
        .get(&account_id)
        .await?
        .ok_or_else(|| SibylError::not_found(format!("No oracle ledger entry: {}", account_id)))?;
    Ok(Json(entry.into()))
}

/// Start connected-account onboarding and redirect to the hosted flow.
async fn start_onboarding(State(ctx): State<AppContext>) -> Result<Redirect> {
    let refresh_url = ctx.public_url.clone();
    let return_url = format!("{}/connect/complete", ctx.public_url);

    let link = ctx
        .onboarding
        .create_onboarding_link(&refresh_url, &return_url)
        .await?;

    tracing::info!(account_id = %link.account_id, "Started oracle onboarding");
    Ok(Redirect::to(&link.url))
}

async fn onboarding_complete() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "You're now an oracle! You can receive payments."
    }))
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    account_id: String,
    amount_minor: i64,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

/// Create a checkout link routing a reading fee to an oracle.
async fn create_reading_checkout(
    State(ctx): State<AppContext>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Value>> {
    if request.amount_minor <= 0 {
        return Err(SibylError::bad_request("Amount must be positive"));
    }
    if request.account_id.is_empty() {
        return Err(SibylError::bad_request("Missing account id"));
    }

    let url = ctx
        .checkout
        .create_reading_checkout(&request.account_id, request.amount_minor, &request.currency)
        .await?;

    Ok(Json(json!({ "url": url })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_summary_formats_amounts() {
        let summary = OracleSummary::from(LedgerEntry {
            account_id: "acct_A".to_string(),
            display_name: "Madame Zora".to_string(),
            earned_minor: 583,
            platform_cut_minor: 58,
            first_seen_at: 0,
            updated_at: 0,
        });

        assert_eq!(summary.earned, "5.83");
        assert_eq!(summary.platform_cut, "0.58");
    }
}
