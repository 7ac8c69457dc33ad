//! Handler for `POST /api/v1/webhooks/payments`: the payment
//! reconciliation processor.
//!
//! Transport-level problems (missing/invalid signature, missing secret)
//! are real HTTP errors. Every business-logic rejection past that point is
//! a no-op-success: acknowledged with 200 and logged, so the provider's
//! at-least-once redelivery never turns a bad event into an infinite retry
//! loop. The idempotency gate lives in `PurchaseRepo::apply`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use photolift_core::payment::{verify_purchase, AmountMatch, PaymentTotals, PurchaseIntent};
use photolift_db::models::purchase::NewPurchase;
use photolift_db::repositories::{PurchaseOutcome, PurchaseRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::webhook::verify_signature;

/// Signature header set by the payment provider.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// The only event type that credits the ledger.
const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Verified payment event envelope.
#[derive(Debug, Deserialize)]
struct PaymentEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
struct PaymentEventData {
    /// Provider payment id; the idempotency key.
    id: String,
    #[serde(default)]
    amount_subtotal: Option<i64>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    amount_discount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Option<PaymentMetadata>,
}

/// Checkout metadata; all values arrive as strings.
#[derive(Debug, Deserialize)]
struct PaymentMetadata {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    package_id: Option<String>,
    #[serde(default)]
    credits: Option<String>,
    #[serde(default)]
    price_id: Option<String>,
}

impl PaymentEventData {
    /// Structural validation of the metadata block. `None` means the event
    /// is malformed and must be acknowledged without ledger action.
    fn purchase_intent(&self) -> Option<PurchaseIntent> {
        let metadata = self.metadata.as_ref()?;
        Some(PurchaseIntent {
            user_auth_id: metadata.user_id.clone()?,
            package_id: metadata.package_id.clone()?,
            credits: metadata.credits.as_ref()?.parse().ok()?,
            price_id: metadata.price_id.clone()?,
        })
    }
}

/// POST /api/v1/webhooks/payments
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let Some(secret) = state.config.payment_webhook_secret.as_deref() else {
        // Misconfiguration, not a client error.
        return Err(AppError::InternalError(
            "Payment webhook secret is not configured".into(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    if !verify_signature(secret, &body, signature) {
        return Err(AppError::BadRequest("Invalid signature".into()));
    }

    let event: PaymentEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed payment event");
            return Ok(acknowledge());
        }
    };

    if event.event_type != CHECKOUT_COMPLETED {
        tracing::debug!(event_type = %event.event_type, "Ignoring unhandled payment event type");
        return Ok(acknowledge());
    }

    let Some(intent) = event.data.purchase_intent() else {
        tracing::warn!(payment_id = %event.data.id, "Ignoring payment event with incomplete metadata");
        return Ok(acknowledge());
    };

    let totals = PaymentTotals {
        amount_subtotal: event.data.amount_subtotal,
        amount_total: event.data.amount_total,
        amount_discount: event.data.amount_discount.unwrap_or(0),
        currency: event.data.currency.as_deref().unwrap_or(""),
    };

    let (package, matched) = match verify_purchase(&intent, totals) {
        Ok(verified) => verified,
        Err(reason) => {
            tracing::warn!(
                payment_id = %event.data.id,
                user_id = %intent.user_auth_id,
                reason = %reason,
                "Rejected payment event; acknowledging without ledger action",
            );
            return Ok(acknowledge());
        }
    };

    if matched == AmountMatch::DiscountAdjusted {
        // Unbounded-discount acceptance path; see DESIGN.md.
        tracing::warn!(
            payment_id = %event.data.id,
            discount = totals.amount_discount,
            "Payment accepted via the discount-adjusted branch",
        );
    }

    let Some(user) = UserRepo::find_by_auth_id(&state.pool, &intent.user_auth_id).await? else {
        tracing::warn!(
            payment_id = %event.data.id,
            user_id = %intent.user_auth_id,
            "Payment for unknown ledger user; acknowledging without ledger action",
        );
        return Ok(acknowledge());
    };

    let input = NewPurchase {
        external_payment_id: event.data.id.clone(),
        credits_purchased: package.credits,
        amount_paid: totals
            .amount_total
            .or(totals.amount_subtotal)
            .unwrap_or_default(),
        package_type: package.id.to_string(),
    };

    match PurchaseRepo::apply(&state.pool, user.id, &input).await? {
        PurchaseOutcome::Applied { new_balance } => {
            tracing::info!(
                payment_id = %event.data.id,
                user_id = user.id,
                credits = package.credits,
                new_balance,
                "Payment reconciled",
            );
        }
        PurchaseOutcome::Duplicate => {
            tracing::info!(
                payment_id = %event.data.id,
                "Payment already reconciled; acknowledging redelivery",
            );
        }
    }

    Ok(acknowledge())
}

fn acknowledge() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "received": true }))
}
