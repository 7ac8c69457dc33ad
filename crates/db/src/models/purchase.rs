//! Purchase row model and reconciliation input.

use serde::Serialize;
use sqlx::FromRow;

use photolift_core::types::{DbId, Timestamp};

/// One reconciled payment. Never mutated or deleted by normal operation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Purchase {
    pub id: DbId,
    pub user_id: DbId,
    /// Provider payment id; unique across all purchases (idempotency key).
    pub external_payment_id: String,
    pub credits_purchased: i32,
    /// Amount charged, in minor units.
    pub amount_paid: i64,
    pub package_type: String,
    pub created_at: Timestamp,
}

/// Input for applying a verified payment to the ledger.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub external_payment_id: String,
    pub credits_purchased: i32,
    pub amount_paid: i64,
    pub package_type: String,
}
