//! User row model.
//!
//! Identity fields (`auth_id`, `email`) are written by the identity-sync
//! webhook; `paid_credits` is mutated only by the ledger and reconciliation
//! repositories.

use serde::Serialize;
use sqlx::FromRow;

use photolift_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    /// External auth identifier (stable, immutable).
    pub auth_id: String,
    pub email: Option<String>,
    /// Non-negative; enforced by a CHECK constraint.
    pub paid_credits: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
