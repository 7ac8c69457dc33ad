//! Restoration row model.

use serde::Serialize;
use sqlx::FromRow;

use photolift_core::types::{DbId, Timestamp};

/// One committed consumption of a credit. A row exists iff the ledger
/// commit succeeded; rollback deletes it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Restoration {
    pub id: DbId,
    pub user_id: DbId,
    /// Opaque client-supplied annotation, never a storage path.
    pub original_label: String,
    /// Output locator returned by the inference provider.
    pub output_reference: String,
    pub used_free_credit: bool,
    pub created_at: Timestamp,
}
