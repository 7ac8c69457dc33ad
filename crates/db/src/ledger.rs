//! Production [`CreditLedger`] over PostgreSQL plus the free-daily marker.
//!
//! The paid pool is authoritative in the database; the free pool is
//! authoritative in the ephemeral marker store. A marker outage disables
//! the free pool for the affected check and never touches the durable
//! balance.

use std::sync::Arc;

use async_trait::async_trait;

use photolift_core::admission::FreeCreditMarker;
use photolift_core::credits::{derive_credit_state, CreditState, UtcDay};
use photolift_core::ledger::{CommitReceipt, CreditLedger, LedgerError};
use photolift_core::types::DbId;

use crate::repositories::LedgerRepo;
use crate::DbPool;

/// sqlx-backed ledger used by the API process.
pub struct PgCreditLedger {
    pool: DbPool,
    marker: Arc<dyn FreeCreditMarker>,
}

impl PgCreditLedger {
    pub fn new(pool: DbPool, marker: Arc<dyn FreeCreditMarker>) -> Self {
        Self { pool, marker }
    }

    async fn resolve_user(&self, auth_id: &str) -> Result<(DbId, i32), LedgerError> {
        LedgerRepo::find_balance(&self.pool, auth_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| LedgerError::UserNotFound(auth_id.to_string()))
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn check_credits(&self, auth_id: &str) -> Result<CreditState, LedgerError> {
        let (user_id, paid_credits) = self.resolve_user(auth_id).await?;

        let free_available = match self.marker.is_used(auth_id, UtcDay::today()).await {
            Ok(used) => !used,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Free-credit marker unavailable; free pool disabled for this check");
                false
            }
        };

        Ok(derive_credit_state(paid_credits, free_available))
    }

    async fn commit_restoration(
        &self,
        auth_id: &str,
        original_label: &str,
        output_reference: &str,
        use_free_credit: bool,
    ) -> Result<CommitReceipt, LedgerError> {
        let (user_id, _) = self.resolve_user(auth_id).await?;

        if use_free_credit {
            // Re-validate the free pool; the paid pool re-validates inside
            // the deduction itself.
            match self.marker.is_used(auth_id, UtcDay::today()).await {
                Ok(false) => {}
                Ok(true) => return Err(LedgerError::InsufficientCredits),
                Err(e) => return Err(LedgerError::Unavailable(e.to_string())),
            }
        }

        let row = LedgerRepo::deduct_and_record(
            &self.pool,
            user_id,
            original_label,
            output_reference,
            use_free_credit,
        )
        .await
        .map_err(store_error)?
        .ok_or(LedgerError::InsufficientCredits)?;

        Ok(CommitReceipt {
            restoration_id: row.restoration_id,
            remaining_paid_credits: row.remaining_paid_credits,
        })
    }

    async fn rollback_restoration(&self, restoration_id: DbId) -> Result<bool, LedgerError> {
        LedgerRepo::rollback_restoration(&self.pool, restoration_id)
            .await
            .map_err(store_error)
    }
}

fn store_error(err: sqlx::Error) -> LedgerError {
    tracing::error!(error = %err, "Ledger database error");
    LedgerError::Unavailable(err.to_string())
}
