//! Credit-ledger contract.
//!
//! The ledger owns all mutation of credit balances. Each operation executes
//! as one atomic unit against the durable store; the production
//! implementation (`photolift-db`) runs them as single transactions.

use crate::credits::CreditState;
use crate::types::DbId;

/// Result of a successful [`CreditLedger::commit_restoration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Id of the restoration row created by the commit.
    pub restoration_id: DbId,
    /// Paid balance after the deduction (unchanged for free-pool commits).
    pub remaining_paid_credits: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The external identity has no ledger row. Callers treat this as
    /// "no credits".
    #[error("No ledger user for identity '{0}'")]
    UserNotFound(String),

    /// The requested pool had no remaining capacity at commit time.
    #[error("Insufficient credits")]
    InsufficientCredits,

    /// The durable store itself failed; logged as a priority anomaly.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// The three ledger operations. This is the only path that decrements paid
/// credits or records a restoration.
#[async_trait::async_trait]
pub trait CreditLedger: Send + Sync {
    /// Derive the caller's [`CreditState`] from the paid balance and the
    /// free-daily marker.
    async fn check_credits(&self, auth_id: &str) -> Result<CreditState, LedgerError>;

    /// Atomically re-validate the requested pool, deduct (paid pool only),
    /// and record the restoration. Must be called only after the inference
    /// job has already delivered a result.
    async fn commit_restoration(
        &self,
        auth_id: &str,
        original_label: &str,
        output_reference: &str,
        use_free_credit: bool,
    ) -> Result<CommitReceipt, LedgerError>;

    /// Compensating action: restore a paid credit (if one was used) and
    /// remove the restoration row. Returns `false` for unknown ids;
    /// rollback is best-effort and idempotent, never a hard failure.
    async fn rollback_restoration(&self, restoration_id: DbId) -> Result<bool, LedgerError>;
}
