//! Restoration orchestrator.
//!
//! Coordinates one restoration request end to end:
//!
//! ```text
//! Received -> Admitted -> CreditChecked -> JobSubmitted -> JobPolling
//!                                              -> { Committed, Failed }
//! ```
//!
//! The ledger is untouched between the credit check and the post-success
//! commit: no lock is held across the slow third-party call, and the
//! commit re-validates pool capacity itself. The credit is charged for a
//! delivered result, never for an attempt. Once the commit has happened,
//! any later failure runs the compensating rollback so the user is not
//! charged for a restoration they never received.

use std::sync::Arc;
use std::time::Duration;

use photolift_core::admission::{AdmissionControl, AdmissionDecision, FreeCreditMarker};
use photolift_core::credits::UtcDay;
use photolift_core::jobs::{JobHandle, JobStatus, RestorationJobs};
use photolift_core::ledger::{CreditLedger, LedgerError};
use photolift_core::types::DbId;

use crate::error::AppError;

/// Delay between job status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Hard ceiling on polling attempts (60 x 1s = 60-second ceiling). This is
/// the only cancellation mechanism; there is no user-initiated cancel.
pub const MAX_POLL_ATTEMPTS: u32 = 60;

/// Result of a committed restoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub restoration_id: DbId,
    pub restored_image_url: String,
    pub used_free_credit: bool,
    pub remaining_paid_credits: i32,
}

/// Terminal failure of a restoration request.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("No credits available")]
    NoCredits,

    /// Inference failed or was cancelled; the provider's message is safe
    /// to relay. No charge was incurred.
    #[error("{0}")]
    JobFailed(String),

    #[error("Restoration timed out")]
    JobTimedOut,

    /// The ledger commit (or a rollback-triggering follow-up) errored.
    #[error("Ledger failure: {0}")]
    Ledger(String),

    /// A post-commit step failed; the commit was compensated.
    #[error("Restoration could not be finalized: {0}")]
    Finalize(String),
}

impl From<RestoreError> for AppError {
    fn from(err: RestoreError) -> Self {
        match err {
            RestoreError::RateLimited { retry_after_secs } => {
                AppError::RateLimited { retry_after_secs }
            }
            RestoreError::NoCredits => AppError::InsufficientCredits,
            RestoreError::JobFailed(msg) => AppError::UpstreamJob(msg),
            RestoreError::JobTimedOut => {
                AppError::UpstreamJob("Restoration timed out. Please try again".to_string())
            }
            RestoreError::Ledger(msg) => AppError::Ledger(msg),
            RestoreError::Finalize(msg) => AppError::InternalError(msg),
        }
    }
}

/// Drives the restoration state machine over injected clients.
pub struct RestoreOrchestrator {
    ledger: Arc<dyn CreditLedger>,
    jobs: Arc<dyn RestorationJobs>,
    admission: Arc<dyn AdmissionControl>,
    free_credits: Arc<dyn FreeCreditMarker>,
    poll_interval: Duration,
}

impl RestoreOrchestrator {
    pub fn new(
        ledger: Arc<dyn CreditLedger>,
        jobs: Arc<dyn RestorationJobs>,
        admission: Arc<dyn AdmissionControl>,
        free_credits: Arc<dyn FreeCreditMarker>,
    ) -> Self {
        Self {
            ledger,
            jobs,
            admission,
            free_credits,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the polling interval (tests use `Duration::ZERO`).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run one restoration request to a terminal state.
    pub async fn run(
        &self,
        auth_id: &str,
        image: &[u8],
        content_type: &str,
        label: &str,
    ) -> Result<RestoreOutcome, RestoreError> {
        // Received -> Admitted
        match self.admission.check(auth_id).await {
            AdmissionDecision::Allowed => {}
            AdmissionDecision::Denied { retry_after_secs } => {
                return Err(RestoreError::RateLimited { retry_after_secs });
            }
            AdmissionDecision::Unavailable => {
                tracing::warn!(auth_id, "Admission controller unavailable; failing open");
            }
        }

        // Admitted -> CreditChecked. No job submission for a request that
        // could never be charged.
        let state = match self.ledger.check_credits(auth_id).await {
            Ok(state) => state,
            Err(LedgerError::UserNotFound(_)) => return Err(RestoreError::NoCredits),
            Err(e) => return Err(RestoreError::Ledger(e.to_string())),
        };
        if !state.has_credits {
            return Err(RestoreError::NoCredits);
        }
        let use_free_credit = state.should_use_free;

        // CreditChecked -> JobSubmitted
        let handle = self
            .jobs
            .submit(image, content_type)
            .await
            .map_err(|e| RestoreError::JobFailed(e.to_string()))?;

        tracing::info!(auth_id, job_id = %handle.id, use_free_credit, "Restoration job submitted");

        // JobSubmitted -> JobPolling -> terminal
        let output_url = self.poll_to_completion(&handle).await?;

        // Commit. Failure here fails the whole request even though the
        // inference succeeded: no output without a successful debit.
        let receipt = self
            .ledger
            .commit_restoration(auth_id, label, &output_url, use_free_credit)
            .await
            .map_err(|e| match e {
                LedgerError::InsufficientCredits | LedgerError::UserNotFound(_) => {
                    RestoreError::NoCredits
                }
                LedgerError::Unavailable(msg) => RestoreError::Ledger(msg),
            })?;

        tracing::info!(
            auth_id,
            restoration_id = receipt.restoration_id,
            remaining = receipt.remaining_paid_credits,
            "Restoration committed",
        );

        // Committed: the restoration id is recorded; any failure from here
        // on compensates via rollback.
        if let Err(err) = self.finalize(auth_id, use_free_credit).await {
            self.compensate(receipt.restoration_id).await;
            return Err(err);
        }

        Ok(RestoreOutcome {
            restoration_id: receipt.restoration_id,
            restored_image_url: output_url,
            used_free_credit: use_free_credit,
            remaining_paid_credits: receipt.remaining_paid_credits,
        })
    }

    /// Poll the job to a terminal status, bounded by [`MAX_POLL_ATTEMPTS`].
    async fn poll_to_completion(&self, handle: &JobHandle) -> Result<String, RestoreError> {
        for attempt in 1..=MAX_POLL_ATTEMPTS {
            match self.jobs.status(handle).await {
                Ok(JobStatus::Succeeded { output_url }) => return Ok(output_url),
                Ok(JobStatus::Failed { message }) => return Err(RestoreError::JobFailed(message)),
                Ok(JobStatus::Canceled) => {
                    return Err(RestoreError::JobFailed(
                        "Restoration was cancelled".to_string(),
                    ));
                }
                Ok(JobStatus::Queued | JobStatus::Running) => {
                    tracing::debug!(job_id = %handle.id, attempt, "Restoration job still running");
                }
                Err(e) => return Err(RestoreError::JobFailed(e.to_string())),
            }

            if attempt < MAX_POLL_ATTEMPTS {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        Err(RestoreError::JobTimedOut)
    }

    /// Post-commit side effects. A free-pool commit marks today's free
    /// credit as used so a second free use the same UTC day is denied.
    async fn finalize(&self, auth_id: &str, use_free_credit: bool) -> Result<(), RestoreError> {
        if use_free_credit {
            self.free_credits
                .mark_used(auth_id, UtcDay::today())
                .await
                .map_err(|e| RestoreError::Finalize(e.to_string()))?;
        }
        Ok(())
    }

    /// Compensating rollback for a failure after commit. Best-effort: a
    /// rollback that itself fails is logged, never escalated.
    async fn compensate(&self, restoration_id: DbId) {
        match self.ledger.rollback_restoration(restoration_id).await {
            Ok(true) => {
                tracing::warn!(restoration_id, "Rolled back restoration after post-commit failure");
            }
            Ok(false) => {
                tracing::warn!(restoration_id, "Rollback found no restoration to undo");
            }
            Err(e) => {
                tracing::error!(restoration_id, error = %e, "Rollback failed");
            }
        }
    }
}
