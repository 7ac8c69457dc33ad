//! Contracts for the fast-store collaborators: admission control and the
//! free-credit marker.
//!
//! Both are explicitly weaker-consistency components. Admission fails open
//! (an outage must not take down the restoration feature); the marker only
//! gates the free pool and never the durable paid balance.

use crate::credits::UtcDay;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Under the limit; proceed.
    Allowed,
    /// Over the limit for the current window.
    Denied { retry_after_secs: u64 },
    /// The limiter backend could not answer. Callers treat this as
    /// `Allowed` (fail-open).
    Unavailable,
}

/// Per-user sliding-window admission control.
#[async_trait::async_trait]
pub trait AdmissionControl: Send + Sync {
    /// Count this request against the caller's window and decide. Never
    /// errors: backend failure is [`AdmissionDecision::Unavailable`].
    async fn check(&self, auth_id: &str) -> AdmissionDecision;
}

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("Marker store unavailable: {0}")]
    Unavailable(String),
}

/// The "free credit used today" marker, keyed by `(user, UTC day)`.
#[async_trait::async_trait]
pub trait FreeCreditMarker: Send + Sync {
    /// Whether the user's free credit is already consumed for `day`.
    async fn is_used(&self, auth_id: &str, day: UtcDay) -> Result<bool, MarkerError>;

    /// Record consumption of the free credit for `day`.
    async fn mark_used(&self, auth_id: &str, day: UtcDay) -> Result<(), MarkerError>;
}
