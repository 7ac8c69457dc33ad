//! Sliding-window admission control over the fast store.
//!
//! Counting happens in fixed buckets (`rl:{user}:{bucket}`); the decision
//! blends the previous bucket per the weighting in
//! [`photolift_core::ratelimit`]. Every backend failure collapses to
//! [`AdmissionDecision::Unavailable`] so the orchestrator can fail open.

use async_trait::async_trait;

use photolift_core::admission::{AdmissionControl, AdmissionDecision};
use photolift_core::ratelimit::{
    elapsed_in_window, is_allowed, retry_after_secs, window_bucket, WINDOW_SECS,
};

use crate::store::{RestStore, StoreError};

/// Per-user sliding-window limiter.
pub struct SlidingWindowLimiter {
    store: Option<RestStore>,
}

impl SlidingWindowLimiter {
    pub fn new(store: RestStore) -> Self {
        Self { store: Some(store) }
    }

    /// Limiter with no backend; every check reports `Unavailable`.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    async fn try_check(&self, store: &RestStore, auth_id: &str) -> Result<AdmissionDecision, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let bucket = window_bucket(now);
        let elapsed = elapsed_in_window(now);

        let current_key = format!("rl:{auth_id}:{bucket}");
        let previous_key = format!("rl:{auth_id}:{}", bucket - 1);

        let current = store.incr(&current_key).await?;
        if current == 1 {
            // Fresh bucket; keep it around long enough to serve as the
            // "previous" bucket of the next window.
            store.expire(&current_key, WINDOW_SECS * 2).await?;
        }
        let previous = store.get_i64(&previous_key).await?.unwrap_or(0);

        if is_allowed(previous.max(0) as u32, current.max(0) as u32, elapsed) {
            Ok(AdmissionDecision::Allowed)
        } else {
            Ok(AdmissionDecision::Denied {
                retry_after_secs: retry_after_secs(elapsed),
            })
        }
    }
}

#[async_trait]
impl AdmissionControl for SlidingWindowLimiter {
    async fn check(&self, auth_id: &str) -> AdmissionDecision {
        let Some(store) = &self.store else {
            return AdmissionDecision::Unavailable;
        };

        match self.try_check(store, auth_id).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, "Admission backend unavailable; failing open");
                AdmissionDecision::Unavailable
            }
        }
    }
}
