//! Free-credit marker over the fast store.
//!
//! A `(user, UTC day)` key whose existence means "today's free credit is
//! spent". The 48-hour TTL outlives the day it marks; expiry does the
//! cleanup.

use async_trait::async_trait;

use photolift_core::admission::{FreeCreditMarker, MarkerError};
use photolift_core::credits::{free_marker_key, UtcDay};

use crate::store::RestStore;

/// Marker TTL: comfortably past the UTC day the key encodes.
const MARKER_TTL_SECS: u64 = 48 * 60 * 60;

/// Fast-store-backed free-credit marker.
pub struct RestFreeCreditMarker {
    store: Option<RestStore>,
}

impl RestFreeCreditMarker {
    pub fn new(store: RestStore) -> Self {
        Self { store: Some(store) }
    }

    /// Marker with no backend; reads and writes report `Unavailable`,
    /// which disables the free pool without touching the paid one.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    fn store(&self) -> Result<&RestStore, MarkerError> {
        self.store
            .as_ref()
            .ok_or_else(|| MarkerError::Unavailable("no fast store configured".to_string()))
    }
}

#[async_trait]
impl FreeCreditMarker for RestFreeCreditMarker {
    async fn is_used(&self, auth_id: &str, day: UtcDay) -> Result<bool, MarkerError> {
        self.store()?
            .exists(&free_marker_key(auth_id, day))
            .await
            .map_err(|e| MarkerError::Unavailable(e.to_string()))
    }

    async fn mark_used(&self, auth_id: &str, day: UtcDay) -> Result<(), MarkerError> {
        self.store()?
            .set_nx_ex(&free_marker_key(auth_id, day), "1", MARKER_TTL_SECS)
            .await
            .map_err(|e| MarkerError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
