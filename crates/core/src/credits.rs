//! Credit pool policy: deriving a point-in-time [`CreditState`] from the
//! durable paid balance and the ephemeral free-daily marker.
//!
//! The two pools have separate authorities: `paid_credits` lives in the
//! ledger database and is strongly consistent; the free-daily marker lives
//! in the fast store keyed by `(user, UTC day)` and may occasionally under-
//! or over-restrict around UTC midnight without ever touching the paid
//! invariant.

use serde::Serialize;

/// Policy: when both pools are available, the free credit is consumed first.
///
/// A point-in-time answer to "can this user restore right now, and from
/// which pool". Computed by the ledger's credit check; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditState {
    /// The user's current paid balance.
    pub paid_credits: i32,
    /// `paid_credits > 0`.
    pub has_paid_credits: bool,
    /// Today's free credit has not been consumed (per the marker store).
    pub has_free_daily_credit: bool,
    /// Which pool a restoration should draw from.
    pub should_use_free: bool,
    /// At least one pool is available.
    pub has_credits: bool,
}

/// Derive a [`CreditState`] from the paid balance and free-marker answer.
pub fn derive_credit_state(paid_credits: i32, free_available: bool) -> CreditState {
    let has_paid_credits = paid_credits > 0;
    CreditState {
        paid_credits,
        has_paid_credits,
        has_free_daily_credit: free_available,
        should_use_free: free_available,
        has_credits: has_paid_credits || free_available,
    }
}

/// A UTC calendar day, used as the free-credit marker key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcDay(chrono::NaiveDate);

impl UtcDay {
    /// The current UTC day.
    pub fn today() -> Self {
        Self(chrono::Utc::now().date_naive())
    }

    /// Build from an explicit date (tests, backfills).
    pub fn from_date(date: chrono::NaiveDate) -> Self {
        Self(date)
    }

    /// Compact `YYYYMMDD` form used in marker keys.
    pub fn key(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

/// Free-credit marker key for a user on a given day.
pub fn free_marker_key(auth_id: &str, day: UtcDay) -> String {
    format!("free:{}:{}", auth_id, day.key())
}
