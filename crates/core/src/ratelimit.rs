//! Sliding-window rate-limit math for the admission controller.
//!
//! Two-bucket weighted approximation: requests are counted in fixed
//! [`WINDOW_SECS`] buckets, and the effective count blends the previous
//! bucket proportionally to how much of it still overlaps the sliding
//! window. The store interaction lives in `photolift-admission`; only the
//! arithmetic is here so it can be tested without a backend.

/// Window length for admission control.
pub const WINDOW_SECS: u64 = 60;

/// Maximum restoration requests per user per window.
pub const MAX_REQUESTS_PER_WINDOW: u32 = 10;

/// Bucket index for a Unix timestamp.
pub fn window_bucket(unix_secs: i64) -> i64 {
    unix_secs.div_euclid(WINDOW_SECS as i64)
}

/// Seconds elapsed inside the current bucket.
pub fn elapsed_in_window(unix_secs: i64) -> u64 {
    unix_secs.rem_euclid(WINDOW_SECS as i64) as u64
}

/// Effective request count over the sliding window.
///
/// The previous bucket contributes `(1 - elapsed/window)` of its count; the
/// current bucket contributes fully.
pub fn weighted_count(previous: u32, current: u32, elapsed_secs: u64) -> f64 {
    let elapsed = elapsed_secs.min(WINDOW_SECS) as f64;
    let overlap = 1.0 - elapsed / WINDOW_SECS as f64;
    f64::from(previous) * overlap + f64::from(current)
}

/// Whether a request is admitted. `current` must already include the request
/// being decided (count first, then ask).
pub fn is_allowed(previous: u32, current: u32, elapsed_secs: u64) -> bool {
    weighted_count(previous, current, elapsed_secs) <= f64::from(MAX_REQUESTS_PER_WINDOW)
}

/// Seconds until the current bucket rolls over; the denial hint.
pub fn retry_after_secs(elapsed_secs: u64) -> u64 {
    WINDOW_SECS - elapsed_secs.min(WINDOW_SECS - 1)
}
