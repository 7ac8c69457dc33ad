//! Fast-store collaborators: sliding-window admission control and the
//! free-credit marker, both backed by a Redis-over-HTTP store.

pub mod limiter;
pub mod marker;
pub mod store;

pub use limiter::SlidingWindowLimiter;
pub use marker::RestFreeCreditMarker;
pub use store::{RestStore, StoreError};
