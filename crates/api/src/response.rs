//! Shared response envelope types for API handlers.
//!
//! Resource-style responses use a `{ "data": ... }` envelope. The restore
//! endpoint's response shape is fixed by its browser contract and is the
//! one deliberate exception.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
