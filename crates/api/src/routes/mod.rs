pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /restore                 POST  upload + restore one image (auth required)
/// /credits                 GET   derived credit state (auth required)
///
/// /webhooks/payments       POST  signed payment-completion events
/// /webhooks/identity       POST  signed identity sync events
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/restore",
            post(handlers::restore::restore)
                .layer(DefaultBodyLimit::max(handlers::restore::BODY_LIMIT_BYTES)),
        )
        .route("/credits", get(handlers::credits::get_credits))
        .route("/webhooks/payments", post(handlers::payments::payment_webhook))
        .route("/webhooks/identity", post(handlers::identity::identity_webhook))
}
