//! Handler for `POST /api/v1/webhooks/identity`: identity-provider sync.
//!
//! Creates, updates, and deletes ledger users from identity events.
//! Duplicate creates are idempotent successes; an update that finds no row
//! surfaces a 500 so the provider retries once the create lands.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use photolift_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::webhook::verify_signature;

/// Signature header set by the identity provider.
pub const SIGNATURE_HEADER: &str = "x-identity-signature";

#[derive(Debug, Deserialize)]
struct IdentityEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: IdentityEventData,
}

#[derive(Debug, Deserialize)]
struct IdentityEventData {
    /// The external auth identifier.
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// POST /api/v1/webhooks/identity
pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let Some(secret) = state.config.identity_webhook_secret.as_deref() else {
        return Err(AppError::InternalError(
            "Identity webhook secret is not configured".into(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    if !verify_signature(secret, &body, signature) {
        return Err(AppError::BadRequest("Invalid signature".into()));
    }

    let event: IdentityEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed identity event: {e}")))?;

    match event.event_type.as_str() {
        "user.created" => {
            let created =
                UserRepo::create(&state.pool, &event.data.id, event.data.email.as_deref()).await?;
            match created {
                Some(user) => {
                    tracing::info!(user_id = user.id, auth_id = %event.data.id, "User created");
                }
                None => {
                    tracing::info!(auth_id = %event.data.id, "User already exists; create is a no-op");
                }
            }
        }
        "user.updated" => {
            let updated =
                UserRepo::update_email(&state.pool, &event.data.id, event.data.email.as_deref())
                    .await?;
            if updated.is_none() {
                // The create event has not landed yet; 500 so the provider
                // redelivers.
                return Err(AppError::InternalError(format!(
                    "Cannot update unknown identity '{}'",
                    event.data.id
                )));
            }
            tracing::info!(auth_id = %event.data.id, "User updated");
        }
        "user.deleted" => {
            let deleted = UserRepo::delete_by_auth_id(&state.pool, &event.data.id).await?;
            tracing::info!(auth_id = %event.data.id, deleted, "User deletion processed");
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled identity event type");
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}
