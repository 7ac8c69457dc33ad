//! Handler for `POST /api/v1/restore`.
//!
//! Multipart body: one `image` file (jpeg/png/webp, <= 10 MB, PNG
//! dimensions gated by header inspection) and an optional `label` string.
//! All validation runs before the orchestrator is invoked, so a bad upload
//! never reaches the credit check or the inference provider.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use photolift_core::types::DbId;
use photolift_core::upload::{normalize_label, validate_upload, MAX_UPLOAD_BYTES};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body cap for the restore route. Deliberately above
/// [`MAX_UPLOAD_BYTES`] so the explicit size check owns the error message
/// instead of a generic 413.
pub const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES * 2;

/// Success payload returned to the browser.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub restored_image_url: String,
    pub used_free_credit: bool,
    pub remaining_paid_credits: i32,
    pub restoration_id: DbId,
}

/// One parsed multipart upload.
struct UploadForm {
    image: Vec<u8>,
    content_type: String,
    label: Option<String>,
}

/// POST /api/v1/restore
pub async fn restore(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<RestoreResponse>> {
    let form = read_form(multipart).await?;

    validate_upload(&form.content_type, &form.image)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let label =
        normalize_label(form.label.as_deref()).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .orchestrator
        .run(&user.auth_id, &form.image, &form.content_type, &label)
        .await?;

    Ok(Json(RestoreResponse {
        restored_image_url: outcome.restored_image_url,
        used_free_credit: outcome.used_free_credit,
        remaining_paid_credits: outcome.remaining_paid_credits,
        restoration_id: outcome.restoration_id,
    }))
}

/// Pull the `image` and `label` fields out of the multipart stream.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut image: Option<(Vec<u8>, String)> = None;
    let mut label: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let content_type = field.content_type().map(str::to_string).ok_or_else(|| {
                    AppError::BadRequest("Image field is missing a content type".into())
                })?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Could not read image: {e}")))?;
                image = Some((bytes.to_vec(), content_type));
            }
            Some("label") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Could not read label: {e}")))?;
                label = Some(text);
            }
            _ => {
                // Unknown fields are ignored.
            }
        }
    }

    let (image, content_type) =
        image.ok_or_else(|| AppError::BadRequest("Missing image file".into()))?;

    Ok(UploadForm {
        image,
        content_type,
        label,
    })
}
