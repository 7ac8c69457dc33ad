//! Handler for `GET /api/v1/credits`.

use axum::extract::State;
use axum::Json;

use photolift_core::credits::{derive_credit_state, CreditState};
use photolift_core::ledger::LedgerError;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/credits
///
/// Returns the caller's derived credit state. An identity without a ledger
/// row simply has no credits; that is not an error.
pub async fn get_credits(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<CreditState>>> {
    let credit_state = match state.ledger.check_credits(&user.auth_id).await {
        Ok(credit_state) => credit_state,
        Err(LedgerError::UserNotFound(_)) => derive_credit_state(0, false),
        Err(e) => return Err(AppError::Ledger(e.to_string())),
    };

    Ok(Json(DataResponse { data: credit_state }))
}
