//! Administrative command endpoint.

use crate::{error::status_for, AppState};
use axum::{extract::State, http::StatusCode, Json};
use pasteward_core::admin::{AdminRequest, AdminResponse};
use pasteward_core::AppError;

/// Run an administrative command.
///
/// Always answers `{message, status}`; a body that does not decode counts
/// as a missing payload. Authentication failures never execute anything.
pub async fn run_command(
    State(state): State<AppState>,
    payload: Option<Json<AdminRequest>>,
) -> (StatusCode, Json<AdminResponse>) {
    let request = payload.map(|Json(request)| request);
    let outcome = state
        .admin
        .handle(state.config.admin_key.as_deref(), request.as_ref())
        .await;
    match outcome {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => {
            match &err {
                AppError::Unauthorized(msg) => tracing::warn!("Rejected admin request: {}", msg),
                AppError::Validation(_) | AppError::NotFound | AppError::Upstream(_) => {
                    tracing::info!("Admin command failed: {}", err)
                }
                other => tracing::error!("Admin command error: {:?}", other),
            }
            (status_for(&err), Json(AdminResponse::from_error(&err)))
        }
    }
}
