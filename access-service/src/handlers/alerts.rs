use crate::dtos::{AlertRequest, AlertResponse};
use crate::services::AlertOutcome;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Generate an alert for the latest denied attempt of a grant and wait for the result.
#[tracing::instrument(skip_all)]
pub async fn generate_alert(
    State(state): State<AppState>,
    payload: Result<Json<AlertRequest>, JsonRejection>,
) -> Result<Json<AlertResponse>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    match state.alerts.run(payload.into(), None).await? {
        AlertOutcome::Attached { message, .. } => Ok(Json(AlertResponse {
            success: true,
            alert_message: message,
        })),
        AlertOutcome::NoTarget | AlertOutcome::AlreadyAlerted { .. } => Err(AppError::NotFound(
            anyhow::anyhow!("Access attempt not found"),
        )),
    }
}
