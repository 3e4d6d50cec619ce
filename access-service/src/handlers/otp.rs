use crate::dtos::{IssueOtpRequest, IssueOtpResponse};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip_all)]
pub async fn issue_otp(
    State(state): State<AppState>,
    payload: Result<Json<IssueOtpRequest>, JsonRejection>,
) -> Result<Json<IssueOtpResponse>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let issued = state.otp.issue(&payload.qr_code_grant_id).await?;

    Ok(Json(IssueOtpResponse::from(issued)))
}
