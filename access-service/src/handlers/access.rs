use crate::dtos::{ValidateAccessRequest, ValidateAccessResponse};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::middleware::ClientMeta;
use validator::Validate;

/// 200 when granted, 403 with reasons when denied, 404 for an unknown or inactive code.
#[tracing::instrument(skip_all)]
pub async fn validate_access(
    State(state): State<AppState>,
    client: ClientMeta,
    payload: Result<Json<ValidateAccessRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let decision = state.access.validate(payload.into(), &client).await?;

    let status = if decision.granted {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };

    // Alert task keeps running after the response is sent
    Ok((status, Json(ValidateAccessResponse::from(&decision))))
}
