use crate::services::{AccessDecision, AccessRequest};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::empty_as_none;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAccessRequest {
    #[validate(length(min = 1, message = "qrCode must not be empty"))]
    pub qr_code: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub otp_code: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub password: Option<String>,
}

impl From<ValidateAccessRequest> for AccessRequest {
    fn from(req: ValidateAccessRequest) -> Self {
        Self {
            code: req.qr_code,
            latitude: req.latitude,
            longitude: req.longitude,
            otp_code: req.otp_code,
            password: req.password,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAccessResponse {
    pub success: bool,
    pub document_id: Option<String>,
    pub storage_path: Option<String>,
    pub filename: Option<String>,
    pub reasons: Vec<String>,
}

impl From<&AccessDecision> for ValidateAccessResponse {
    fn from(decision: &AccessDecision) -> Self {
        let document = decision.document.as_ref();
        Self {
            success: decision.granted,
            document_id: document.map(|d| d.id.clone()),
            storage_path: document.map(|d| d.storage_key.clone()),
            filename: document.map(|d| d.original_name.clone()),
            reasons: decision.reasons.clone(),
        }
    }
}
