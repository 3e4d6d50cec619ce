use crate::services::AlertContext;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AlertRequest {
    #[serde(alias = "qrCodeId")]
    #[validate(length(min = 1))]
    pub grant_id: String,
    pub document_id: String,
    #[serde(default)]
    pub denial_reasons: Vec<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl From<AlertRequest> for AlertContext {
    fn from(req: AlertRequest) -> Self {
        Self {
            grant_id: req.grant_id,
            document_id: req.document_id,
            denial_reasons: req.denial_reasons,
            latitude: req.latitude,
            longitude: req.longitude,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub success: bool,
    pub alert_message: String,
}
