use crate::services::IssuedOtp;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueOtpRequest {
    #[serde(alias = "qrCodeId")]
    #[validate(length(min = 1))]
    pub qr_code_grant_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOtpResponse {
    pub success: bool,
    pub otp_code: String,
    pub expires_at: String,
    pub message: String,
}

impl From<IssuedOtp> for IssueOtpResponse {
    fn from(otp: IssuedOtp) -> Self {
        Self {
            success: true,
            otp_code: otp.code,
            expires_at: otp.expires_at.to_rfc3339(),
            message: "OTP generated successfully".to_string(),
        }
    }
}
