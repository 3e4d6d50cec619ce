//! One-time passcode challenges attached to a grant.
//!
//! A grant carries at most one outstanding challenge; issuing overwrites it.
//! Validation never consumes the code, so it stays usable until it expires.

use crate::models::AccessGrant;
use crate::services::metrics::record_otp_issued;
use crate::services::rules::DenialReason;
use crate::services::store::GrantStore;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

const OTP_TTL_MINUTES: i64 = 10;
const OTP_SPACE: u32 = 1_000_000;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("Invalid or inactive QR code")]
    GrantNotFound,

    #[error("OTP not required for this QR code")]
    OtpNotRequired,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        let message = err.to_string();
        match err {
            OtpError::GrantNotFound => AppError::NotFound(anyhow::anyhow!(message)),
            OtpError::OtpNotRequired => AppError::BadRequest(anyhow::anyhow!(message)),
            OtpError::Store(inner) => inner,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OtpManager {
    grants: Arc<dyn GrantStore>,
}

impl OtpManager {
    pub fn new(grants: Arc<dyn GrantStore>) -> Self {
        Self { grants }
    }

    pub async fn issue(&self, grant_id: &str) -> Result<IssuedOtp, OtpError> {
        self.issue_at(grant_id, Utc::now()).await
    }

    #[tracing::instrument(skip(self, now))]
    pub async fn issue_at(&self, grant_id: &str, now: DateTime<Utc>) -> Result<IssuedOtp, OtpError> {
        let grant = self
            .grants
            .find_active_by_id(grant_id)
            .await?
            .ok_or(OtpError::GrantNotFound)?;

        if !grant.require_otp {
            return Err(OtpError::OtpNotRequired);
        }

        let code = generate_code();
        let expires_at = now + Duration::minutes(OTP_TTL_MINUTES);

        // Last write wins against a concurrent issuance
        if !self.grants.set_otp(&grant.id, &code, expires_at).await? {
            return Err(OtpError::GrantNotFound);
        }

        record_otp_issued();
        tracing::info!(expires_at = %expires_at, "OTP challenge issued");

        Ok(IssuedOtp { code, expires_at })
    }
}

/// Uniform over the full six-digit space, leading zeros kept.
fn generate_code() -> String {
    let value = rand::thread_rng().gen_range(0..OTP_SPACE);
    format!("{:06}", value)
}

/// Check a supplied code against the grant's outstanding challenge.
///
/// Mismatch is checked before expiry, so a matching but stale code reports
/// [`DenialReason::OtpExpired`]. Comparison is exact string equality.
pub fn validate(
    grant: &AccessGrant,
    supplied: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), DenialReason> {
    if !grant.require_otp {
        return Ok(());
    }

    let supplied = supplied.ok_or(DenialReason::OtpMissing)?;

    if grant.otp_code.as_deref() != Some(supplied) {
        return Err(DenialReason::OtpInvalid);
    }

    match grant.otp_expires_at {
        Some(deadline) if now > deadline => Err(DenialReason::OtpExpired),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MemoryStore;

    fn challenged(code: &str, expires_at: DateTime<Utc>) -> AccessGrant {
        let mut grant = AccessGrant::new("doc", "qr").with_otp_required();
        grant.otp_code = Some(code.to_string());
        grant.otp_expires_at = Some(expires_at);
        grant
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..500 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn validate_outcomes() {
        let now = Utc::now();
        let grant = challenged("012345", now + Duration::minutes(5));

        assert_eq!(validate(&grant, None, now), Err(DenialReason::OtpMissing));
        assert_eq!(validate(&grant, Some("12345"), now), Err(DenialReason::OtpInvalid));
        assert_eq!(validate(&grant, Some(" 012345"), now), Err(DenialReason::OtpInvalid));
        assert_eq!(validate(&grant, Some("012345"), now), Ok(()));
        // Not consumed by a successful check
        assert_eq!(validate(&grant, Some("012345"), now), Ok(()));
    }

    #[test]
    fn mismatch_wins_over_expiry() {
        let now = Utc::now();
        let grant = challenged("123456", now - Duration::seconds(1));
        assert_eq!(validate(&grant, Some("123456"), now), Err(DenialReason::OtpExpired));
        assert_eq!(validate(&grant, Some("654321"), now), Err(DenialReason::OtpInvalid));
    }

    #[test]
    fn required_without_outstanding_challenge_is_invalid() {
        let grant = AccessGrant::new("doc", "qr").with_otp_required();
        assert_eq!(
            validate(&grant, Some("123456"), Utc::now()),
            Err(DenialReason::OtpInvalid)
        );
    }

    #[test]
    fn not_required_is_always_ok() {
        let mut grant = challenged("123456", Utc::now() - Duration::hours(1));
        grant.require_otp = false;
        assert_eq!(validate(&grant, None, Utc::now()), Ok(()));
    }

    #[tokio::test]
    async fn issue_sets_ten_minute_window() {
        let store = MemoryStore::new();
        let grant = AccessGrant::new("doc", "qr").with_otp_required();
        let grant_id = grant.id.clone();
        store.insert_grant(grant).await;

        let manager = OtpManager::new(Arc::new(store.clone()));
        let now = Utc::now();
        let issued = manager.issue_at(&grant_id, now).await.unwrap();

        assert_eq!(issued.expires_at, now + Duration::minutes(10));
        let stored = store.grant(&grant_id).await.unwrap();
        assert_eq!(stored.otp_code.as_deref(), Some(issued.code.as_str()));
        assert_eq!(stored.otp_expires_at, Some(issued.expires_at));
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_code() {
        let store = MemoryStore::new();
        let grant = AccessGrant::new("doc", "qr").with_otp_required();
        let grant_id = grant.id.clone();
        store.insert_grant(grant).await;
        let manager = OtpManager::new(Arc::new(store.clone()));

        let first = manager.issue(&grant_id).await.unwrap();
        let mut second = manager.issue(&grant_id).await.unwrap();
        // One-in-a-million collision would make the first code valid again
        while second.code == first.code {
            second = manager.issue(&grant_id).await.unwrap();
        }

        let stored = store.grant(&grant_id).await.unwrap();
        let outcome = validate(&stored, Some(first.code.as_str()), Utc::now());
        assert!(matches!(
            outcome,
            Err(DenialReason::OtpInvalid) | Err(DenialReason::OtpExpired)
        ));
        assert_eq!(validate(&stored, Some(second.code.as_str()), Utc::now()), Ok(()));
    }

    #[tokio::test]
    async fn issue_rejects_missing_and_unrequired_grants() {
        let store = MemoryStore::new();
        let plain = AccessGrant::new("doc", "qr");
        let plain_id = plain.id.clone();
        store.insert_grant(plain).await;
        let manager = OtpManager::new(Arc::new(store));

        assert!(matches!(
            manager.issue("nope").await,
            Err(OtpError::GrantNotFound)
        ));
        assert!(matches!(
            manager.issue(&plain_id).await,
            Err(OtpError::OtpNotRequired)
        ));
    }
}
