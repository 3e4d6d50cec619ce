//! Storage seams for the externally owned records.
//!
//! Grant and document rows belong to other systems; every evaluation re-reads them
//! through these traits and nothing is cached across requests.

use crate::models::{AccessAttempt, AccessGrant, Document};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;

#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Active grant bound to the public code.
    async fn find_active_by_code(&self, code: &str) -> Result<Option<AccessGrant>, AppError>;

    /// Active grant by its id.
    async fn find_active_by_id(&self, grant_id: &str) -> Result<Option<AccessGrant>, AppError>;

    /// Overwrite the outstanding OTP challenge. Returns false when no active grant matched.
    async fn set_otp(
        &self,
        grant_id: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(&self, document_id: &str) -> Result<Option<Document>, AppError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Insert one attempt and return its id.
    async fn insert(&self, attempt: &AccessAttempt) -> Result<String, AppError>;

    /// Id of the most recent denied attempt for the grant.
    async fn find_latest_denied(&self, grant_id: &str) -> Result<Option<String>, AppError>;

    /// True when the attempt exists and carries no alert yet.
    async fn alert_pending(&self, attempt_id: &str) -> Result<bool, AppError>;

    /// Set `alert_generated` and `alert_message` on an attempt that has no alert yet.
    /// Returns false when nothing was updated.
    async fn attach_alert(&self, attempt_id: &str, message: &str) -> Result<bool, AppError>;
}
