use crate::models::AccessAttempt;
use crate::services::metrics::record_audit_failure;
use crate::services::store::AttemptStore;
use std::sync::Arc;

/// Best-effort audit writer. A failed insert is logged and counted, and the
/// caller still gets its decision.
#[derive(Clone)]
pub struct AuditLogger {
    attempts: Arc<dyn AttemptStore>,
}

impl AuditLogger {
    pub fn new(attempts: Arc<dyn AttemptStore>) -> Self {
        Self { attempts }
    }

    /// Id of the written row, or none when the write failed.
    pub async fn record(&self, attempt: &AccessAttempt) -> Option<String> {
        match self.attempts.insert(attempt).await {
            Ok(id) => Some(id),
            Err(e) => {
                record_audit_failure();
                tracing::error!(
                    grant_id = %attempt.grant_id,
                    granted = attempt.granted,
                    error = %e,
                    "Failed to write access attempt"
                );
                None
            }
        }
    }
}
