//! Anomaly alert dispatch for denied attempts.
//!
//! The request path fires [`AlertDispatcher::dispatch`] and never awaits it. The
//! alert lands on the attempt row written for that request; when the audit write
//! failed there is no id and the most recent denied attempt for the grant is used.

use crate::services::analyzers::{AlertContext, AnomalyAnalyzer};
use crate::services::metrics::{record_alert, record_alert_abandoned};
use crate::services::store::AttemptStore;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const FALLBACK_PREFIX: &str = "Security Alert: Unauthorized access attempt blocked. Reasons: ";

/// Where the alert text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSource {
    Analyzer,
    Fallback,
}

impl AlertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSource::Analyzer => "analyzer",
            AlertSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    Attached {
        attempt_id: String,
        message: String,
        source: AlertSource,
    },
    /// No denied attempt to attach to.
    NoTarget,
    /// The target already carries an alert.
    AlreadyAlerted { attempt_id: String },
}

/// Locally synthesized alert text used when the analyzer cannot answer.
pub fn fallback_message(reasons: &[String]) -> String {
    format!("{}{}", FALLBACK_PREFIX, reasons.join(", "))
}

#[derive(Clone)]
pub struct AlertDispatcher {
    analyzer: Arc<dyn AnomalyAnalyzer>,
    attempts: Arc<dyn AttemptStore>,
    timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(
        analyzer: Arc<dyn AnomalyAnalyzer>,
        attempts: Arc<dyn AttemptStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            analyzer,
            attempts,
            timeout,
        }
    }

    /// Run the alert in the background. Failures are logged, never returned.
    pub fn dispatch(&self, context: AlertContext, attempt_id: Option<String>) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let grant_id = context.grant_id.clone();
            if let Err(e) = dispatcher.run(context, attempt_id).await {
                record_alert_abandoned();
                tracing::error!(grant_id = %grant_id, error = %e, "Alert dispatch failed");
            }
        })
    }

    #[tracing::instrument(skip(self, context), fields(grant_id = %context.grant_id))]
    pub async fn run(
        &self,
        context: AlertContext,
        attempt_id: Option<String>,
    ) -> Result<AlertOutcome, AppError> {
        let target = match attempt_id {
            Some(id) => Some(id),
            None => self.attempts.find_latest_denied(&context.grant_id).await?,
        };

        let Some(attempt_id) = target else {
            record_alert_abandoned();
            tracing::warn!("No denied access attempt found, alert abandoned");
            return Ok(AlertOutcome::NoTarget);
        };

        if !self.attempts.alert_pending(&attempt_id).await? {
            record_alert_abandoned();
            tracing::warn!(attempt_id = %attempt_id, "Attempt already alerted or missing");
            return Ok(AlertOutcome::AlreadyAlerted { attempt_id });
        }

        let (message, source) = self.compose(&context).await;

        // A concurrent dispatch may have attached in the meantime
        if !self.attempts.attach_alert(&attempt_id, &message).await? {
            record_alert_abandoned();
            tracing::warn!(attempt_id = %attempt_id, "Attempt already alerted or missing");
            return Ok(AlertOutcome::AlreadyAlerted { attempt_id });
        }

        record_alert(source.as_str());
        tracing::info!(
            attempt_id = %attempt_id,
            source = source.as_str(),
            "Alert attached to access attempt"
        );

        Ok(AlertOutcome::Attached {
            attempt_id,
            message,
            source,
        })
    }

    async fn compose(&self, context: &AlertContext) -> (String, AlertSource) {
        match tokio::time::timeout(self.timeout, self.analyzer.analyze(context)).await {
            Ok(Ok(message)) => (message, AlertSource::Analyzer),
            Ok(Err(e)) => {
                tracing::warn!(
                    analyzer = self.analyzer.name(),
                    error = %e,
                    "Analyzer failed, using fallback alert"
                );
                (fallback_message(&context.denial_reasons), AlertSource::Fallback)
            }
            Err(_) => {
                tracing::warn!(
                    analyzer = self.analyzer.name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Analyzer timed out, using fallback alert"
                );
                (fallback_message(&context.denial_reasons), AlertSource::Fallback)
            }
        }
    }
}
