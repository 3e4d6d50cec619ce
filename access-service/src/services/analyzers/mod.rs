//! Anomaly analyzer backends that turn a denial context into alert text.

pub mod mock;
pub mod ollama;

use crate::models::Coordinates;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use mock::MockAnalyzer;
pub use ollama::{OllamaAnalyzer, OllamaConfig};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Analyzer not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

/// What the analyzer is told about one denied attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertContext {
    pub grant_id: String,
    pub document_id: String,
    pub denial_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl AlertContext {
    pub fn location(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    /// Prompt for text-generation backends.
    pub fn prompt(&self) -> String {
        let location = self
            .location()
            .map(|c| format!("{}, {}", c.latitude, c.longitude))
            .unwrap_or_else(|| "Not provided".to_string());

        format!(
            "You are a security alert system. Analyze this suspicious document access attempt \
             and generate a concise security alert message (max 200 characters).\n\n\
             Context:\n\
             - Document ID: {}\n\
             - QR Code ID: {}\n\
             - Denial Reasons: {}\n\
             - Location: {}\n\n\
             Generate a brief, professional security alert message:",
            self.document_id,
            self.grant_id,
            self.denial_reasons.join(", "),
            location
        )
    }
}

#[async_trait]
pub trait AnomalyAnalyzer: Send + Sync {
    async fn analyze(&self, context: &AlertContext) -> Result<String, AnalyzerError>;

    fn name(&self) -> &'static str;
}
