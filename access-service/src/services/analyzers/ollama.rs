//! Analyzer backed by an Ollama-compatible `/api/generate` endpoint.

use super::{AlertContext, AnalyzerError, AnomalyAnalyzer};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::time::Duration;

/// Reply used when the backend answers with an empty body.
const EMPTY_REPLY_MESSAGE: &str = "Suspicious access attempt detected";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

pub struct OllamaAnalyzer {
    config: OllamaConfig,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

impl OllamaAnalyzer {
    pub fn new(config: OllamaConfig) -> Result<Self, AnalyzerError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| AnalyzerError::NotConfigured(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnomalyAnalyzer for OllamaAnalyzer {
    async fn analyze(&self, context: &AlertContext) -> Result<String, AnalyzerError> {
        let prompt = context.prompt();
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: &prompt,
            stream: false,
        };

        tracing::debug!(
            model = %self.config.model,
            grant_id = %context.grant_id,
            "Requesting anomaly alert from analyzer"
        );

        let response = self
            .client
            .traced_post(&self.generate_url())
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzerError::Timeout(self.config.timeout.as_secs())
                } else {
                    AnalyzerError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::ApiError(format!("{}: {}", status, body)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::ApiError(format!("Invalid analyzer response: {}", e)))?;

        Ok(body
            .response
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY_MESSAGE.to_string()))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
