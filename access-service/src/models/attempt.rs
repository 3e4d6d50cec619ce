//! Audit record of one access evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Coordinates;

/// Denial reasons are stored as one string joined by this separator.
pub const REASON_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessAttempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub grant_id: String,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<String>,
    pub granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_addr: Option<String>,
    #[serde(default)]
    pub alert_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AccessAttempt {
    /// `granted` is derived from the reason list so the two can never disagree.
    pub fn new(
        grant_id: impl Into<String>,
        document_id: impl Into<String>,
        reasons: &[String],
        viewer_location: Option<Coordinates>,
    ) -> Self {
        let granted = reasons.is_empty();
        Self {
            id: Uuid::new_v4().to_string(),
            grant_id: grant_id.into(),
            document_id: document_id.into(),
            viewer_id: None,
            granted,
            denial_reason: (!granted).then(|| reasons.join(REASON_SEPARATOR)),
            viewer_location,
            user_agent: None,
            source_addr: None,
            alert_generated: false,
            alert_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_viewer(mut self, viewer_id: Option<String>) -> Self {
        self.viewer_id = viewer_id;
        self
    }

    pub fn with_client(mut self, user_agent: Option<String>, source_addr: Option<String>) -> Self {
        self.user_agent = user_agent;
        self.source_addr = source_addr;
        self
    }

    pub fn denial_reasons(&self) -> Vec<String> {
        self.denial_reason
            .as_deref()
            .map(|joined| joined.split(REASON_SEPARATOR).map(str::to_string).collect())
            .unwrap_or_default()
    }
}
