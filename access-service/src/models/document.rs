use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document metadata as owned by the document store. Only `active` gates access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    pub original_name: String,
    pub storage_key: String,
    pub active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(original_name: impl Into<String>, storage_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_name: original_name.into(),
            storage_key: storage_key.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}
