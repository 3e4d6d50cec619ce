//! Access grant: the permission record bound to a scannable code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::opt_chrono_datetime_as_bson_datetime;

pub const DEFAULT_FENCE_RADIUS_METERS: f64 = 100.0;

fn default_radius() -> f64 {
    DEFAULT_FENCE_RADIUS_METERS
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both halves or nothing.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self::new(latitude, longitude)),
            _ => None,
        }
    }
}

/// Circular region a viewer must report a location inside of.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoFence {
    pub center: Coordinates,
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
}

impl GeoFence {
    pub fn new(center: Coordinates, radius_meters: Option<f64>) -> Self {
        Self {
            center,
            radius_meters: radius_meters.unwrap_or(DEFAULT_FENCE_RADIUS_METERS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    #[serde(rename = "_id")]
    pub id: String,
    pub code: String,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fence: Option<GeoFence>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub require_otp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub otp_expires_at: Option<DateTime<Utc>>,
    /// Stored in readable form; compared by plain equality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret: Option<String>,
    pub active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AccessGrant {
    /// An active grant with no conditions attached.
    pub fn new(document_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            code: code.into(),
            document_id: document_id.into(),
            fence: None,
            expires_at: None,
            require_otp: false,
            otp_code: None,
            otp_expires_at: None,
            password_secret: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_fence(mut self, fence: GeoFence) -> Self {
        self.fence = Some(fence);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_otp_required(mut self) -> Self {
        self.require_otp = true;
        self
    }

    pub fn with_password(mut self, secret: impl Into<String>) -> Self {
        self.password_secret = Some(secret.into());
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now > deadline)
    }
}
