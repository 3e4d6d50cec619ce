//! Rule evaluation for a scan request against one grant.
//!
//! Every check runs; none short-circuits. Each is a pure predicate that yields at
//! most one reason and the verdict is the ordered concatenation of those reasons.

use crate::models::{AccessGrant, Coordinates, Document};
use crate::services::otp;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    DocumentInactive,
    Expired,
    OutsideFence { distance_meters: i64 },
    LocationMissing,
    OtpMissing,
    OtpInvalid,
    OtpExpired,
    PasswordMissing,
    PasswordInvalid,
}

impl DenialReason {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DenialReason::DocumentInactive => "document_inactive",
            DenialReason::Expired => "expired",
            DenialReason::OutsideFence { .. } => "outside_fence",
            DenialReason::LocationMissing => "location_missing",
            DenialReason::OtpMissing => "otp_missing",
            DenialReason::OtpInvalid => "otp_invalid",
            DenialReason::OtpExpired => "otp_expired",
            DenialReason::PasswordMissing => "password_missing",
            DenialReason::PasswordInvalid => "password_invalid",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::DocumentInactive => write!(f, "Document is no longer active"),
            DenialReason::Expired => write!(f, "QR code has expired"),
            DenialReason::OutsideFence { distance_meters } => write!(
                f,
                "Location outside allowed radius ({}m away)",
                distance_meters
            ),
            DenialReason::LocationMissing => {
                write!(f, "Location verification required but not provided")
            }
            DenialReason::OtpMissing => write!(f, "OTP required but not provided"),
            DenialReason::OtpInvalid => write!(f, "Invalid OTP code"),
            DenialReason::OtpExpired => write!(f, "OTP has expired"),
            DenialReason::PasswordMissing => write!(f, "Password required but not provided"),
            DenialReason::PasswordInvalid => write!(f, "Invalid password"),
        }
    }
}

/// What the viewer supplied with the scan.
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    pub code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub otp_code: Option<String>,
    pub password: Option<String>,
}

impl AccessRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_otp(mut self, otp_code: impl Into<String>) -> Self {
        self.otp_code = Some(otp_code.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn location(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    pub reasons: Vec<DenialReason>,
}

impl Verdict {
    pub fn granted(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn reason_strings(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }
}

struct RuleContext<'a> {
    grant: &'a AccessGrant,
    document: &'a Document,
    request: &'a AccessRequest,
    now: DateTime<Utc>,
}

type Rule = fn(&RuleContext<'_>) -> Option<DenialReason>;

/// Declaration order is reporting order.
const RULES: [Rule; 5] = [
    document_active,
    not_expired,
    within_fence,
    otp_satisfied,
    password_satisfied,
];

pub fn evaluate(
    grant: &AccessGrant,
    document: &Document,
    request: &AccessRequest,
    now: DateTime<Utc>,
) -> Verdict {
    let ctx = RuleContext {
        grant,
        document,
        request,
        now,
    };

    Verdict {
        reasons: RULES.iter().filter_map(|rule| rule(&ctx)).collect(),
    }
}

fn document_active(ctx: &RuleContext<'_>) -> Option<DenialReason> {
    (!ctx.document.active).then_some(DenialReason::DocumentInactive)
}

fn not_expired(ctx: &RuleContext<'_>) -> Option<DenialReason> {
    ctx.grant
        .is_expired_at(ctx.now)
        .then_some(DenialReason::Expired)
}

fn within_fence(ctx: &RuleContext<'_>) -> Option<DenialReason> {
    let fence = ctx.grant.fence.as_ref()?;

    match ctx.request.location() {
        Some(viewer) => {
            let distance = fence.center.distance_to(&viewer);
            (distance > fence.radius_meters).then(|| DenialReason::OutsideFence {
                distance_meters: distance.round() as i64,
            })
        }
        None => Some(DenialReason::LocationMissing),
    }
}

fn otp_satisfied(ctx: &RuleContext<'_>) -> Option<DenialReason> {
    if !ctx.grant.require_otp {
        return None;
    }
    otp::validate(ctx.grant, ctx.request.otp_code.as_deref(), ctx.now).err()
}

fn password_satisfied(ctx: &RuleContext<'_>) -> Option<DenialReason> {
    let secret = ctx.grant.password_secret.as_deref()?;

    match ctx.request.password.as_deref() {
        None => Some(DenialReason::PasswordMissing),
        // Plain equality against the stored secret
        Some(supplied) if supplied != secret => Some(DenialReason::PasswordInvalid),
        Some(_) => None,
    }
}
