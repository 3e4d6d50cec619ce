pub mod access;
pub mod alerts;
pub mod otp;

pub use access::{ValidateAccessRequest, ValidateAccessResponse};
pub use alerts::{AlertRequest, AlertResponse};
pub use otp::{IssueOtpRequest, IssueOtpResponse};

use serde::{Deserialize, Deserializer};

/// Empty strings arrive from form inputs; they mean "not supplied".
/// Anything else, whitespace included, is kept verbatim.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
