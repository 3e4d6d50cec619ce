pub mod access;
pub mod alerts;
pub mod health;
pub mod otp;

pub use access::validate_access;
pub use alerts::generate_alert;
pub use health::{health_check, metrics, readiness_check};
pub use otp::issue_otp;
