pub mod access;
pub mod alerts;
pub mod analyzers;
pub mod audit;
pub mod database;
pub mod geo;
pub mod identity;
pub mod memory;
pub mod metrics;
pub mod otp;
pub mod rules;
pub mod store;

pub use access::{AccessDecision, AccessService};
pub use alerts::{fallback_message, AlertDispatcher, AlertOutcome, AlertSource};
pub use analyzers::{AlertContext, AnalyzerError, AnomalyAnalyzer, MockAnalyzer, OllamaAnalyzer};
pub use audit::AuditLogger;
pub use database::AccessDb;
pub use identity::{AnonymousIdentityProvider, IdentityProvider, JwtIdentityProvider};
pub use memory::MemoryStore;
pub use otp::{IssuedOtp, OtpError, OtpManager};
pub use rules::{AccessRequest, DenialReason, Verdict};
pub use store::{AttemptStore, DocumentStore, GrantStore};
