//! Viewer identity from an optional bearer credential.
//!
//! Identity is informational: it lands on the audit row and never affects the verdict.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Viewer id for the bearer token, or none when it cannot be resolved.
    async fn resolve(&self, bearer: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, bearer: &str) -> Option<String> {
        match decode::<Claims>(bearer, &self.key, &self.validation) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected, treating viewer as anonymous");
                None
            }
        }
    }
}

/// Used when no token secret is configured.
pub struct AnonymousIdentityProvider;

#[async_trait]
impl IdentityProvider for AnonymousIdentityProvider {
    async fn resolve(&self, _bearer: &str) -> Option<String> {
        None
    }
}
