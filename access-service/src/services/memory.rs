//! Process-local store backing the `memory` backend and the test suite.

use crate::models::{AccessAttempt, AccessGrant, Document};
use crate::services::store::{AttemptStore, DocumentStore, GrantStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryInner {
    grants: RwLock<HashMap<String, AccessGrant>>,
    documents: RwLock<HashMap<String, Document>>,
    attempts: RwLock<Vec<AccessAttempt>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_grant(&self, grant: AccessGrant) {
        self.inner
            .grants
            .write()
            .await
            .insert(grant.id.clone(), grant);
    }

    pub async fn insert_document(&self, document: Document) {
        self.inner
            .documents
            .write()
            .await
            .insert(document.id.clone(), document);
    }

    /// Grant by id regardless of its active flag.
    pub async fn grant(&self, grant_id: &str) -> Option<AccessGrant> {
        self.inner.grants.read().await.get(grant_id).cloned()
    }

    pub async fn attempt(&self, attempt_id: &str) -> Option<AccessAttempt> {
        self.inner
            .attempts
            .read()
            .await
            .iter()
            .find(|a| a.id == attempt_id)
            .cloned()
    }

    /// Attempts for a grant in insertion order.
    pub async fn attempts_for_grant(&self, grant_id: &str) -> Vec<AccessAttempt> {
        self.inner
            .attempts
            .read()
            .await
            .iter()
            .filter(|a| a.grant_id == grant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<AccessGrant>, AppError> {
        Ok(self
            .inner
            .grants
            .read()
            .await
            .values()
            .find(|g| g.code == code && g.active)
            .cloned())
    }

    async fn find_active_by_id(&self, grant_id: &str) -> Result<Option<AccessGrant>, AppError> {
        Ok(self
            .inner
            .grants
            .read()
            .await
            .get(grant_id)
            .filter(|g| g.active)
            .cloned())
    }

    async fn set_otp(
        &self,
        grant_id: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut grants = self.inner.grants.write().await;
        match grants.get_mut(grant_id).filter(|g| g.active) {
            Some(grant) => {
                grant.otp_code = Some(code.to_string());
                grant.otp_expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_id(&self, document_id: &str) -> Result<Option<Document>, AppError> {
        Ok(self.inner.documents.read().await.get(document_id).cloned())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn insert(&self, attempt: &AccessAttempt) -> Result<String, AppError> {
        self.inner.attempts.write().await.push(attempt.clone());
        Ok(attempt.id.clone())
    }

    async fn find_latest_denied(&self, grant_id: &str) -> Result<Option<String>, AppError> {
        let attempts = self.inner.attempts.read().await;
        // Later insertions win ties on created_at
        let latest = attempts
            .iter()
            .enumerate()
            .filter(|(_, a)| a.grant_id == grant_id && !a.granted)
            .max_by_key(|(idx, a)| (a.created_at, *idx))
            .map(|(_, a)| a.id.clone());
        Ok(latest)
    }

    async fn alert_pending(&self, attempt_id: &str) -> Result<bool, AppError> {
        Ok(self
            .inner
            .attempts
            .read()
            .await
            .iter()
            .any(|a| a.id == attempt_id && !a.alert_generated))
    }

    async fn attach_alert(&self, attempt_id: &str, message: &str) -> Result<bool, AppError> {
        let mut attempts = self.inner.attempts.write().await;
        match attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && !a.alert_generated)
        {
            Some(attempt) => {
                attempt.alert_generated = true;
                attempt.alert_message = Some(message.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
