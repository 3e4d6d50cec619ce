//! Shared setup for access-service integration tests.
//!
//! Routers are built over a `MemoryStore` and driven with `oneshot`, so no
//! database or analyzer backend is needed.

#![allow(dead_code)]

use access_service::models::{AccessAttempt, AccessGrant, Document};
use access_service::services::{
    AnomalyAnalyzer, AnonymousIdentityProvider, AttemptStore, IdentityProvider, MemoryStore,
    MockAnalyzer,
};
use access_service::{build_router, AppState, Stores};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

pub const ALERT_TIMEOUT: Duration = Duration::from_millis(200);

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub analyzer: Arc<MockAnalyzer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_analyzer(MockAnalyzer::new())
    }

    pub fn with_analyzer(analyzer: MockAnalyzer) -> Self {
        Self::build(analyzer, Arc::new(AnonymousIdentityProvider), None)
    }

    pub fn with_identity(identity: Arc<dyn IdentityProvider>) -> Self {
        Self::build(MockAnalyzer::new(), identity, None)
    }

    /// Audit writes always fail; grants and documents still come from the memory store.
    pub fn with_failing_audit() -> Self {
        Self::build(
            MockAnalyzer::new(),
            Arc::new(AnonymousIdentityProvider),
            Some(Arc::new(FailingAttempts)),
        )
    }

    fn build(
        analyzer: MockAnalyzer,
        identity: Arc<dyn IdentityProvider>,
        attempts: Option<Arc<dyn AttemptStore>>,
    ) -> Self {
        let store = MemoryStore::new();
        let analyzer = Arc::new(analyzer);

        let mut stores = Stores::memory(store.clone());
        if let Some(attempts) = attempts {
            stores.attempts = attempts;
        }

        let state = AppState::new(
            stores,
            analyzer.clone() as Arc<dyn AnomalyAnalyzer>,
            identity,
            ALERT_TIMEOUT,
        );

        Self {
            router: build_router(state),
            store,
            analyzer,
        }
    }

    /// Seed an active document and the grant built by `configure`.
    pub async fn seed(&self, configure: impl FnOnce(AccessGrant) -> AccessGrant) -> AccessGrant {
        let document = Document::new("report.pdf", "documents/report.pdf");
        self.seed_with_document(document, configure).await
    }

    pub async fn seed_with_document(
        &self,
        document: Document,
        configure: impl FnOnce(AccessGrant) -> AccessGrant,
    ) -> AccessGrant {
        let grant = configure(AccessGrant::new(&document.id, uuid::Uuid::new_v4().to_string()));
        self.store.insert_document(document).await;
        self.store.insert_grant(grant.clone()).await;
        grant
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// Wait for the background alert on the grant's latest attempt.
    pub async fn wait_for_alert(&self, grant_id: &str) -> AccessAttempt {
        for _ in 0..100 {
            if let Some(attempt) = self.store.attempts_for_grant(grant_id).await.pop() {
                if attempt.alert_generated {
                    return attempt;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("alert was not attached for grant {}", grant_id);
    }
}

pub fn reasons(body: &Value) -> Vec<String> {
    body["reasons"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|r| r.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

struct FailingAttempts;

#[async_trait]
impl AttemptStore for FailingAttempts {
    async fn insert(&self, _attempt: &AccessAttempt) -> Result<String, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("audit store offline")))
    }

    async fn find_latest_denied(&self, _grant_id: &str) -> Result<Option<String>, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("audit store offline")))
    }

    async fn alert_pending(&self, _attempt_id: &str) -> Result<bool, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("audit store offline")))
    }

    async fn attach_alert(&self, _attempt_id: &str, _message: &str) -> Result<bool, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("audit store offline")))
    }
}
