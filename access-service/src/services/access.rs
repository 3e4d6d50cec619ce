//! The scan decision path: load, evaluate, audit, alert.

use crate::models::{AccessAttempt, Document};
use crate::services::alerts::AlertDispatcher;
use crate::services::analyzers::AlertContext;
use crate::services::audit::AuditLogger;
use crate::services::identity::IdentityProvider;
use crate::services::metrics::{record_decision, record_denial_reason};
use crate::services::rules::{self, AccessRequest};
use crate::services::store::{DocumentStore, GrantStore};
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use service_core::middleware::ClientMeta;
use std::sync::Arc;
use tokio::task::JoinHandle;

const GRANT_NOT_FOUND: &str = "Invalid or inactive QR code";

#[derive(Debug)]
pub struct AccessDecision {
    pub granted: bool,
    pub reasons: Vec<String>,
    /// Present only when granted.
    pub document: Option<Document>,
    pub attempt_id: Option<String>,
    /// Background alert task, present only when denied.
    pub alert: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct AccessService {
    grants: Arc<dyn GrantStore>,
    documents: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    audit: AuditLogger,
    alerts: AlertDispatcher,
}

impl AccessService {
    pub fn new(
        grants: Arc<dyn GrantStore>,
        documents: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        audit: AuditLogger,
        alerts: AlertDispatcher,
    ) -> Self {
        Self {
            grants,
            documents,
            identity,
            audit,
            alerts,
        }
    }

    pub async fn validate(
        &self,
        request: AccessRequest,
        client: &ClientMeta,
    ) -> Result<AccessDecision, AppError> {
        self.validate_at(request, client, Utc::now()).await
    }

    #[tracing::instrument(
        skip_all,
        fields(
            grant_id = tracing::field::Empty,
            document_id = tracing::field::Empty,
            granted = tracing::field::Empty
        )
    )]
    pub async fn validate_at(
        &self,
        request: AccessRequest,
        client: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<AccessDecision, AppError> {
        let not_found = || AppError::NotFound(anyhow::anyhow!(GRANT_NOT_FOUND));

        let grant = self
            .grants
            .find_active_by_code(&request.code)
            .await?
            .ok_or_else(not_found)?;
        let document = self
            .documents
            .find_by_id(&grant.document_id)
            .await?
            .ok_or_else(not_found)?;

        let span = tracing::Span::current();
        span.record("grant_id", grant.id.as_str());
        span.record("document_id", document.id.as_str());

        let verdict = rules::evaluate(&grant, &document, &request, now);
        let granted = verdict.granted();
        let reasons = verdict.reason_strings();
        span.record("granted", granted);

        let viewer_id = match client.bearer.as_deref() {
            Some(bearer) => self.identity.resolve(bearer).await,
            None => None,
        };

        let location = request.location();
        let attempt = AccessAttempt::new(&grant.id, &document.id, &reasons, location)
            .with_viewer(viewer_id)
            .with_client(client.user_agent.clone(), client.source_addr.clone());
        let attempt_id = self.audit.record(&attempt).await;

        record_decision(granted);
        for reason in &verdict.reasons {
            record_denial_reason(reason.kind());
        }

        if granted {
            tracing::info!("Access granted");
            return Ok(AccessDecision {
                granted,
                reasons,
                document: Some(document),
                attempt_id,
                alert: None,
            });
        }

        tracing::info!(reasons = ?reasons, "Access denied");

        let context = AlertContext {
            grant_id: grant.id.clone(),
            document_id: document.id.clone(),
            denial_reasons: reasons.clone(),
            latitude: location.map(|c| c.latitude),
            longitude: location.map(|c| c.longitude),
        };
        let alert = self.alerts.dispatch(context, attempt_id.clone());

        Ok(AccessDecision {
            granted,
            reasons,
            document: None,
            attempt_id,
            alert: Some(alert),
        })
    }
}
