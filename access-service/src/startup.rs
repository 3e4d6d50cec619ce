use crate::config::{AccessConfig, StoreBackend};
use crate::handlers;
use crate::services::{
    AccessDb, AccessService, AlertDispatcher, AnomalyAnalyzer, AnonymousIdentityProvider,
    AttemptStore, AuditLogger, DocumentStore, GrantStore, IdentityProvider, JwtIdentityProvider,
    MemoryStore, MockAnalyzer, OllamaAnalyzer, OtpManager,
};
use crate::services::analyzers::OllamaConfig;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use service_core::observability::extract_request_id;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Concrete collaborators behind the storage seams.
#[derive(Clone)]
pub struct Stores {
    pub grants: Arc<dyn GrantStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub attempts: Arc<dyn AttemptStore>,
}

impl Stores {
    pub fn memory(store: MemoryStore) -> Self {
        Self {
            grants: Arc::new(store.clone()),
            documents: Arc::new(store.clone()),
            attempts: Arc::new(store),
        }
    }

    pub fn mongo(db: AccessDb) -> Self {
        Self {
            grants: Arc::new(db.clone()),
            documents: Arc::new(db.clone()),
            attempts: Arc::new(db),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub grants: Arc<dyn GrantStore>,
    pub access: AccessService,
    pub otp: OtpManager,
    pub alerts: AlertDispatcher,
}

impl AppState {
    pub fn new(
        stores: Stores,
        analyzer: Arc<dyn AnomalyAnalyzer>,
        identity: Arc<dyn IdentityProvider>,
        alert_timeout: Duration,
    ) -> Self {
        let alerts = AlertDispatcher::new(analyzer, stores.attempts.clone(), alert_timeout);
        let access = AccessService::new(
            stores.grants.clone(),
            stores.documents.clone(),
            identity,
            AuditLogger::new(stores.attempts.clone()),
            alerts.clone(),
        );

        Self {
            grants: stores.grants.clone(),
            access,
            otp: OtpManager::new(stores.grants),
            alerts,
        }
    }

    pub async fn from_config(config: &AccessConfig) -> Result<Self, AppError> {
        let stores = match (&config.store.backend, &config.store.mongodb) {
            (StoreBackend::Mongo, Some(mongo)) => {
                let db = AccessDb::connect(&mongo.uri, &mongo.database)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to MongoDB: {}", e);
                        e
                    })?;
                db.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;
                Stores::mongo(db)
            }
            (StoreBackend::Mongo, None) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "MongoDB settings are required for the mongo backend"
                )));
            }
            (StoreBackend::Memory, _) => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Stores::memory(MemoryStore::new())
            }
        };

        let analyzer: Arc<dyn AnomalyAnalyzer> = if config.analyzer.enabled {
            Arc::new(
                OllamaAnalyzer::new(OllamaConfig {
                    base_url: config.analyzer.url.clone(),
                    model: config.analyzer.model.clone(),
                    timeout: config.analyzer.timeout(),
                })
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?,
            )
        } else {
            tracing::info!("Analyzer disabled, alerts use the mock analyzer");
            Arc::new(MockAnalyzer::new())
        };

        let identity: Arc<dyn IdentityProvider> = match &config.identity.jwt_secret {
            Some(secret) => Arc::new(JwtIdentityProvider::new(secret)),
            None => Arc::new(AnonymousIdentityProvider),
        };

        Ok(Self::new(
            stores,
            analyzer,
            identity,
            config.analyzer.timeout(),
        ))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/access/validate", post(handlers::validate_access))
        .route("/otp/issue", post(handlers::issue_otp))
        .route("/alerts", post(handlers::generate_alert))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id =
                    extract_request_id(request.headers()).unwrap_or_else(|| "-".to_string());

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: AccessConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config).await?;
        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
