use crate::models::{AccessAttempt, AccessGrant, Document};
use crate::services::store::{AttemptStore, DocumentStore, GrantStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document as BsonDocument},
    options::{FindOneOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct AccessDb {
    client: MongoClient,
    db: Database,
}

impl AccessDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub fn grants(&self) -> Collection<AccessGrant> {
        self.db.collection("grants")
    }

    pub fn documents(&self) -> Collection<Document> {
        self.db.collection("documents")
    }

    pub fn attempts(&self) -> Collection<AccessAttempt> {
        self.db.collection("access_attempts")
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for access-service");

        let code_index = IndexModel::builder()
            .keys(doc! { "code": 1 })
            .options(
                IndexOptions::builder()
                    .name("code_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        create_index(&self.grants(), code_index, "code").await?;

        let document_index = IndexModel::builder()
            .keys(doc! { "document_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("document_id_idx".to_string())
                    .build(),
            )
            .build();
        create_index(&self.grants(), document_index, "document_id").await?;

        // Serves the latest-denied-attempt lookup
        let attempt_index = IndexModel::builder()
            .keys(doc! { "grant_id": 1, "granted": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("grant_granted_created_idx".to_string())
                    .build(),
            )
            .build();
        create_index(&self.attempts(), attempt_index, "grant_id/granted/created_at").await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }
}

async fn create_index<T>(
    collection: &Collection<T>,
    index: IndexModel,
    label: &str,
) -> Result<(), AppError>
where
    T: Send + Sync,
{
    collection.create_index(index, None).await.map_err(|e| {
        tracing::error!("Failed to create {} index: {}", label, e);
        AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
    })?;
    Ok(())
}

fn db_error(action: &str, e: mongodb::error::Error) -> AppError {
    tracing::error!("Failed to {}: {}", action, e);
    AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
}

#[async_trait]
impl GrantStore for AccessDb {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<AccessGrant>, AppError> {
        self.grants()
            .find_one(doc! { "code": code, "active": true }, None)
            .await
            .map_err(|e| db_error("find grant by code", e))
    }

    async fn find_active_by_id(&self, grant_id: &str) -> Result<Option<AccessGrant>, AppError> {
        self.grants()
            .find_one(doc! { "_id": grant_id, "active": true }, None)
            .await
            .map_err(|e| db_error("find grant by id", e))
    }

    async fn set_otp(
        &self,
        grant_id: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let update: BsonDocument = doc! {
            "$set": {
                "otp_code": code,
                "otp_expires_at": BsonDateTime::from_chrono(expires_at),
            }
        };

        let result = self
            .grants()
            .update_one(doc! { "_id": grant_id, "active": true }, update, None)
            .await
            .map_err(|e| db_error("store OTP challenge", e))?;

        Ok(result.matched_count > 0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| db_error("ping MongoDB", e))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for AccessDb {
    async fn find_by_id(&self, document_id: &str) -> Result<Option<Document>, AppError> {
        self.documents()
            .find_one(doc! { "_id": document_id }, None)
            .await
            .map_err(|e| db_error("find document", e))
    }
}

#[async_trait]
impl AttemptStore for AccessDb {
    async fn insert(&self, attempt: &AccessAttempt) -> Result<String, AppError> {
        self.attempts()
            .insert_one(attempt, None)
            .await
            .map_err(|e| db_error("insert access attempt", e))?;
        Ok(attempt.id.clone())
    }

    async fn find_latest_denied(&self, grant_id: &str) -> Result<Option<String>, AppError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let attempt = self
            .attempts()
            .find_one(doc! { "grant_id": grant_id, "granted": false }, options)
            .await
            .map_err(|e| db_error("find latest denied attempt", e))?;

        Ok(attempt.map(|a| a.id))
    }

    async fn alert_pending(&self, attempt_id: &str) -> Result<bool, AppError> {
        let count = self
            .attempts()
            .count_documents(doc! { "_id": attempt_id, "alert_generated": false }, None)
            .await
            .map_err(|e| db_error("check alert state", e))?;

        Ok(count > 0)
    }

    async fn attach_alert(&self, attempt_id: &str, message: &str) -> Result<bool, AppError> {
        let result = self
            .attempts()
            .update_one(
                doc! { "_id": attempt_id, "alert_generated": false },
                doc! { "$set": { "alert_generated": true, "alert_message": message } },
                None,
            )
            .await
            .map_err(|e| db_error("attach alert to attempt", e))?;

        Ok(result.modified_count > 0)
    }
}
