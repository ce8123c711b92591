//! Patient lookup and transaction storage.

use crate::models::{Patient, Transaction};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// `Ok(None)` when no patient has this id.
    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, AppError>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persist a finalized transaction and return the stored copy.
    async fn create_transaction(&self, transaction: Transaction) -> Result<Transaction, AppError>;
}

/// PostgreSQL-backed store for both repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[instrument(skip(database_url), fields(service = "transaction-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl PatientRepository for PgStore {
    #[instrument(skip(self))]
    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, AppError> {
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            SELECT id, name, email, phone, address, city, state, zip
            FROM patients
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load patient: {}", e)))?;

        Ok(patient)
    }
}

#[async_trait]
impl TransactionRepository for PgStore {
    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id, status = %transaction.status))]
    async fn create_transaction(&self, transaction: Transaction) -> Result<Transaction, AppError> {
        let stored = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (id, patient_id, status, api_response, record_type, date_of_birth, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, patient_id, status, api_response, record_type, date_of_birth, created_at
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.patient_id)
        .bind(transaction.status)
        .bind(&transaction.api_response)
        .bind(&transaction.record_type)
        .bind(&transaction.date_of_birth)
        .bind(transaction.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("transaction not created: {}", e))
        })?;

        info!(transaction_id = %stored.id, "Transaction stored");

        Ok(stored)
    }
}
