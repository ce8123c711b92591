use crate::models::{Patient, Transaction};
use crate::services::repository::{PatientRepository, TransactionRepository};
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory store for patients and transactions.
///
/// Backs local runs without a database and the integration tests.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    patients: Arc<RwLock<HashMap<Uuid, Patient>>>,
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the patients listed in a JSON array file.
    pub async fn from_seed_file(path: &Path) -> Result<Self, AppError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "failed to read patients seed file {}: {}",
                path.display(),
                e
            ))
        })?;
        let patients: Vec<Patient> = serde_json::from_str(&raw).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "invalid patients seed file {}: {}",
                path.display(),
                e
            ))
        })?;

        let store = Self::new();
        for patient in patients {
            store.insert_patient(patient).await;
        }
        Ok(store)
    }

    pub async fn insert_patient(&self, patient: Patient) {
        self.patients.write().await.insert(patient.id, patient);
    }

    pub async fn patient_count(&self) -> usize {
        self.patients.read().await.len()
    }

    /// Every transaction stored so far, in insertion order.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }
}

#[async_trait]
impl PatientRepository for InMemoryStore {
    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, AppError> {
        Ok(self.patients.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn create_transaction(&self, transaction: Transaction) -> Result<Transaction, AppError> {
        let mut transactions = self.transactions.write().await;
        if transactions.iter().any(|t| t.id == transaction.id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "transaction not created: duplicate id {}",
                transaction.id
            )));
        }
        transactions.push(transaction.clone());
        Ok(transaction)
    }
}
