#![allow(dead_code)]

use async_trait::async_trait;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::sync::Arc;
use transaction_service::config::{AuthorizerConfig, Config, DatabaseConfig, Environment};
use transaction_service::models::{Patient, Transaction};
use transaction_service::services::authorizer::{
    Authorization, AuthorizationRequest, PaymentAuthorizer,
};
use transaction_service::services::{
    InMemoryStore, PayTransactionService, SimulatedAuthorizer, TransactionRepository,
};
use transaction_service::{AppState, Application};
use uuid::Uuid;

/// Authorizer that always answers the same way.
pub struct FixedAuthorizer(pub Authorization);

#[async_trait]
impl PaymentAuthorizer for FixedAuthorizer {
    async fn authorize(&self, _request: &AuthorizationRequest) -> anyhow::Result<Authorization> {
        Ok(self.0)
    }
}

/// Transaction repository whose writes always fail.
pub struct BrokenTransactions;

#[async_trait]
impl TransactionRepository for BrokenTransactions {
    async fn create_transaction(&self, _transaction: Transaction) -> Result<Transaction, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!(
            "transaction not created: connection reset"
        )))
    }
}

pub enum Storage {
    Working,
    Broken,
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: InMemoryStore,
    pub patient: Patient,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "transaction-service-test".to_string(),
        log_level: "info".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
            seed_file: None,
        },
        authorizer: AuthorizerConfig {
            endpoint: None,
            api_key: Secret::new("test-api-key".to_string()),
            timeout_seconds: 5,
        },
    }
}

pub fn sample_patient() -> Patient {
    Patient {
        id: Uuid::new_v4(),
        name: "John Doe".to_string(),
        email: "john.doe@example.com".to_string(),
        phone: "123-456-7890".to_string(),
        address: "123 Main St".to_string(),
        city: "Anytown".to_string(),
        state: "State".to_string(),
        zip: "12345".to_string(),
    }
}

impl TestApp {
    /// Spawn with the coin-flip authorizer, as a local run would.
    pub async fn spawn() -> Self {
        Self::spawn_with(Arc::new(SimulatedAuthorizer), Storage::Working).await
    }

    pub async fn spawn_approving() -> Self {
        Self::spawn_with(
            Arc::new(FixedAuthorizer(Authorization::Approved)),
            Storage::Working,
        )
        .await
    }

    pub async fn spawn_declining() -> Self {
        Self::spawn_with(
            Arc::new(FixedAuthorizer(Authorization::Declined)),
            Storage::Working,
        )
        .await
    }

    pub async fn spawn_with(authorizer: Arc<dyn PaymentAuthorizer>, storage: Storage) -> Self {
        let store = InMemoryStore::new();
        let patient = sample_patient();
        store.insert_patient(patient.clone()).await;

        let transactions: Arc<dyn TransactionRepository> = match storage {
            Storage::Working => Arc::new(store.clone()),
            Storage::Broken => Arc::new(BrokenTransactions),
        };

        let config = test_config();
        let state = AppState {
            config: config.clone(),
            service: PayTransactionService::new(Arc::new(store.clone()), transactions, authorizer),
        };

        let app = Application::build_with_state(config, state)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
            patient,
            client,
        }
    }

    pub async fn post_pay_transaction(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/pay-transaction", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_raw(&self, body: &'static str) -> reqwest::Response {
        self.client
            .post(format!("{}/pay-transaction", self.address))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
