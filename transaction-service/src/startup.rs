//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers;
use crate::services::{
    HttpAuthorizer, InMemoryStore, PatientRepository, PayTransactionService, PaymentAuthorizer,
    PgStore, SimulatedAuthorizer, TransactionRepository,
};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{http_request_span, request_id_middleware},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: PayTransactionService,
}

impl AppState {
    /// Wire the workflow from configuration: PostgreSQL when `DATABASE_URL` is
    /// set, otherwise the in-memory store seeded from `PATIENTS_SEED_FILE`.
    pub async fn from_config(config: Config) -> Result<Self, AppError> {
        let (patients, transactions): (Arc<dyn PatientRepository>, Arc<dyn TransactionRepository>) =
            match &config.database.url {
                Some(url) => {
                    let store = PgStore::connect(
                        url.expose_secret(),
                        config.database.max_connections,
                        config.database.min_connections,
                    )
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to PostgreSQL: {}", e);
                        e
                    })?;
                    store.run_migrations().await?;
                    let store = Arc::new(store);
                    let patients: Arc<dyn PatientRepository> = store.clone();
                    let transactions: Arc<dyn TransactionRepository> = store;
                    (patients, transactions)
                }
                None => {
                    let store = match &config.database.seed_file {
                        Some(path) => {
                            let store = InMemoryStore::from_seed_file(path).await?;
                            tracing::warn!(
                                seed_file = %path.display(),
                                patients = store.patient_count().await,
                                "DATABASE_URL not set - using seeded in-memory store"
                            );
                            store
                        }
                        None => {
                            tracing::warn!(
                                "DATABASE_URL and PATIENTS_SEED_FILE not set - in-memory store has no patients"
                            );
                            InMemoryStore::new()
                        }
                    };
                    let store = Arc::new(store);
                    let patients: Arc<dyn PatientRepository> = store.clone();
                    let transactions: Arc<dyn TransactionRepository> = store;
                    (patients, transactions)
                }
            };

        let authorizer: Arc<dyn PaymentAuthorizer> =
            match HttpAuthorizer::from_config(&config.authorizer).map_err(|e| {
                tracing::error!("Failed to build authorizer client: {}", e);
                AppError::ConfigError(e)
            })? {
                Some(http) => {
                    tracing::info!("External authorizer configured");
                    Arc::new(http) as Arc<dyn PaymentAuthorizer>
                }
                None => {
                    tracing::warn!("AUTHORIZER_URL not set - using simulated authorizer");
                    Arc::new(SimulatedAuthorizer)
                }
            };

        Ok(Self {
            config,
            service: PayTransactionService::new(patients, transactions, authorizer),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/pay-transaction", post(handlers::transactions::pay_transaction))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| http_request_span(request)),
        )
        // Outermost, so the trace span already sees the request id.
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Environment variable the Lambda runtime sets inside a function sandbox.
pub const LAMBDA_RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

pub fn running_on_lambda(runtime_api: Option<&str>) -> bool {
    runtime_api.is_some_and(|value| !value.trim().is_empty())
}

/// Serve the router behind an API gateway through the Lambda runtime.
pub async fn serve_lambda(state: AppState) -> Result<(), lambda_http::Error> {
    tracing::info!(
        service = %state.config.service_name,
        "Starting Lambda runtime"
    );
    lambda_http::run(build_router(state)).await
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let state = AppState::from_config(config.clone()).await?;
        Self::build_with_state(config, state).await
    }

    /// Bind the listener for pre-wired state. Port 0 picks a random port.
    pub async fn build_with_state(config: Config, state: AppState) -> Result<Self, AppError> {
        let addr = config.common.bind_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            service = %config.service_name,
            port = port,
            "Transaction service listening"
        );

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
