use service_core::observability::init_tracing;
use transaction_service::startup::{running_on_lambda, serve_lambda, LAMBDA_RUNTIME_API_ENV};
use transaction_service::{config::Config, services::init_metrics, AppState, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics();

    let on_lambda = running_on_lambda(std::env::var(LAMBDA_RUNTIME_API_ENV).ok().as_deref());

    tracing::info!(
        environment = ?config.environment,
        port = config.common.port,
        lambda = on_lambda,
        "Starting transaction service"
    );

    let state = AppState::from_config(config.clone()).await?;

    if on_lambda {
        serve_lambda(state)
            .await
            .map_err(|e| anyhow::anyhow!("Lambda runtime error: {}", e))?;
    } else {
        let application = Application::build_with_state(config, state).await?;
        application.run_until_stopped().await?;
    }

    Ok(())
}
