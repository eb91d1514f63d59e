use collections_service::config::CollectionsConfig;
use collections_service::services::metrics::init_metrics;
use collections_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Metrics must be registered before the first request is recorded.
    init_metrics();

    let config = CollectionsConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(&config.service_name, &config.log_level, config.otlp_endpoint.as_deref());

    tracing::info!(
        backend = ?config.store.backend,
        enforce_credit_period = config.rules.enforce_credit_period,
        "Starting {}",
        config.service_name
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
