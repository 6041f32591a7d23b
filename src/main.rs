use clap::Parser;
use formsmith::adapters::health_handler::HealthHandler;
use formsmith::adapters::metrics_handler::MetricsCollector;
use formsmith::application::FormService;
use formsmith::cli::Cli;
use formsmith::config::{LoggingSettings, Settings};
use formsmith::persistence::DataStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration (CLI > env vars > config file > defaults)
    let settings = Settings::new_with_cli(&cli)?;
    init_tracing(&settings.logging);

    let host = settings.server.host.clone();
    let port = settings.server.port;
    info!("Starting Formsmith on {}:{}", host, port);

    let store = DataStore::new(&settings.database).await?;
    if settings.database.auto_migrate {
        let result = store.migrate().await?;
        info!(
            "Migrations complete: {} applied, {} skipped",
            result.applied, result.skipped
        );
    }

    let metrics = Arc::new(MetricsCollector::new()?);
    let service = Arc::new(FormService::new(
        store.forms(),
        store.submissions(),
        settings.pagination.clone(),
    ));
    let health_handler = Arc::new(HealthHandler::new(store.clone()));

    let app = formsmith::create_app(service, health_handler, metrics, &settings);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
