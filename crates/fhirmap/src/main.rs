//! fhirmap server
//!
//! Serves FHIR read, search and create requests from the configured backend.

use std::sync::Arc;

use clap::Parser;
use fhirmap_persistence::registry::ModelRegistry;
use fhirmap_rest::{ServerConfig, create_app_with_config, init_logging};
use tracing::{info, warn};

/// Starts the Axum HTTP server and runs until Ctrl+C.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        backend = config.backend.as_deref().unwrap_or("<unset>"),
        debug = config.debug,
        "Starting fhirmap server"
    );

    let registry = Arc::new(ModelRegistry::from_settings(config.backend_settings()));

    // A broken backend is reported per request as a 500, so keep serving.
    if let Err(e) = registry.load().await {
        warn!(error = %e, "Resource models are not available");
    }

    let app = create_app_with_config(Arc::clone(&registry), config.clone());
    serve(app, &config).await
}
