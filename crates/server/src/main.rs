use std::time::Duration;

use anyhow::Result;
use selector_core::config::{AppConfig, LoadOptions};
use selector_server::{bootstrap, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        command = %app.config.slack.command,
        "selector-server listening"
    );

    axum::serve(listener, app.router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        in_flight = app.dispatcher.queued(),
        "http listener closed; draining dispatcher"
    );
    app.runtime.shutdown(Duration::from_secs(app.config.server.graceful_shutdown_secs)).await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        completed = app.dispatcher.stats().completed,
        "selector-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for ctrl-c; shutting down"
        );
    }
}
