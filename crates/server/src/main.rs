mod api;
mod bootstrap;
mod gateway;
mod health;
mod services;

use anyhow::Result;
use procura_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use procura_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let router = api::router(api::ApiState {
        store: app.store.clone(),
        catalog: app.catalog.clone(),
        cart: app.cart.clone(),
        checkout: app.checkout.clone(),
        orchestrator: app.orchestrator.clone(),
    });

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "procura-server listening"
    );

    let grace = std::time::Duration::from_secs(app.config.server.graceful_shutdown_secs);
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown(grace)).await?;

    tracing::info!(event_name = "system.server.stopping", "procura-server stopping");
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown(grace: std::time::Duration) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(event_name = "system.server.shutdown_signal", "shutdown signal received");

    // Hard stop if in-flight requests do not drain within the grace
    // period.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            "grace period elapsed before requests drained, exiting"
        );
        std::process::exit(0);
    });
}
