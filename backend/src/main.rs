//! Parking Facility Backend Service
//!
//! Main entry point for the parking facility backend.
//! This service provides:
//! - WebSocket server for live snapshots and administrative commands
//! - Background task sweeping orphaned plate images

use anyhow::Context;
use parking_backend::clock::SystemClock;
use parking_backend::config::AppConfig;
use parking_backend::database::{create_pool, run_migrations, Database};
use parking_backend::services::RetentionSweeper;
use parking_backend::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("parking_backend={},sqlx=warn", config.log_level).into()
    });

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Configuration error")?;

    init_tracing(&config);

    info!("Parking facility backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!(
        "Spaces: {}, tariff: {}",
        config.facility.total_spaces,
        config.tariff.policy.as_str()
    );

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database {}...", config.database_url());
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool, None)
        .await
        .context("Database migration failed")?;
    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES
    // =========================================================================
    let (state, events) = AppState::initialize(&config, Database::new(pool), Arc::new(SystemClock))
        .await
        .context("Failed to initialize application state")?;
    info!("✓ Ledger loaded");

    let hub_handle = tokio::spawn(state.hub.clone().run(events));
    info!("✓ Notification hub started");

    let sweeper = RetentionSweeper::new(state.service.clone())
        .with_interval(config.images.sweep_interval());
    let sweeper_handle = tokio::spawn(sweeper.start());
    info!(
        "✓ Retention sweeper started ({:?} interval, images in {:?})",
        config.images.sweep_interval(),
        state.images.directory()
    );

    // =========================================================================
    // WEBSOCKET SERVER
    // =========================================================================
    let ws_addr = SocketAddr::from(([0, 0, 0, 0], config.ws_port));
    let listener = TcpListener::bind(ws_addr)
        .await
        .with_context(|| format!("Failed to bind WebSocket server on {}", ws_addr))?;

    let ws_server = state.websocket_server();
    let ws_handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New WebSocket connection from {}", addr);
                    let ws = ws_server.clone();
                    tokio::spawn(async move {
                        if let Err(e) = ws.handle_connection(stream).await {
                            error!("WebSocket connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("WebSocket accept error: {}", e);
                }
            }
        }
    });
    info!("✓ WebSocket server listening on {}", ws_addr);
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = hub_handle => {
            error!("Notification hub exited unexpectedly");
        }
        _ = sweeper_handle => {
            error!("Retention sweeper exited unexpectedly");
        }
        _ = ws_handle => {
            error!("WebSocket server exited unexpectedly");
        }
    }

    info!("Parking facility backend shutdown complete");
    Ok(())
}
