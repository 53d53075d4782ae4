//! Shelf Aware UI (shelfaware-ui) - Main entry point
//!
//! Front-end service for the product scanner: drives the external vision
//! backend through the detection-polling workflow and serves the HTTP API
//! the browser UI talks to.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfaware_common::config::ServiceConfig;
use shelfaware_common::EventBus;
use shelfaware_ui::scanner::ScanEngine;
use shelfaware_ui::store::PostgrestStore;
use shelfaware_ui::vision::HttpVisionClient;
use shelfaware_ui::{build_router, AppState};

/// Command-line arguments for shelfaware-ui
#[derive(Parser, Debug)]
#[command(name = "shelfaware-ui")]
#[command(about = "Front-end service for the Shelf Aware product scanner")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SHELFAWARE_PORT")]
    port: Option<u16>,

    /// Base URL of the vision-processing backend
    #[arg(long, env = "SHELFAWARE_VISION_URL")]
    vision_url: Option<String>,

    /// Base URL of the hosted row-store
    #[arg(long, env = "SHELFAWARE_STORE_URL")]
    store_url: Option<String>,

    /// API key for the row-store
    #[arg(long, env = "SHELFAWARE_STORE_KEY")]
    store_key: Option<String>,

    /// Path to a TOML config file (defaults to the platform location)
    #[arg(short, long, env = "SHELFAWARE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfaware_ui=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments and resolve configuration
    let args = Args::parse();
    let mut config = ServiceConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    config.apply_overrides(args.port, args.vision_url, args.store_url, args.store_key);

    info!("Starting Shelf Aware UI on port {}", config.port);
    info!("Vision backend: {}", config.vision_base_url);

    // Assemble clients and the scan workflow engine
    let vision = Arc::new(HttpVisionClient::new(config.vision_base_url.clone()));
    let store = Arc::new(PostgrestStore::new(
        config.store_base_url.clone(),
        &config.store_api_key,
    ));
    let bus = EventBus::default();

    let engine = ScanEngine::new(
        vision,
        store.clone(),
        bus.clone(),
        Duration::from_millis(config.poll_interval_ms),
        config.max_start_attempts,
    );
    info!("Scan engine initialized");

    let app_state = AppState::new(engine, store, bus, config.compare_reward_points);
    let app = build_router(app_state);

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
