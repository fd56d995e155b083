//! ACMP Kiosk - Main entry point
//!
//! Attendance check-in service for the ACMP member portal. Owns the single
//! kiosk instance (registry, scanner, session, log) and serves the REST +
//! SSE API the front-end drives.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acmp_common::config::KioskConfig;
use acmp_kiosk::api;
use acmp_kiosk::db::init::open_database;
use acmp_kiosk::{CheckinKiosk, KioskState};

/// Command-line arguments for acmp-kiosk
#[derive(Parser, Debug)]
#[command(name = "acmp-kiosk")]
#[command(about = "Attendance check-in kiosk for the ACMP member portal")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "ACMP_KIOSK_PORT")]
    port: Option<u16>,

    /// Base endpoint of the remote member registry
    #[arg(short, long, env = "ACMP_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Folder holding the kiosk database
    #[arg(short, long, env = "ACMP_DATA_FOLDER")]
    data_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acmp_kiosk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();
    let config = KioskConfig::resolve(
        args.port,
        args.registry_url.as_deref(),
        args.data_folder.as_deref(),
    )
    .context("Failed to resolve configuration")?;

    info!("Starting ACMP Kiosk on port {}", config.port);
    info!("Member registry: {}", config.registry_url);
    info!("Data folder: {}", config.data_folder.display());

    // Open the kiosk database
    let db = open_database(&config.database_path())
        .await
        .context("Failed to open database")?;

    // Assemble the single kiosk instance
    let state = Arc::new(KioskState::new());
    let kiosk = CheckinKiosk::new(state, db, config.registry_url.clone())
        .await
        .context("Failed to assemble kiosk")?;

    // Initial member load (falls back to demo data when unreachable)
    kiosk.startup().await;

    // Build the application router
    let ctx = api::AppContext {
        kiosk: Arc::clone(&kiosk),
        port: config.port,
    };
    let app = api::create_router(ctx);

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

    // Release the camera and recurring tasks even if a scan was in flight
    kiosk.cleanup().await;

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
