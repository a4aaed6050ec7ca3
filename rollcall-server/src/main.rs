//! rollcall-server - attendance storage and read/write API
//!
//! Scanner devices post scans here; kiosk displays poll the latest record.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use rollcall_common::config::resolve_root_folder;
use rollcall_server::{build_router, db, AppState};
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for rollcall-server
#[derive(Parser, Debug)]
#[command(name = "rollcall-server")]
#[command(about = "Attendance storage and read/write API")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "10246", env = "ROLLCALL_SERVER_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "ROLLCALL_SERVER_BIND")]
    bind: std::net::IpAddr,

    /// Root folder holding rollcall.db (falls back to env, config file, OS default)
    #[arg(short, long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_server=info,tower_http=info".into()),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting rollcall-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        "ROLLCALL_ROOT_FOLDER",
        Some("root_folder"),
    )
    .context("Failed to resolve root folder")?;
    info!("Root folder: {}", root_folder.display());

    let pool = match db::connect(&root_folder).await {
        Ok(pool) => {
            info!("✓ Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let app = build_router(AppState::new(pool));

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("rollcall-server listening on http://{}", addr);
    info!("Latest record: http://{}/attendance/latest", addr);

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
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
