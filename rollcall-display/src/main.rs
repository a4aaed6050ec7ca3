//! rollcall-display - kiosk welcome display
//!
//! Polls rollcall-server and greets each newly scanned attendee.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rollcall_display::config::DisplayConfig;
use rollcall_display::poller::HttpLatestSource;
use rollcall_display::{build_router, AppState, DisplayController};
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for rollcall-display
#[derive(Parser, Debug)]
#[command(name = "rollcall-display")]
#[command(about = "Kiosk welcome display for scanned attendees")]
#[command(version)]
struct Args {
    /// Base URL of rollcall-server
    #[arg(short, long, env = "ROLLCALL_SERVER_URL")]
    server_url: Option<String>,

    /// Port the kiosk page is served on
    #[arg(short, long, env = "ROLLCALL_DISPLAY_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "ROLLCALL_DISPLAY_BIND")]
    bind: std::net::IpAddr,

    /// Poll cadence in milliseconds
    #[arg(long, env = "ROLLCALL_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Seconds each identity stays on screen
    #[arg(long, env = "ROLLCALL_DWELL_SECS")]
    dwell_secs: Option<u64>,

    /// Config file (default: platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut DisplayConfig) {
        if let Some(url) = &self.server_url {
            config.server_url = url.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(secs) = self.dwell_secs {
            config.dwell_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_display=info,tower_http=info".into()),
        )
        .init();

    info!(
        "Starting rollcall-display v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DisplayConfig::from_file(path).context("Failed to load config file")?,
        None => DisplayConfig::load().context("Failed to load configuration")?,
    };
    args.apply(&mut config);
    config.validate().context("Invalid display configuration")?;
    info!("Polling {} every {} ms", config.server_url, config.poll_interval_ms);

    let source = HttpLatestSource::new(&config.server_url, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let controller = DisplayController::new(Arc::new(source), config.timing());
    let poller = controller.arm().context("Failed to start display driver")?;

    let app = build_router(AppState::new(poller.display()));

    let addr = SocketAddr::new(args.bind, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            poller.shutdown().await;
            return Err(e).context("Failed to bind to address");
        }
    };
    info!("rollcall-display listening on http://{}", addr);

    // SSE connections stay open until the driver stops, so stop it as part of shutdown
    let stop_driver = poller.cancellation_token();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            stop_driver.cancel();
        })
        .await;

    poller.shutdown().await;
    served.context("Server error")?;

    info!("Display shutdown complete");
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
