//! drowse - Main entry point
//!
//! Sleep timer service for media playback: wires the timer store, lifecycle
//! engine, expiry sweeper, and event bridge together behind an HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drowse::api::{self, AppContext};
use drowse::bridge::PlaybackEventBridge;
use drowse::config::{Config, ConfigFile};
use drowse::session::MediaServerClient;
use drowse::timer::{sweeper, SleepTimerEngine, TimerStore};

/// Command-line arguments for drowse
#[derive(Parser, Debug)]
#[command(name = "drowse")]
#[command(about = "Sleep timer service for media playback")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "DROWSE_PORT")]
    port: Option<u16>,

    /// Base URL of the host media server
    #[arg(long, env = "DROWSE_MEDIA_SERVER_URL")]
    media_server_url: Option<String>,

    /// API token for media server requests
    #[arg(long, env = "DROWSE_MEDIA_SERVER_TOKEN")]
    media_server_token: Option<String>,

    /// Bearer token required for the privileged timer listing
    #[arg(long, env = "DROWSE_ADMIN_TOKEN")]
    admin_token: Option<String>,

    /// Seconds between expiry sweeps
    #[arg(long, env = "DROWSE_SWEEP_INTERVAL")]
    sweep_interval: Option<u64>,

    /// Optional TOML configuration file
    #[arg(short, long, env = "DROWSE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drowse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let file = match &args.config {
        Some(path) => ConfigFile::load(path).context("Failed to load config file")?,
        None => ConfigFile::default(),
    };
    let config = Config::resolve(
        args.port,
        args.media_server_url,
        args.media_server_token,
        args.admin_token,
        args.sweep_interval,
        file,
    )
    .context("Invalid configuration")?;

    info!("Starting drowse sleep timer service on port {}", config.port);
    info!("Media server: {}", config.media_server_url);

    let media_server = Arc::new(
        MediaServerClient::new(&config.media_server_url, &config.media_server_token)
            .context("Failed to initialize media server client")?,
    );

    let store = Arc::new(TimerStore::new());
    let engine = Arc::new(SleepTimerEngine::new(
        store,
        media_server.clone(),
        media_server.clone(),
    ));
    let bridge = Arc::new(PlaybackEventBridge::new(engine.clone(), media_server));

    // Background expiry sweeper, stopped via the cancellation token on shutdown
    let shutdown = CancellationToken::new();
    let sweeper_handle = sweeper::spawn(engine.clone(), config.sweep_interval, shutdown.clone());

    let ctx = AppContext {
        engine,
        bridge,
        admin_token: config.admin_token.clone(),
    };
    let app = api::create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown.cancel();
    let _ = sweeper_handle.await;

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
