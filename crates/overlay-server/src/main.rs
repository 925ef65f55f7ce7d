//! overlay-live authority server
//!
//! Axum backend holding the scene document, serving the REST API and the
//! overlay/moderator WebSockets.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::ServerConfig, handler::AppState};

mod config;
mod error;
mod handler;
mod service;

#[derive(Parser, Debug)]
#[command(name = "overlay-server", version, about = "Scene authority for overlay-live")]
struct Args {
    /// JSON config file; defaults are used when it does not exist.
    #[arg(long, default_value = "data/config.json")]
    config: PathBuf,

    /// Overrides the configured port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::load_or_default(&args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        canvas = %format_args!("{}x{}", config.canvas_width, config.canvas_height),
        history_limit = config.history_limit,
        "Config loaded"
    );

    let app = handler::router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Server listening on {addr}");
    tracing::info!("  - Scene API: http://{addr}/api/scene");
    tracing::info!("  - Overlay: ws://{addr}/ws/overlay");
    tracing::info!("  - Moderator: ws://{addr}/ws/moderator");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Failed to listen for ctrl-c");
        return;
    }
    tracing::info!("Shutting down");
}
