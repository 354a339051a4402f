//! Replix Server binary
//!
//! Runs either a primary (query proxy + write path) or a replica
//! (replicated write sink), depending on configuration.

use clap::Parser;
use replix_server::{ReplixServer, config::Config};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Replix Server CLI arguments
#[derive(Parser, Debug)]
#[command(name = "replix-server")]
#[command(about = "Replix query proxy and replication server", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// TOML config file (defaults to ./replix.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "replix_server=debug,replix_core=debug,tower_http=debug".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "replix_server=info,replix_core=warn,tower_http=error".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(args.config.as_deref())?;
    std::fs::create_dir_all(&config.data_dir)?;

    let server = ReplixServer::from_config(&config)?;
    let app = server.router();

    let listener = TcpListener::bind(config.addr).await?;
    info!(
        role = %config.role,
        log = ?config.log_path(),
        "Replix Server listening on {}",
        config.addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Replix Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
