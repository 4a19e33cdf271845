//! nullwire-daemon - Firmware Notarization Daemon
//!
//! Loads configuration, opens the notarization log and status store, and
//! serves the JSON/HTTP binding until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nullwire_core::config::NotaryConfig;
use nullwire_core::ledger::SqliteLedger;
use nullwire_core::status::SqliteStatusStore;
use nullwire_daemon::http;
use nullwire_daemon::service::NotaryService;

/// nullwire daemon - firmware integrity notarization service
#[derive(Parser, Debug)]
#[command(name = "nullwire-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "nullwire.toml")]
    config: PathBuf,

    /// Override the listen address from the config file
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = NotaryConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    let listen_addr = args.listen.unwrap_or_else(|| config.daemon.listen_addr.clone());

    let ledger = SqliteLedger::open(&config.ledger.db_path, &config.ledger.sender)
        .with_context(|| {
            format!(
                "failed to open ledger database at {}",
                config.ledger.db_path.display()
            )
        })?;
    let status = SqliteStatusStore::open(&config.status.db_path).with_context(|| {
        format!(
            "failed to open status database at {}",
            config.status.db_path.display()
        )
    })?;

    let service = Arc::new(NotaryService::new(Arc::new(ledger), Arc::new(status)));
    let app = http::router(service);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(addr = %listen_addr, sender = %config.ledger.sender, "notarization daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(%err, "failed to install SIGTERM handler");
            // Fall back to ctrl-c only.
            let _ = tokio::signal::ctrl_c().await;
            return;
        },
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}
