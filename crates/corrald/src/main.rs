//! corrald — the corral exporter daemon.
//!
//! Scrapes a container-orchestrator API on a cadence, accounts lifecycle
//! transitions into cumulative counters, and serves them on a Prometheus
//! scrape endpoint. Counters survive restarts through checkpoints written
//! into the orchestrator's generic-object store.
//!
//! # Usage
//!
//! ```text
//! corrald --api-url http://orchestrator:8080/v2-beta \
//!         --access-key KEY --secret-key SECRET \
//!         --port 9173 --scrape-interval 30 --backup-interval 900
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use corral_exporter::{Exporter, ExporterConfig};
use corral_metrics::Metrics;

#[derive(Parser)]
#[command(name = "corrald", about = "Prometheus exporter for a container orchestrator")]
struct Cli {
    /// Port the scrape endpoint listens on.
    #[arg(long, default_value = "9173")]
    port: u16,

    /// Base URL of the orchestrator API.
    #[arg(long)]
    api_url: String,

    /// Basic-auth access key for the orchestrator API.
    #[arg(long, default_value = "")]
    access_key: String,

    /// Basic-auth secret key for the orchestrator API.
    #[arg(long, default_value = "")]
    secret_key: String,

    /// Name under which checkpoints are filed in the generic-object store.
    #[arg(long, default_value = "corral-checkpoint")]
    checkpoint_name: String,

    /// Skip system stacks and services when scraping.
    #[arg(long)]
    hide_system: bool,

    /// Seconds between scrape cycles.
    #[arg(long, default_value = "30")]
    scrape_interval: u64,

    /// Per-scrape deadline in seconds (0 disables the deadline).
    #[arg(long, default_value = "30")]
    scrape_timeout: u64,

    /// Seconds between checkpoint backups.
    #[arg(long, default_value = "900")]
    backup_interval: u64,
}

impl Cli {
    fn exporter_config(&self) -> ExporterConfig {
        ExporterConfig {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            checkpoint_name: self.checkpoint_name.clone(),
            hide_system: self.hide_system,
            scrape_interval: Duration::from_secs(self.scrape_interval),
            scrape_timeout: Duration::from_secs(self.scrape_timeout),
            backup_interval: Duration::from_secs(self.backup_interval),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,corrald=debug,corral_exporter=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    info!(api_url = %cli.api_url, "corral exporter starting");

    // ── Exporter ───────────────────────────────────────────────
    let metrics = Metrics::new()?;
    let exporter = Arc::new(Exporter::new(cli.exporter_config(), metrics)?);

    // Seed counters from the last checkpoint before the first scrape.
    exporter.recover().await;

    // ── Shutdown signal ────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scrape_shutdown = shutdown_rx.clone();
    let backup_shutdown = shutdown_rx;

    // ── Background loops ───────────────────────────────────────
    let scrape_exporter = exporter.clone();
    let scrape_handle = tokio::spawn(async move {
        scrape_exporter.run_scrape_loop(scrape_shutdown).await;
    });

    let backup_exporter = exporter.clone();
    let backup_handle = tokio::spawn(async move {
        backup_exporter.run_backup_loop(backup_shutdown).await;
    });

    // ── Scrape endpoint ────────────────────────────────────────
    let router = corral_api::build_router(exporter);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));

    info!(%addr, "scrape endpoint starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for background loops; the model is not flushed on shutdown,
    // durability comes from the most recent backup.
    let _ = scrape_handle.await;
    let _ = backup_handle.await;

    info!("corral exporter stopped");
    Ok(())
}
