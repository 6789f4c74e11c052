//! corral-exporter — the scrape & lifecycle-accounting engine.
//!
//! The [`Exporter`] owns the in-memory tree model and drives two periodic
//! jobs against the orchestrator API:
//!
//! - **scrape** — refresh the tree level by level (hosts, projects, stacks,
//!   services, instances), diff each observation against the model, and
//!   account state transitions into cumulative counters;
//! - **backup** — checkpoint every project subtree (counters included)
//!   into the orchestrator's generic-object store, so a restarted process
//!   can [`Exporter::recover`] its counters instead of starting from zero.
//!
//! A single readers-writer lock at the model root serializes everything:
//! a scrape holds the writer half for its whole cycle, while `/metrics`
//! collection and backups take the reader half and may overlap each other
//! but never a scrape.

mod checkpoint;
mod config;
mod scrape;
mod transitions;

pub use config::ExporterConfig;

use std::sync::Arc;
use std::time::Duration;

use prometheus::proto::MetricFamily;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use corral_client::{Client, ClientError};
use corral_metrics::Metrics;
use corral_model::Model;

pub struct Exporter {
    cfg: ExporterConfig,
    model: RwLock<Model>,
    /// Client used by scrape cycles; carries the per-request scrape timeout.
    scrape_client: Client,
    /// Client used for checkpoint recovery and backup; no timeout, a slow
    /// generic-object store must not truncate a checkpoint.
    store_client: Client,
    metrics: Metrics,
}

impl Exporter {
    pub fn new(cfg: ExporterConfig, metrics: Metrics) -> Result<Self, ClientError> {
        let scrape_client = Client::new(cfg.client_config(cfg.scrape_timeout))?;
        let store_client = Client::new(cfg.client_config(Duration::ZERO))?;
        Ok(Self {
            cfg,
            model: RwLock::new(Model::new()),
            scrape_client,
            store_client,
            metrics,
        })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Collect every series under the model reader lock.
    ///
    /// Blocks while a scrape (writer) is in flight, so collected counters
    /// are never observed mid-increment; concurrent readers proceed freely.
    pub async fn gather(&self) -> Vec<MetricFamily> {
        let _model = self.model.read().await;
        self.metrics.gather()
    }

    /// Run scrape cycles until shutdown.
    ///
    /// Nothing a cycle does can terminate the loop: each cycle runs in its
    /// own task so a panic surfaces as a join error here, and the scrape
    /// timeout (when non-zero) abandons an overrunning cycle at its next
    /// suspension point.
    pub async fn run_scrape_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval = ?self.cfg.scrape_interval,
            timeout = ?self.cfg.scrape_timeout,
            "scrape loop started"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.cfg.scrape_interval) => scrape_cycle(&self).await,
                _ = shutdown.changed() => {
                    info!("scrape loop shutting down");
                    break;
                }
            }
        }
    }

    /// Run checkpoint backups until shutdown.
    pub async fn run_backup_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?self.cfg.backup_interval, "backup loop started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.cfg.backup_interval) => {
                    let exporter = Arc::clone(&self);
                    if let Err(error) = tokio::spawn(async move { exporter.backup().await }).await {
                        warn!(%error, "backup cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("backup loop shutting down");
                    break;
                }
            }
        }
    }
}

/// One deadline-bounded, panic-isolated scrape cycle.
async fn scrape_cycle(exporter: &Arc<Exporter>) {
    let worker = Arc::clone(exporter);
    let mut cycle = tokio::spawn(async move { worker.scrape().await });

    let joined = if exporter.cfg.scrape_timeout.is_zero() {
        (&mut cycle).await
    } else {
        match tokio::time::timeout(exporter.cfg.scrape_timeout, &mut cycle).await {
            Ok(joined) => joined,
            Err(_) => {
                cycle.abort();
                warn!(
                    timeout = ?exporter.cfg.scrape_timeout,
                    "scrape deadline expired, cycle abandoned"
                );
                return;
            }
        }
    };
    if let Err(error) = joined {
        warn!(%error, "scrape cycle failed");
    }
}
