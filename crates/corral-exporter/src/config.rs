//! Exporter configuration, injected by the daemon.

use std::time::Duration;

use corral_client::ClientConfig;

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Base URL of the orchestrator API.
    pub api_url: String,
    /// Basic-auth access key.
    pub access_key: String,
    /// Basic-auth secret key.
    pub secret_key: String,
    /// Name under which checkpoints are filed in the generic-object store.
    pub checkpoint_name: String,
    /// Skip system stacks and services when scraping.
    pub hide_system: bool,
    /// Time between scrape cycles.
    pub scrape_interval: Duration,
    /// Deadline for one scrape cycle and its HTTP requests. Zero disables.
    pub scrape_timeout: Duration,
    /// Time between checkpoint backups.
    pub backup_interval: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            checkpoint_name: "corral-checkpoint".to_string(),
            hide_system: false,
            scrape_interval: Duration::from_secs(30),
            scrape_timeout: Duration::from_secs(30),
            backup_interval: Duration::from_secs(900),
        }
    }
}

impl ExporterConfig {
    pub(crate) fn client_config(&self, timeout: Duration) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            timeout,
        }
    }
}
