//! Checkpointing: counter durability across restarts.
//!
//! Each project subtree (counters included) is serialised into the
//! orchestrator's own generic-object store under a constant kind, the
//! configured object name, and the project ID as key. Backup always
//! creates the new record **before** deleting the ones it found earlier,
//! so at least one valid checkpoint per project survives any partial
//! failure; a failed create leaves the previous records untouched and the
//! next cycle converges.

use std::collections::HashMap;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use corral_client::{Client, RawGenericObject, RawProject, StatusCode};
use corral_metrics::Metrics;
use corral_model::Project;

use crate::transitions::system_label;
use crate::Exporter;

const GENERIC_OBJECT_KIND: &str = "corralMetrics";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointEnvelope<'a> {
    kind: &'static str,
    name: &'a str,
    key: &'a str,
    resource_data: &'a Project,
}

impl Exporter {
    /// Rebuild the model and re-seed counter series from the latest
    /// checkpoint of every project. Runs once at startup, before the
    /// scrape and backup loops are spawned.
    pub async fn recover(&self) {
        let mut model = self.model.write().await;
        debug!("recovering checkpointed counters");

        let url = self.store_client.url("/projects");
        let page = self.store_client.get_page::<RawProject>(&url).await;
        for project in &page.data {
            model.upsert_project(&project.name, &project.id);
        }

        let mut fetches = JoinSet::new();
        for project in model.projects.values() {
            if project.id.is_empty() {
                continue;
            }
            let client = self.store_client.clone();
            let url = self.checkpoint_query_url(Some(&project.id));
            let project_name = project.name.clone();
            fetches.spawn(async move {
                let page = client.get_page::<RawGenericObject>(&url).await;
                // Several checkpoints may coexist after an interrupted
                // backup; the last one in server order is the newest.
                let snapshot = page.data.into_iter().last().and_then(|o| o.resource_data);
                (project_name, snapshot)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((project_name, Some(snapshot))) => {
                    if let Some(project) = model.projects.get_mut(&project_name) {
                        seed_project(&self.metrics, project, snapshot);
                        info!(project = %project_name, "counters recovered from checkpoint");
                    }
                }
                Ok((_, None)) => {}
                Err(error) => warn!(%error, "checkpoint fetch task failed"),
            }
        }

        debug!("recovery finished");
    }

    /// Write one checkpoint per project, then delete the ones that were
    /// present beforehand. Holds the model **reader** lock throughout, so
    /// a concurrent scrape cannot produce a torn snapshot.
    pub async fn backup(&self) {
        let model = self.model.read().await;
        debug!("checkpoint backup started");

        let url = self.checkpoint_query_url(None);
        let page = self.store_client.get_page::<RawGenericObject>(&url).await;
        let mut stale: HashMap<String, Vec<String>> = HashMap::new();
        for object in page.data {
            stale.entry(object.key).or_default().push(object.id);
        }

        let mut writes = JoinSet::new();
        for project in model.projects.values() {
            let envelope = CheckpointEnvelope {
                kind: GENERIC_OBJECT_KIND,
                name: &self.cfg.checkpoint_name,
                key: &project.id,
                resource_data: project,
            };
            let payload = match serde_json::to_string(&envelope) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(project = %project.name, %error, "failed to serialize checkpoint");
                    continue;
                }
            };
            let stale_ids = stale.get(&project.id).cloned().unwrap_or_default();
            let client = self.store_client.clone();
            let project_name = project.name.clone();
            writes.spawn(async move {
                backup_project(client, project_name, payload, stale_ids).await;
            });
        }

        while let Some(joined) = writes.join_next().await {
            if let Err(error) = joined {
                warn!(%error, "checkpoint write task failed");
            }
        }

        debug!("checkpoint backup finished");
    }

    fn checkpoint_query_url(&self, key: Option<&str>) -> String {
        let mut url = format!(
            "{}?name={}",
            self.store_client.url("/genericobjects"),
            self.cfg.checkpoint_name
        );
        if let Some(key) = key {
            url.push_str(&format!("&key={key}"));
        }
        url.push_str(&format!("&kind={GENERIC_OBJECT_KIND}"));
        url
    }
}

/// Create the new checkpoint; only on `201 Created` delete the stale ones.
async fn backup_project(client: Client, project: String, payload: String, stale_ids: Vec<String>) {
    let url = client.url("/genericobjects");
    let status = match client.post(&url, Some(payload)).await {
        Ok(status) => status,
        Err(error) => {
            warn!(%project, %error, "checkpoint create failed, keeping previous records");
            return;
        }
    };
    if status != StatusCode::CREATED {
        warn!(%project, %status, "checkpoint create rejected, keeping previous records");
        return;
    }

    for id in stale_ids {
        let url = client.url(&format!("/genericobjects/{id}?action=remove"));
        match client.post(&url, None).await {
            Ok(status) if status == StatusCode::ACCEPTED => {}
            Ok(status) => warn!(%project, %status, "stale checkpoint removal rejected"),
            Err(error) => warn!(%project, %error, "stale checkpoint removal failed"),
        }
    }
}

/// Rehydrate one recovered subtree into the live project and seed the
/// counter series with the checkpointed totals.
fn seed_project(metrics: &Metrics, project: &mut Project, snapshot: Project) {
    let env_name = project.name.clone();

    for (stack_name, stack) in snapshot.stacks {
        {
            let labels = [
                env_name.as_str(),
                stack_name.as_str(),
                system_label(stack.system),
                stack.kind.as_str(),
            ];
            metrics
                .stack_bootstrap_total
                .with_label_values(&labels)
                .inc_by(stack.bootstrap_count as f64);
            metrics
                .stack_failure_total
                .with_label_values(&labels)
                .inc_by(stack.failure_count as f64);
        }

        for (service_name, service) in &stack.services {
            let labels = [
                env_name.as_str(),
                stack_name.as_str(),
                service_name.as_str(),
                system_label(service.system),
                service.kind.as_str(),
            ];
            metrics
                .service_bootstrap_total
                .with_label_values(&labels)
                .inc_by(service.bootstrap_count as f64);
            metrics
                .service_failure_total
                .with_label_values(&labels)
                .inc_by(service.failure_count as f64);

            for (instance_name, instance) in &service.instances {
                let labels = [
                    env_name.as_str(),
                    stack_name.as_str(),
                    service_name.as_str(),
                    instance_name.as_str(),
                    system_label(instance.system),
                    instance.kind.as_str(),
                ];
                metrics
                    .instance_bootstrap_total
                    .with_label_values(&labels)
                    .inc_by(instance.bootstrap_count as f64);
                metrics
                    .instance_failure_total
                    .with_label_values(&labels)
                    .inc_by(instance.failure_count as f64);
                metrics
                    .instance_startup_ms
                    .with_label_values(&labels)
                    .set(instance.startup_time as f64);
            }
        }

        project.stacks.insert(stack_name, stack);
    }
}
