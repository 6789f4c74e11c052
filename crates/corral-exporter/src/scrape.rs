//! The snapshot walker: one scrape cycle over the orchestrator tree.
//!
//! A cycle runs under the model **writer** lock start to end. The hosts
//! branch and the project tree branch run concurrently; within the tree,
//! each level's HTTP fetches fan out unbounded in a [`JoinSet`] and the
//! results are applied in the scrape task, so a parent is always upserted
//! before any of its children are observed. There is no cross-subtree
//! ordering guarantee.
//!
//! A failed fetch is an empty page at the client layer and a panicked
//! fetch task surfaces as a join error here; either way the node is
//! skipped and the cycle continues.

use tokio::task::JoinSet;
use tracing::{debug, warn};

use corral_client::{RawHost, RawInstance, RawProject, RawService, RawStack};
use corral_metrics::states;
use corral_model::Model;

use crate::transitions;
use crate::Exporter;

impl Exporter {
    /// Run one scrape cycle.
    pub async fn scrape(&self) {
        let mut model = self.model.write().await;
        debug!("scrape cycle started");

        self.metrics.reset_per_scrape();
        tokio::join!(self.scrape_hosts(), self.scrape_tree(&mut model));

        debug!("scrape cycle finished");
    }

    /// Refresh host gauges from a single `/hosts` page.
    async fn scrape_hosts(&self) {
        let url = self.scrape_client.url("/hosts");
        let page = self.scrape_client.get_page::<RawHost>(&url).await;

        for host in &page.data {
            let name = if host.name.is_empty() {
                host.hostname.as_str()
            } else {
                host.name.as_str()
            };

            for &state in states::HOST_STATES {
                let value = if host.state == state { 1.0 } else { 0.0 };
                self.metrics
                    .host_state
                    .with_label_values(&[host.id.as_str(), name, state])
                    .set(value);
            }
            for &state in states::AGENT_STATES {
                let value = if host.agent_state == state { 1.0 } else { 0.0 };
                self.metrics
                    .host_agent_state
                    .with_label_values(&[host.id.as_str(), name, state])
                    .set(value);
            }
        }
    }

    /// Refresh the project → stack → service → instance tree.
    async fn scrape_tree(&self, model: &mut Model) {
        let url = self.scrape_client.url("/projects");
        let page = self.scrape_client.get_page::<RawProject>(&url).await;
        for project in &page.data {
            model.upsert_project(&project.name, &project.id);
        }

        self.refresh_stacks(model).await;
        self.refresh_services(model).await;
        self.refresh_instances(model).await;
    }

    async fn refresh_stacks(&self, model: &mut Model) {
        let mut fetches = JoinSet::new();
        for project in model.projects.values() {
            if project.id.is_empty() {
                continue;
            }
            let client = self.scrape_client.clone();
            let url = self.stacks_url(&project.id);
            let project_name = project.name.clone();
            fetches.spawn(async move {
                debug!(project = %project_name, "fetching stacks");
                let stacks = client.get_all::<RawStack>(&url).await;
                (project_name, stacks)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            let (project_name, stacks) = match joined {
                Ok(result) => result,
                Err(error) => {
                    warn!(%error, "stack fetch task failed");
                    continue;
                }
            };
            let Some(project) = model.projects.get_mut(&project_name) else {
                continue;
            };
            for raw in stacks {
                transitions::observe_stack(&self.metrics, &project.name, &mut project.stacks, raw);
            }
        }
    }

    async fn refresh_services(&self, model: &mut Model) {
        let mut fetches = JoinSet::new();
        for project in model.projects.values() {
            for stack in project.stacks.values() {
                if stack.id.is_empty() {
                    continue;
                }
                let client = self.scrape_client.clone();
                let url = self.services_url(&stack.id);
                let project_name = project.name.clone();
                let stack_name = stack.name.clone();
                fetches.spawn(async move {
                    debug!(project = %project_name, stack = %stack_name, "fetching services");
                    let services = client.get_all::<RawService>(&url).await;
                    (project_name, stack_name, services)
                });
            }
        }

        while let Some(joined) = fetches.join_next().await {
            let (project_name, stack_name, services) = match joined {
                Ok(result) => result,
                Err(error) => {
                    warn!(%error, "service fetch task failed");
                    continue;
                }
            };
            let Some(stack) = model
                .projects
                .get_mut(&project_name)
                .and_then(|project| project.stacks.get_mut(&stack_name))
            else {
                continue;
            };
            for raw in services {
                transitions::observe_service(&self.metrics, &project_name, stack, raw);
            }
        }
    }

    async fn refresh_instances(&self, model: &mut Model) {
        let mut fetches = JoinSet::new();
        for project in model.projects.values() {
            for stack in project.stacks.values() {
                for service in stack.services.values() {
                    if service.id.is_empty() {
                        continue;
                    }
                    let client = self.scrape_client.clone();
                    let url = self.instances_url(&service.id);
                    let project_name = project.name.clone();
                    let stack_name = stack.name.clone();
                    let service_name = service.name.clone();
                    fetches.spawn(async move {
                        debug!(
                            project = %project_name,
                            stack = %stack_name,
                            service = %service_name,
                            "fetching instances"
                        );
                        let instances = client.get_all::<RawInstance>(&url).await;
                        (project_name, stack_name, service_name, instances)
                    });
                }
            }
        }

        while let Some(joined) = fetches.join_next().await {
            let (project_name, stack_name, service_name, instances) = match joined {
                Ok(result) => result,
                Err(error) => {
                    warn!(%error, "instance fetch task failed");
                    continue;
                }
            };
            let Some(service) = model
                .projects
                .get_mut(&project_name)
                .and_then(|project| project.stacks.get_mut(&stack_name))
                .and_then(|stack| stack.services.get_mut(&service_name))
            else {
                continue;
            };
            for raw in instances {
                transitions::observe_instance(&self.metrics, &project_name, &stack_name, service, raw);
            }
        }
    }

    fn stacks_url(&self, project_id: &str) -> String {
        let mut url = self
            .scrape_client
            .url(&format!("/projects/{project_id}/stacks?limit=100&sort=id"));
        if self.cfg.hide_system {
            url.push_str("&system=false");
        }
        url
    }

    fn services_url(&self, stack_id: &str) -> String {
        let mut url = self
            .scrape_client
            .url(&format!("/stacks/{stack_id}/services?limit=100&sort=id"));
        if self.cfg.hide_system {
            url.push_str("&system=false");
        }
        url
    }

    // Instances are never filtered by `system`; the flag only applies to
    // stacks and services.
    fn instances_url(&self, service_id: &str) -> String {
        self.scrape_client
            .url(&format!("/services/{service_id}/instances?limit=100&sort=id"))
    }
}
