//! corral-model — the in-memory orchestrator tree.
//!
//! The model mirrors the orchestrator hierarchy: projects contain stacks,
//! stacks contain services, services contain instances. Every node carries
//! the cumulative lifecycle counters the exporter accounts for it.
//!
//! Nodes are keyed by **name** within their parent so they survive ID churn
//! (an orchestrator may delete and re-create an object under the same name
//! with a fresh ID). IDs are refreshed on every sighting. Nothing is ever
//! removed during a scrape; a restart recovered from a checkpoint is the
//! only compaction event.
//!
//! All types serialize to the checkpoint wire format (camelCase field
//! names) stored in the orchestrator's generic-object store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root of the model: project name → project.
///
/// The exporter guards the whole tree with a single readers-writer lock at
/// this level; the types here carry no locking of their own.
#[derive(Debug, Default)]
pub struct Model {
    pub projects: HashMap<String, Project>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a project under `name`, or refresh the ID of an existing one.
    pub fn upsert_project(&mut self, name: &str, id: &str) {
        match self.projects.get_mut(name) {
            Some(project) => project.id = id.to_string(),
            None => {
                self.projects
                    .insert(name.to_string(), Project::new(id, name));
            }
        }
    }
}

/// A top-level tenant namespace (environment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bootstrap_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub stacks: HashMap<String, Stack>,
}

impl Project {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            state: String::new(),
            kind: String::new(),
            bootstrap_count: 0,
            failure_count: 0,
            stacks: HashMap::new(),
        }
    }
}

/// An application-level grouping of services within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bootstrap_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub services: HashMap<String, Service>,
}

/// A scalable workload definition within a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bootstrap_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub instances: HashMap<String, Instance>,
}

/// A running container within a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bootstrap_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub system: bool,
    /// Milliseconds from creation to first running, 0 if never observed.
    #[serde(default)]
    pub startup_time: u64,
}
