//! In-process fake of the orchestrator API.
//!
//! Backed by a shared mutable state so tests can change the world between
//! scrape cycles. List endpoints answer the standard
//! `{data, pagination}` envelope; the generic-object store honours the
//! create/remove protocol the checkpoint manager relies on.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use corral_exporter::{Exporter, ExporterConfig};
use corral_metrics::Metrics;

#[derive(Default)]
pub struct FakeApi {
    pub hosts: Vec<Value>,
    pub projects: Vec<Value>,
    /// project id → stacks
    pub stacks: HashMap<String, Vec<Value>>,
    /// stack id → services
    pub services: HashMap<String, Vec<Value>>,
    /// service id → instances
    pub instances: HashMap<String, Vec<Value>>,
    pub generic_objects: Vec<Value>,
    /// When set, POST /genericobjects answers 500 and stores nothing.
    pub fail_create: bool,
    /// Every list request seen, as `path?query`, for URL assertions.
    pub requests: Vec<String>,
    next_object_id: u64,
}

pub type SharedApi = Arc<RwLock<FakeApi>>;

pub fn shared() -> SharedApi {
    Arc::new(RwLock::new(FakeApi::default()))
}

pub async fn start(api: SharedApi) -> String {
    let router = Router::new()
        .route("/projects", get(list_projects))
        .route("/hosts", get(list_hosts))
        .route("/projects/{id}/stacks", get(list_stacks))
        .route("/stacks/{id}/services", get(list_services))
        .route("/services/{id}/instances", get(list_instances))
        .route(
            "/genericobjects",
            get(list_generic_objects).post(create_generic_object),
        )
        .route("/genericobjects/{id}", post(remove_generic_object))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn test_exporter(base_url: &str) -> Exporter {
    Exporter::new(
        ExporterConfig {
            api_url: base_url.to_string(),
            access_key: "access".to_string(),
            secret_key: "secret".to_string(),
            ..ExporterConfig::default()
        },
        Metrics::new().unwrap(),
    )
    .unwrap()
}

// ── Object builders ────────────────────────────────────────────

pub fn project(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name})
}

pub fn host(id: &str, name: &str, hostname: &str, state: &str, agent_state: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "hostname": hostname,
        "state": state,
        "agentState": agent_state,
    })
}

pub fn stack(id: &str, name: &str, state: &str, health: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "state": state,
        "healthState": health,
        "system": false,
        "type": "stack",
    })
}

pub fn service(id: &str, name: &str, state: &str, health: &str, scale: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "state": state,
        "healthState": health,
        "system": false,
        "type": "service",
        "scale": scale,
    })
}

pub fn instance(id: &str, name: &str, state: &str, created_ts: u64, first_running_ts: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "state": state,
        "system": false,
        "type": "container",
        "createdTS": created_ts,
        "firstRunningTS": first_running_ts,
    })
}

// ── Handlers ───────────────────────────────────────────────────

fn page(data: Vec<Value>) -> Json<Value> {
    Json(json!({"data": data, "pagination": {}}))
}

async fn list_projects(State(api): State<SharedApi>) -> Json<Value> {
    page(api.read().await.projects.clone())
}

async fn list_hosts(State(api): State<SharedApi>) -> Json<Value> {
    page(api.read().await.hosts.clone())
}

async fn list_stacks(
    State(api): State<SharedApi>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    let mut api = api.write().await;
    api.requests
        .push(format!("/projects/{id}/stacks?{}", query.unwrap_or_default()));
    page(api.stacks.get(&id).cloned().unwrap_or_default())
}

async fn list_services(
    State(api): State<SharedApi>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    let mut api = api.write().await;
    api.requests
        .push(format!("/stacks/{id}/services?{}", query.unwrap_or_default()));
    page(api.services.get(&id).cloned().unwrap_or_default())
}

async fn list_instances(
    State(api): State<SharedApi>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    let mut api = api.write().await;
    api.requests
        .push(format!("/services/{id}/instances?{}", query.unwrap_or_default()));
    page(api.instances.get(&id).cloned().unwrap_or_default())
}

#[derive(serde::Deserialize)]
struct ObjectQuery {
    name: Option<String>,
    kind: Option<String>,
    key: Option<String>,
    action: Option<String>,
}

async fn list_generic_objects(
    State(api): State<SharedApi>,
    Query(query): Query<ObjectQuery>,
) -> Json<Value> {
    let api = api.read().await;
    let matches = |object: &Value, field: &str, wanted: &Option<String>| match wanted {
        Some(wanted) => object[field].as_str() == Some(wanted.as_str()),
        None => true,
    };
    let data: Vec<Value> = api
        .generic_objects
        .iter()
        .filter(|o| {
            matches(o, "name", &query.name)
                && matches(o, "kind", &query.kind)
                && matches(o, "key", &query.key)
        })
        .cloned()
        .collect();
    page(data)
}

async fn create_generic_object(
    State(api): State<SharedApi>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut api = api.write().await;
    if api.fail_create {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    api.next_object_id += 1;
    let mut object = body;
    object["id"] = json!(format!("1go{}", api.next_object_id));
    api.generic_objects.push(object);
    StatusCode::CREATED
}

async fn remove_generic_object(
    State(api): State<SharedApi>,
    Path(id): Path<String>,
    Query(query): Query<ObjectQuery>,
) -> StatusCode {
    if query.action.as_deref() != Some("remove") {
        return StatusCode::BAD_REQUEST;
    }
    let mut api = api.write().await;
    let before = api.generic_objects.len();
    api.generic_objects
        .retain(|o| o["id"].as_str() != Some(id.as_str()));
    if api.generic_objects.len() < before {
        StatusCode::ACCEPTED
    } else {
        StatusCode::NOT_FOUND
    }
}
