//! Checkpoint backup/recovery against the fake generic-object store.

mod common;

use common::*;

use serde_json::json;

use corral_model::Project;

const STACK_LABELS: [&str; 4] = ["env", "stk", "false", "stack"];

/// Drive the stack through active → error → active(unhealthy) so the
/// counters end at bootstrap=3, failure=2.
async fn build_history(api: &SharedApi, base: &str) -> corral_exporter::Exporter {
    api.write().await.projects = vec![project("1a1", "env")];
    let exporter = test_exporter(base);

    for (state, health) in [
        ("active", "healthy"),
        ("error", "unhealthy"),
        ("active", "unhealthy"),
    ] {
        api.write()
            .await
            .stacks
            .insert("1a1".to_string(), vec![stack("1st1", "stk", state, health)]);
        exporter.scrape().await;
    }

    let metrics = exporter.metrics();
    assert_eq!(
        metrics
            .stack_bootstrap_total
            .with_label_values(&STACK_LABELS)
            .get(),
        3.0
    );
    assert_eq!(
        metrics
            .stack_failure_total
            .with_label_values(&STACK_LABELS)
            .get(),
        2.0
    );
    exporter
}

#[tokio::test]
async fn recovery_seeds_counters_from_the_checkpoint() {
    let api = shared();
    let base = start(api.clone()).await;
    let exporter = build_history(&api, &base).await;

    exporter.backup().await;
    assert_eq!(api.read().await.generic_objects.len(), 1);

    // A fresh process with an empty registry recovers the totals.
    let restarted = test_exporter(&base);
    restarted.recover().await;

    let metrics = restarted.metrics();
    assert_eq!(
        metrics
            .stack_bootstrap_total
            .with_label_values(&STACK_LABELS)
            .get(),
        3.0
    );
    assert_eq!(
        metrics
            .stack_failure_total
            .with_label_values(&STACK_LABELS)
            .get(),
        2.0
    );
}

#[tokio::test]
async fn checkpoint_round_trip_preserves_the_project() {
    let api = shared();
    let base = start(api.clone()).await;

    api.write().await.projects = vec![project("1a1", "env")];
    api.write()
        .await
        .stacks
        .insert("1a1".to_string(), vec![stack("1st1", "stk", "active", "healthy")]);
    api.write().await.services.insert(
        "1st1".to_string(),
        vec![service("1s1", "svc", "active", "healthy", 2)],
    );
    api.write().await.instances.insert(
        "1s1".to_string(),
        vec![instance("1i1", "ins", "running", 1000, 1250)],
    );

    let exporter = test_exporter(&base);
    exporter.scrape().await;
    exporter.backup().await;

    let first: Project = serde_json::from_value(
        api.read().await.generic_objects[0]["resourceData"].clone(),
    )
    .unwrap();

    // A restarted exporter recovers the tree and writes it back unchanged.
    let restarted = test_exporter(&base);
    restarted.recover().await;
    restarted.backup().await;

    let objects = api.read().await.generic_objects.clone();
    assert_eq!(objects.len(), 1);
    let second: Project = serde_json::from_value(objects[0]["resourceData"].clone()).unwrap();
    assert_eq!(second, first);

    let instance = &second.stacks["stk"].services["svc"].instances["ins"];
    assert_eq!(instance.bootstrap_count, 1);
    assert_eq!(instance.startup_time, 250);
}

#[tokio::test]
async fn recovery_restores_the_startup_gauge() {
    let api = shared();
    let base = start(api.clone()).await;

    api.write().await.projects = vec![project("1a1", "env")];
    api.write()
        .await
        .stacks
        .insert("1a1".to_string(), vec![stack("1st1", "stk", "active", "healthy")]);
    api.write().await.services.insert(
        "1st1".to_string(),
        vec![service("1s1", "svc", "active", "healthy", 1)],
    );
    api.write().await.instances.insert(
        "1s1".to_string(),
        vec![instance("1i1", "ins", "running", 1000, 1250)],
    );

    let exporter = test_exporter(&base);
    exporter.scrape().await;
    exporter.backup().await;

    let restarted = test_exporter(&base);
    restarted.recover().await;

    assert_eq!(
        restarted
            .metrics()
            .instance_startup_ms
            .with_label_values(&["env", "stk", "svc", "ins", "false", "container"])
            .get(),
        250.0
    );
}

#[tokio::test]
async fn recovery_picks_the_last_checkpoint_in_server_order() {
    let api = shared();
    let base = start(api.clone()).await;

    api.write().await.projects = vec![project("1a1", "env")];
    let old_stack = |bootstrap: u64| {
        json!({
            "id": "1go-old",
            "kind": "corralMetrics",
            "name": "corral-checkpoint",
            "key": "1a1",
            "resourceData": {
                "id": "1a1",
                "name": "env",
                "stacks": {
                    "stk": {
                        "id": "1st1",
                        "name": "stk",
                        "state": "active",
                        "type": "stack",
                        "bootstrapCount": bootstrap,
                        "failureCount": 0,
                        "system": false,
                    }
                }
            }
        })
    };
    {
        let mut api = api.write().await;
        api.generic_objects.push(old_stack(5));
        api.generic_objects.push(old_stack(9));
    }

    let exporter = test_exporter(&base);
    exporter.recover().await;

    assert_eq!(
        exporter
            .metrics()
            .stack_bootstrap_total
            .with_label_values(&STACK_LABELS)
            .get(),
        9.0
    );
}

#[tokio::test]
async fn backup_replaces_previous_checkpoints() {
    let api = shared();
    let base = start(api.clone()).await;
    let exporter = build_history(&api, &base).await;

    // Two leftovers from interrupted earlier runs.
    {
        let mut api = api.write().await;
        for id in ["A", "B"] {
            api.generic_objects.push(json!({
                "id": id,
                "kind": "corralMetrics",
                "name": "corral-checkpoint",
                "key": "1a1",
                "resourceData": {"id": "1a1", "name": "env"},
            }));
        }
    }

    exporter.backup().await;

    let objects = api.read().await.generic_objects.clone();
    assert_eq!(objects.len(), 1);
    let id = objects[0]["id"].as_str().unwrap();
    assert!(id != "A" && id != "B");
}

#[tokio::test]
async fn failed_create_retains_previous_checkpoints() {
    let api = shared();
    let base = start(api.clone()).await;
    let exporter = build_history(&api, &base).await;

    {
        let mut api = api.write().await;
        for id in ["A", "B"] {
            api.generic_objects.push(json!({
                "id": id,
                "kind": "corralMetrics",
                "name": "corral-checkpoint",
                "key": "1a1",
                "resourceData": {"id": "1a1", "name": "env"},
            }));
        }
        api.fail_create = true;
    }

    exporter.backup().await;

    let objects = api.read().await.generic_objects.clone();
    let ids: Vec<&str> = objects.iter().filter_map(|o| o["id"].as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}

#[tokio::test]
async fn counters_only_grow_across_backup_recover_cycles() {
    let api = shared();
    let base = start(api.clone()).await;
    let exporter = build_history(&api, &base).await;
    exporter.backup().await;

    let restarted = test_exporter(&base);
    restarted.recover().await;

    // More churn after the restart keeps growing from the recovered base.
    api.write()
        .await
        .stacks
        .insert("1a1".to_string(), vec![stack("1st1", "stk", "error", "unhealthy")]);
    restarted.scrape().await;

    let metrics = restarted.metrics();
    assert_eq!(
        metrics
            .stack_bootstrap_total
            .with_label_values(&STACK_LABELS)
            .get(),
        4.0
    );
    assert_eq!(
        metrics
            .stack_failure_total
            .with_label_values(&STACK_LABELS)
            .get(),
        3.0
    );
}
