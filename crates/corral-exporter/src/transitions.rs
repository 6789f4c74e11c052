//! Transition accounting: map one observation of a node to gauge updates
//! and at-most-once counter increments.
//!
//! The rules are diff-driven: an observation only increments counters when
//! the state *changed* since the previous sighting (or the node is new).
//! Entering `active`/`running`/`stopped` counts as a bootstrap; entering
//! `error` counts as a bootstrap and a failure; entering `active` while
//! unhealthy counts as a failure too. A node oscillating through
//! `active → upgrading → active` is counted on each return to `active`.
//!
//! New nodes observed in any other state still *touch* their counter
//! label series so the series is exported at 0.

use std::collections::HashMap;

use corral_client::{RawInstance, RawService, RawStack};
use corral_metrics::{states, Metrics};
use corral_model::{Instance, Service, Stack};

pub(crate) fn system_label(system: bool) -> &'static str {
    if system {
        "true"
    } else {
        "false"
    }
}

pub(crate) fn observe_stack(
    metrics: &Metrics,
    env_name: &str,
    stacks: &mut HashMap<String, Stack>,
    raw: RawStack,
) {
    let system = system_label(raw.system);

    for &health in states::HEALTH_STATES {
        let value = if raw.health_state == health { 1.0 } else { 0.0 };
        metrics
            .stack_health
            .with_label_values(&[raw.id.as_str(), raw.name.as_str(), health, system])
            .set(value);
    }
    for &state in states::STACK_STATES {
        let value = if raw.state == state { 1.0 } else { 0.0 };
        metrics
            .stack_state
            .with_label_values(&[raw.id.as_str(), raw.name.as_str(), state, system])
            .set(value);
    }

    let labels = [env_name, raw.name.as_str(), system, raw.kind.as_str()];
    metrics.stack_heartbeat.with_label_values(&labels).set(1.0);

    match stacks.get_mut(&raw.name) {
        Some(node) => {
            if node.state != raw.state {
                match raw.state.as_str() {
                    "active" => {
                        metrics.stack_bootstrap_total.with_label_values(&labels).inc();
                        node.bootstrap_count += 1;
                        if raw.health_state == "unhealthy" {
                            metrics.stack_failure_total.with_label_values(&labels).inc();
                            node.failure_count += 1;
                        }
                    }
                    "error" => {
                        metrics.stack_bootstrap_total.with_label_values(&labels).inc();
                        node.bootstrap_count += 1;
                        metrics.stack_failure_total.with_label_values(&labels).inc();
                        node.failure_count += 1;
                    }
                    _ => {}
                }
            }
            node.id = raw.id;
            node.kind = raw.kind;
            node.state = raw.state;
            node.system = raw.system;
        }
        None => {
            let mut bootstrap_count = 0;
            let mut failure_count = 0;
            match raw.state.as_str() {
                "active" => {
                    metrics.stack_bootstrap_total.with_label_values(&labels).inc();
                    bootstrap_count = 1;
                    if raw.health_state == "unhealthy" {
                        metrics.stack_failure_total.with_label_values(&labels).inc();
                        failure_count = 1;
                    } else {
                        metrics.stack_failure_total.with_label_values(&labels);
                    }
                }
                "error" => {
                    metrics.stack_bootstrap_total.with_label_values(&labels).inc();
                    bootstrap_count = 1;
                    metrics.stack_failure_total.with_label_values(&labels).inc();
                    failure_count = 1;
                }
                _ => {
                    metrics.stack_bootstrap_total.with_label_values(&labels);
                    metrics.stack_failure_total.with_label_values(&labels);
                }
            }
            stacks.insert(
                raw.name.clone(),
                Stack {
                    id: raw.id,
                    name: raw.name,
                    state: raw.state,
                    kind: raw.kind,
                    bootstrap_count,
                    failure_count,
                    system: raw.system,
                    services: HashMap::new(),
                },
            );
        }
    }
}

pub(crate) fn observe_service(
    metrics: &Metrics,
    env_name: &str,
    stack: &mut Stack,
    raw: RawService,
) {
    let system = system_label(raw.system);

    metrics
        .service_scale
        .with_label_values(&[raw.name.as_str(), stack.name.as_str(), system])
        .set(raw.scale as f64);
    for &health in states::HEALTH_STATES {
        let value = if raw.health_state == health { 1.0 } else { 0.0 };
        metrics
            .service_health
            .with_label_values(&[
                raw.id.as_str(),
                stack.id.as_str(),
                raw.name.as_str(),
                stack.name.as_str(),
                health,
                system,
            ])
            .set(value);
    }
    for &state in states::SERVICE_STATES {
        let value = if raw.state == state { 1.0 } else { 0.0 };
        metrics
            .service_state
            .with_label_values(&[
                raw.id.as_str(),
                stack.id.as_str(),
                raw.name.as_str(),
                stack.name.as_str(),
                state,
                system,
            ])
            .set(value);
    }

    let labels = [
        env_name,
        stack.name.as_str(),
        raw.name.as_str(),
        system,
        raw.kind.as_str(),
    ];
    metrics.service_heartbeat.with_label_values(&labels).set(1.0);

    match stack.services.get_mut(&raw.name) {
        Some(node) => {
            if node.state != raw.state {
                match raw.state.as_str() {
                    "active" => {
                        metrics
                            .service_bootstrap_total
                            .with_label_values(&labels)
                            .inc();
                        node.bootstrap_count += 1;
                        if raw.health_state == "unhealthy" {
                            metrics.service_failure_total.with_label_values(&labels).inc();
                            node.failure_count += 1;
                        }
                    }
                    "error" => {
                        metrics
                            .service_bootstrap_total
                            .with_label_values(&labels)
                            .inc();
                        node.bootstrap_count += 1;
                        metrics.service_failure_total.with_label_values(&labels).inc();
                        node.failure_count += 1;
                    }
                    _ => {}
                }
            }
            node.id = raw.id;
            node.kind = raw.kind;
            node.state = raw.state;
            node.system = raw.system;
        }
        None => {
            let mut bootstrap_count = 0;
            let mut failure_count = 0;
            match raw.state.as_str() {
                "active" => {
                    metrics
                        .service_bootstrap_total
                        .with_label_values(&labels)
                        .inc();
                    bootstrap_count = 1;
                    if raw.health_state == "unhealthy" {
                        metrics.service_failure_total.with_label_values(&labels).inc();
                        failure_count = 1;
                    } else {
                        metrics.service_failure_total.with_label_values(&labels);
                    }
                }
                "error" => {
                    metrics
                        .service_bootstrap_total
                        .with_label_values(&labels)
                        .inc();
                    bootstrap_count = 1;
                    metrics.service_failure_total.with_label_values(&labels).inc();
                    failure_count = 1;
                }
                _ => {
                    metrics.service_bootstrap_total.with_label_values(&labels);
                    metrics.service_failure_total.with_label_values(&labels);
                }
            }
            stack.services.insert(
                raw.name.clone(),
                Service {
                    id: raw.id,
                    name: raw.name,
                    state: raw.state,
                    kind: raw.kind,
                    bootstrap_count,
                    failure_count,
                    system: raw.system,
                    instances: HashMap::new(),
                },
            );
        }
    }
}

pub(crate) fn observe_instance(
    metrics: &Metrics,
    env_name: &str,
    stack_name: &str,
    service: &mut Service,
    raw: RawInstance,
) {
    let system = system_label(raw.system);
    let labels = [
        env_name,
        stack_name,
        service.name.as_str(),
        raw.name.as_str(),
        system,
        raw.kind.as_str(),
    ];
    metrics.instance_heartbeat.with_label_values(&labels).set(1.0);

    match service.instances.get_mut(&raw.name) {
        Some(node) => {
            if node.state != raw.state {
                match raw.state.as_str() {
                    "running" => {
                        let mut startup_time = 0;
                        if raw.first_running_ts != 0 {
                            startup_time = raw.first_running_ts.saturating_sub(raw.created_ts);
                            metrics
                                .instance_startup_ms
                                .with_label_values(&labels)
                                .set(startup_time as f64);
                        }
                        node.startup_time = startup_time;

                        metrics
                            .instance_bootstrap_total
                            .with_label_values(&labels)
                            .inc();
                        node.bootstrap_count += 1;
                    }
                    "error" => {
                        metrics
                            .instance_bootstrap_total
                            .with_label_values(&labels)
                            .inc();
                        node.bootstrap_count += 1;
                        metrics
                            .instance_failure_total
                            .with_label_values(&labels)
                            .inc();
                        node.failure_count += 1;
                    }
                    _ => {}
                }
            }
            node.id = raw.id;
            node.kind = raw.kind;
            node.state = raw.state;
            node.system = raw.system;
        }
        None => {
            let mut bootstrap_count = 0;
            let mut failure_count = 0;
            let mut startup_time = 0;
            match raw.state.as_str() {
                "error" => {
                    metrics
                        .instance_bootstrap_total
                        .with_label_values(&labels)
                        .inc();
                    bootstrap_count = 1;
                    metrics
                        .instance_failure_total
                        .with_label_values(&labels)
                        .inc();
                    failure_count = 1;
                }
                "running" | "stopped" => {
                    if raw.first_running_ts != 0 {
                        startup_time = raw.first_running_ts.saturating_sub(raw.created_ts);
                        metrics
                            .instance_startup_ms
                            .with_label_values(&labels)
                            .set(startup_time as f64);
                    }
                    metrics
                        .instance_bootstrap_total
                        .with_label_values(&labels)
                        .inc();
                    bootstrap_count = 1;
                    metrics.instance_failure_total.with_label_values(&labels);
                }
                _ => {
                    metrics.instance_bootstrap_total.with_label_values(&labels);
                    metrics.instance_failure_total.with_label_values(&labels);
                }
            }
            service.instances.insert(
                raw.name.clone(),
                Instance {
                    id: raw.id,
                    name: raw.name,
                    state: raw.state,
                    kind: raw.kind,
                    bootstrap_count,
                    failure_count,
                    system: raw.system,
                    startup_time,
                },
            );
        }
    }
}
