//! corral-metrics — every Prometheus series the exporter publishes.
//!
//! All series live in an owned [`Registry`] handle so tests and embedders
//! can run several exporters side by side; nothing is process-global.
//!
//! Two families of series with different lifetimes:
//!
//! - **per-scrape gauges** (states, health, scale, heartbeats) are reset
//!   at the start of every scrape cycle and repopulated from the fresh
//!   snapshot — they are authoritative for the latest scrape only;
//! - **cumulative counters** and the startup-time gauge are never reset:
//!   they grow monotonically for the process lifetime and are re-seeded
//!   from a checkpoint after a restart.

pub mod states;

use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts, Registry};

/// Prefix for every metric name.
pub const NAMESPACE: &str = "corral";

/// The full set of exported metric names, namespace included.
pub const METRIC_NAMES: [&str; 17] = [
    "corral_host_state",
    "corral_host_agent_state",
    "corral_stack_health_status",
    "corral_stack_state",
    "corral_service_scale",
    "corral_service_health_status",
    "corral_service_state",
    "corral_stack_bootstrap_total",
    "corral_stack_failure_total",
    "corral_service_bootstrap_total",
    "corral_service_failure_total",
    "corral_instance_bootstrap_total",
    "corral_instance_failure_total",
    "corral_instance_startup_ms",
    "corral_stack_heartbeat",
    "corral_service_heartbeat",
    "corral_instance_heartbeat",
];

pub struct Metrics {
    registry: Registry,

    // Point-in-time state of hosts, stacks and services, one-hot over the
    // enumerated sets.
    pub host_state: GaugeVec,
    pub host_agent_state: GaugeVec,
    pub stack_health: GaugeVec,
    pub stack_state: GaugeVec,
    pub service_scale: GaugeVec,
    pub service_health: GaugeVec,
    pub service_state: GaugeVec,

    // Cumulative lifecycle counters.
    pub stack_bootstrap_total: CounterVec,
    pub stack_failure_total: CounterVec,
    pub service_bootstrap_total: CounterVec,
    pub service_failure_total: CounterVec,
    pub instance_bootstrap_total: CounterVec,
    pub instance_failure_total: CounterVec,

    pub instance_startup_ms: GaugeVec,

    // Per-scrape liveness.
    pub stack_heartbeat: GaugeVec,
    pub service_heartbeat: GaugeVec,
    pub instance_heartbeat: GaugeVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let host_state = gauge(
            &registry,
            "host_state",
            "State of the host as reported by the orchestrator API",
            &["id", "name", "state"],
        )?;
        let host_agent_state = gauge(
            &registry,
            "host_agent_state",
            "State of the host agent as reported by the orchestrator API",
            &["id", "name", "state"],
        )?;
        let stack_health = gauge(
            &registry,
            "stack_health_status",
            "Health state of the stack as reported by the orchestrator API",
            &["id", "name", "health_state", "system"],
        )?;
        let stack_state = gauge(
            &registry,
            "stack_state",
            "State of the stack as reported by the orchestrator API",
            &["id", "name", "state", "system"],
        )?;
        let service_scale = gauge(
            &registry,
            "service_scale",
            "Scale of the service as reported by the orchestrator API",
            &["name", "stack_name", "system"],
        )?;
        let service_health = gauge(
            &registry,
            "service_health_status",
            "Health state of the service as reported by the orchestrator API",
            &["id", "stack_id", "name", "stack_name", "health_state", "system"],
        )?;
        let service_state = gauge(
            &registry,
            "service_state",
            "State of the service as reported by the orchestrator API",
            &["id", "stack_id", "name", "stack_name", "state", "system"],
        )?;

        let stack_bootstrap_total = counter(
            &registry,
            "stack_bootstrap_total",
            "Total number of observed stack starts",
            &["environment_name", "name", "system", "type"],
        )?;
        let stack_failure_total = counter(
            &registry,
            "stack_failure_total",
            "Total number of observed stack failures",
            &["environment_name", "name", "system", "type"],
        )?;
        let service_bootstrap_total = counter(
            &registry,
            "service_bootstrap_total",
            "Total number of observed service starts",
            &["environment_name", "stack_name", "name", "system", "type"],
        )?;
        let service_failure_total = counter(
            &registry,
            "service_failure_total",
            "Total number of observed service failures",
            &["environment_name", "stack_name", "name", "system", "type"],
        )?;
        let instance_bootstrap_total = counter(
            &registry,
            "instance_bootstrap_total",
            "Total number of observed container starts",
            &["environment_name", "stack_name", "service_name", "name", "system", "type"],
        )?;
        let instance_failure_total = counter(
            &registry,
            "instance_failure_total",
            "Total number of observed container failures",
            &["environment_name", "stack_name", "service_name", "name", "system", "type"],
        )?;

        let instance_startup_ms = gauge(
            &registry,
            "instance_startup_ms",
            "Milliseconds from container creation to first running",
            &["environment_name", "stack_name", "service_name", "name", "system", "type"],
        )?;

        let stack_heartbeat = gauge(
            &registry,
            "stack_heartbeat",
            "1 while the stack was seen in the latest scrape",
            &["environment_name", "name", "system", "type"],
        )?;
        let service_heartbeat = gauge(
            &registry,
            "service_heartbeat",
            "1 while the service was seen in the latest scrape",
            &["environment_name", "stack_name", "name", "system", "type"],
        )?;
        let instance_heartbeat = gauge(
            &registry,
            "instance_heartbeat",
            "1 while the container was seen in the latest scrape",
            &["environment_name", "stack_name", "service_name", "name", "system", "type"],
        )?;

        Ok(Self {
            registry,
            host_state,
            host_agent_state,
            stack_health,
            stack_state,
            service_scale,
            service_health,
            service_state,
            stack_bootstrap_total,
            stack_failure_total,
            service_bootstrap_total,
            service_failure_total,
            instance_bootstrap_total,
            instance_failure_total,
            instance_startup_ms,
            stack_heartbeat,
            service_heartbeat,
            instance_heartbeat,
        })
    }

    /// The registry all series are registered in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Collect the current value of every series.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Drop every label child of the point-in-time gauges.
    ///
    /// Called at the start of a scrape cycle so that objects which vanished
    /// from the orchestrator stop reporting. Cumulative counters and the
    /// startup-time gauge keep their children.
    pub fn reset_per_scrape(&self) {
        self.host_state.reset();
        self.host_agent_state.reset();
        self.stack_health.reset();
        self.stack_state.reset();
        self.service_scale.reset();
        self.service_health.reset();
        self.service_state.reset();
        self.instance_heartbeat.reset();
        self.service_heartbeat.reset();
        self.stack_heartbeat.reset();
    }
}

fn gauge(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    let vec = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

fn counter(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<CounterVec> {
    let vec = CounterVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}
