//! The orchestrator's enumerated state sets, fixed at build time.
//!
//! One-hot gauges are emitted across the *full* set for every observed
//! object: exactly one label value carries 1, the rest carry 0, so a
//! dashboard can pivot on the state label without knowing which states
//! exist.

pub const HOST_STATES: &[&str] = &[
    "activating",
    "active",
    "deactivating",
    "error",
    "erroring",
    "inactive",
    "provisioned",
    "purged",
    "purging",
    "registering",
    "removed",
    "removing",
    "requested",
    "restoring",
    "updating_active",
    "updating_inactive",
];

pub const AGENT_STATES: &[&str] = &[
    "activating",
    "active",
    "reconnecting",
    "disconnected",
    "disconnecting",
    "finishing-reconnect",
    "reconnected",
];

pub const STACK_STATES: &[&str] = &[
    "activating",
    "active",
    "canceled_upgrade",
    "canceling_upgrade",
    "error",
    "erroring",
    "finishing_upgrade",
    "removed",
    "removing",
    "requested",
    "restarting",
    "rolling_back",
    "updating_active",
    "upgraded",
    "upgrading",
];

pub const SERVICE_STATES: &[&str] = &[
    "activating",
    "active",
    "canceled_upgrade",
    "canceling_upgrade",
    "deactivating",
    "finishing_upgrade",
    "inactive",
    "registering",
    "removed",
    "removing",
    "requested",
    "restarting",
    "rolling_back",
    "updating_active",
    "updating_inactive",
    "upgraded",
    "upgrading",
];

pub const HEALTH_STATES: &[&str] = &["healthy", "unhealthy"];
