//! Wire types decoded from the orchestrator's list endpoints.
//!
//! Every field defaults when absent: the API omits empty fields, and a
//! partially populated object must never fail the page decode.

use serde::Deserialize;

use corral_model::Project;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawHost {
    pub id: String,
    pub name: String,
    pub hostname: String,
    pub state: String,
    pub agent_state: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawStack {
    pub id: String,
    pub name: String,
    pub state: String,
    pub health_state: String,
    pub system: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawService {
    pub id: String,
    pub name: String,
    pub state: String,
    pub health_state: String,
    pub system: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub scale: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawInstance {
    pub id: String,
    pub name: String,
    pub state: String,
    pub system: bool,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "createdTS")]
    pub created_ts: u64,
    #[serde(rename = "firstRunningTS")]
    pub first_running_ts: u64,
}

/// A record in the generic-object store; `resource_data` carries a full
/// checkpointed [`Project`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawGenericObject {
    pub id: String,
    pub key: String,
    pub resource_data: Option<Project>,
}
