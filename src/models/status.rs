//! Status reports pushed by data plane agents.

use serde::{Deserialize, Serialize};

use super::StrimziVersion;

/// The condition type carrying the readiness of a cluster or kafka instance.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// A single condition of a status report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub r#type: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    pub fn new(r#type: &str, status: &str, reason: &str, message: &str) -> Self {
        Self {
            r#type: r#type.into(),
            status: status.into(),
            reason: reason.into(),
            message: message.into(),
        }
    }

    pub fn is_ready_type(&self) -> bool {
        self.r#type.eq_ignore_ascii_case(CONDITION_TYPE_READY)
    }
}

/// Find the first `Ready` condition of the given set.
pub fn find_ready_condition(conditions: &[Condition]) -> Option<&Condition> {
    conditions.iter().find(|cond| cond.is_ready_type())
}

/// The status of a data plane cluster as reported by its agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPlaneClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub available_strimzi_versions: Vec<StrimziVersion>,
}

/// The status of a single kafka instance as reported by its cluster's agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPlaneKafkaStatus {
    pub kafka_cluster_id: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub routes: Vec<KafkaAgentRoute>,
    #[serde(default)]
    pub kafka_version: String,
    #[serde(default)]
    pub strimzi_version: String,
}

/// A route entry reported by the agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaAgentRoute {
    pub name: String,
    pub prefix: String,
    pub router: String,
}
