//! Persisted data models and data plane status reports.

pub mod cluster;
pub mod kafka;
pub mod status;

pub use cluster::{Cluster, ClusterStatus, ClusterType, DynamicCapacityInfo, ProviderType, StrimziVersion};
pub use kafka::{KafkaRequest, KafkaRoute, KafkaStatus, BILLING_MODEL_ENTERPRISE, INSTANCE_TYPE_DEVELOPER, INSTANCE_TYPE_STANDARD};
pub use status::{Condition, DataPlaneClusterStatus, DataPlaneKafkaStatus, KafkaAgentRoute};

/// Mint a new opaque identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_simple().to_string()
}
