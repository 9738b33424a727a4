use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A data plane cluster capable of hosting kafka instances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// The internal ID of this record.
    pub id: String,
    /// The cluster ID used by the data plane agent and by kafka requests.
    pub cluster_id: String,
    /// The ID of this cluster as known by its provider.
    #[serde(default)]
    pub external_id: String,
    pub status: ClusterStatus,
    pub cloud_provider: String,
    pub region: String,
    pub multi_az: bool,
    #[serde(default)]
    pub cluster_type: ClusterType,
    /// The organisation owning this cluster, set for enterprise clusters only.
    #[serde(default)]
    pub organisation_id: String,
    #[serde(default)]
    pub provider_type: ProviderType,
    /// A comma separated list of the instance types this cluster accepts.
    pub supported_instance_type: String,
    /// The maximum number of streaming units per instance type.
    #[serde(default)]
    pub dynamic_capacity_info: HashMap<String, DynamicCapacityInfo>,
    #[serde(default)]
    pub available_strimzi_versions: Vec<StrimziVersion>,
    /// The ingress DNS of this cluster, populated lazily from the provider.
    #[serde(default)]
    pub cluster_dns: String,
    #[serde(with = "crate::utils::timestamp_nanos")]
    pub created_at: OffsetDateTime,
    #[serde(with = "crate::utils::timestamp_nanos")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "crate::utils::timestamp_nanos_opt")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Cluster {
    /// Create a new cluster record in the accepted state.
    pub fn new(cluster_id: impl Into<String>, cloud_provider: impl Into<String>, region: impl Into<String>, multi_az: bool) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: super::new_id(),
            cluster_id: cluster_id.into(),
            external_id: String::new(),
            status: ClusterStatus::Accepted,
            cloud_provider: cloud_provider.into(),
            region: region.into(),
            multi_az,
            cluster_type: ClusterType::Managed,
            organisation_id: String::new(),
            provider_type: ProviderType::Ocm,
            supported_instance_type: String::new(),
            dynamic_capacity_info: HashMap::new(),
            available_strimzi_versions: Vec::new(),
            cluster_dns: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if this cluster declares support for the given instance type.
    pub fn supports_instance_type(&self, instance_type: &str) -> bool {
        self.supported_instance_types().any(|val| val == instance_type)
    }

    /// Iterate over the declared supported instance types.
    pub fn supported_instance_types(&self) -> impl Iterator<Item = &str> {
        self.supported_instance_type.split(',').map(str::trim).filter(|val| !val.is_empty())
    }

    /// The maximum number of streaming units this cluster accepts for the given instance type.
    pub fn max_units(&self, instance_type: &str) -> i64 {
        self.dynamic_capacity_info.get(instance_type).map(|info| info.max_units).unwrap_or(0)
    }

    /// Check if the available strimzi versions differ from the given set.
    pub fn strimzi_versions_differ(&self, other: &[StrimziVersion]) -> bool {
        self.available_strimzi_versions.as_slice() != other
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// The time elapsed since this cluster was created.
    pub fn age(&self) -> std::time::Duration {
        let elapsed = OffsetDateTime::now_utc() - self.created_at;
        std::time::Duration::try_from(elapsed).unwrap_or_default()
    }
}

/// The capacity information of a cluster for a single instance type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicCapacityInfo {
    pub max_units: i64,
}

/// A strimzi version available on a data plane cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrimziVersion {
    pub version: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub kafka_versions: Vec<String>,
}

/// The lifecycle status of a data plane cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterStatus {
    #[serde(rename = "cluster_accepted")]
    Accepted,
    #[serde(rename = "cluster_provisioning")]
    Provisioning,
    #[serde(rename = "cluster_provisioned")]
    Provisioned,
    #[serde(rename = "waiting_for_kas_fleetshard_operator")]
    WaitingForFleetshardOperator,
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "compute_node_scaling_up")]
    ComputeNodeScalingUp,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "deprovisioning")]
    Deprovisioning,
    #[serde(rename = "cleanup")]
    Cleanup,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "cluster_accepted",
            Self::Provisioning => "cluster_provisioning",
            Self::Provisioned => "cluster_provisioned",
            Self::WaitingForFleetshardOperator => "waiting_for_kas_fleetshard_operator",
            Self::Ready => "ready",
            Self::Full => "full",
            Self::ComputeNodeScalingUp => "compute_node_scaling_up",
            Self::Failed => "failed",
            Self::Deprovisioning => "deprovisioning",
            Self::Cleanup => "cleanup",
        }
    }

    /// Statuses in which a cluster accepts status reports from its data plane agent.
    pub fn accepts_status_reports(&self) -> bool {
        matches!(self, Self::Ready | Self::Full | Self::WaitingForFleetshardOperator | Self::ComputeNodeScalingUp)
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterStatus {
    type Err = anyhow::Error;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        Ok(match val {
            "cluster_accepted" => Self::Accepted,
            "cluster_provisioning" => Self::Provisioning,
            "cluster_provisioned" => Self::Provisioned,
            "waiting_for_kas_fleetshard_operator" => Self::WaitingForFleetshardOperator,
            "ready" => Self::Ready,
            "full" => Self::Full,
            "compute_node_scaling_up" => Self::ComputeNodeScalingUp,
            "failed" => Self::Failed,
            "deprovisioning" => Self::Deprovisioning,
            "cleanup" => Self::Cleanup,
            _ => bail!("unknown cluster status {:?}", val),
        })
    }
}

/// Who owns the capacity of a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    Managed,
    Enterprise,
}

impl Default for ClusterType {
    fn default() -> Self {
        Self::Managed
    }
}

/// The provisioning provider responsible for a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Ocm,
    AwsEks,
    Standalone,
}

impl Default for ProviderType {
    fn default() -> Self {
        Self::Ocm
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ocm => "ocm",
            Self::AwsEks => "aws_eks",
            Self::Standalone => "standalone",
        })
    }
}
