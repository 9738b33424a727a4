use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::models::{ClusterStatus, ProviderType};

/// The default instance types supported by a statically configured cluster.
const DEFAULT_SUPPORTED_INSTANCE_TYPE: &str = "standard,developer";

/// The scaling mode of the data plane fleet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingType {
    /// Clusters are declared statically with per-cluster instance limits.
    Manual,
    /// Clusters declare their capacity dynamically per instance type.
    Auto,
    /// Capacity is not tracked.
    None,
}

impl Default for ScalingType {
    fn default() -> Self {
        Self::Manual
    }
}

/// The data plane cluster configuration.
#[derive(Clone, Debug, Default)]
pub struct DataplaneClusterConfig {
    pub scaling_type: ScalingType,
    pub cluster_config: ClusterConfig,
}

impl DataplaneClusterConfig {
    pub fn is_auto_scaling_enabled(&self) -> bool {
        self.scaling_type == ScalingType::Auto
    }
}

/// The on-disk shape of the dataplane cluster config file.
#[derive(Debug, Deserialize)]
pub(super) struct ClusterList {
    #[serde(default)]
    pub clusters: Vec<ManualCluster>,
}

/// A statically configured data plane cluster.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ManualCluster {
    #[serde(default)]
    pub name: String,
    pub cluster_id: String,
    #[serde(default)]
    pub cloud_provider: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub multi_az: bool,
    #[serde(default)]
    pub schedulable: bool,
    /// The maximum number of streaming units this cluster may host, `-1` for unlimited.
    #[serde(default)]
    pub kafka_instance_limit: i64,
    #[serde(default = "ManualCluster::default_status")]
    pub status: ClusterStatus,
    #[serde(default)]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub cluster_dns: String,
    #[serde(default = "ManualCluster::default_supported_instance_type")]
    pub supported_instance_type: String,
}

impl ManualCluster {
    fn default_status() -> ClusterStatus {
        ClusterStatus::Provisioning
    }

    fn default_supported_instance_type() -> String {
        DEFAULT_SUPPORTED_INSTANCE_TYPE.into()
    }

    fn validate(&self) -> Result<()> {
        if self.cluster_id.is_empty() {
            bail!("cluster_id is required for every configured cluster");
        }
        if self.provider_type == ProviderType::Standalone {
            if self.cluster_dns.is_empty() {
                bail!("cluster_dns is required for standalone cluster {}", self.cluster_id);
            }
            if self.name.is_empty() {
                bail!("name is required for standalone cluster {}", self.cluster_id);
            }
        }
        Ok(())
    }
}

/// The statically configured clusters in their declared order.
#[derive(Clone, Debug, Default)]
pub struct ClusterConfig {
    clusters: Vec<ManualCluster>,
    index: HashMap<String, usize>,
}

impl ClusterConfig {
    /// Build a new instance from the given clusters, preserving their order.
    pub fn new(clusters: Vec<ManualCluster>) -> Result<Self> {
        let mut index = HashMap::with_capacity(clusters.len());
        for (idx, cluster) in clusters.iter().enumerate() {
            cluster.validate()?;
            if index.insert(cluster.cluster_id.clone(), idx).is_some() {
                bail!("cluster {} is configured more than once", cluster.cluster_id);
            }
        }
        Ok(Self { clusters, index })
    }

    /// All configured clusters in declared order.
    pub fn clusters(&self) -> &[ManualCluster] {
        &self.clusters
    }

    pub fn get(&self, cluster_id: &str) -> Option<&ManualCluster> {
        self.index.get(cluster_id).and_then(|idx| self.clusters.get(*idx))
    }

    /// The declared position of the given cluster, if configured.
    pub fn position(&self, cluster_id: &str) -> Option<usize> {
        self.index.get(cluster_id).copied()
    }

    /// Check if the given cluster may receive new instances.
    ///
    /// Clusters absent from the configuration are schedulable.
    pub fn is_cluster_schedulable(&self, cluster_id: &str) -> bool {
        self.get(cluster_id).map(|cluster| cluster.schedulable).unwrap_or(true)
    }

    /// Check if the given streaming unit count fits the configured limit of the cluster.
    ///
    /// Clusters absent from the configuration, or configured with a limit of `-1`, are unlimited.
    pub fn is_number_of_kafka_within_cluster_limit(&self, cluster_id: &str, count: i64) -> bool {
        match self.get(cluster_id) {
            Some(cluster) if cluster.kafka_instance_limit != -1 => count <= cluster.kafka_instance_limit,
            _ => true,
        }
    }
}
