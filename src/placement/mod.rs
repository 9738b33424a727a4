//! Cluster placement strategies.
//!
//! A strategy is selected once at startup from the fleet's scaling mode. Every strategy
//! answers with a concrete cluster, with `None` when no cluster can currently take the
//! request, or with an error. Enterprise requests bypass the selected strategy. Unresolvable instance types & sizes surface as
//! `AppError::InstanceTypeNotSupported` or `AppError::InstancePlanNotSupported`, never as `None`.


use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::config::{Config, ScalingType};
use crate::error::AppError;
use crate::models::{Cluster, ClusterStatus, ClusterType, KafkaRequest};
use crate::store::{ClusterStore, FindClusterCriteria};

/// The placement strategy used to assign kafka requests to data plane clusters.
///
/// Enterprise requests always go to the cluster they name, every other request goes
/// through the strategy of the configured scaling mode.
pub struct ClusterPlacementStrategy {
    managed: ManagedPlacement,
    enterprise: RequestedEnterpriseCluster,
}

/// The placement onto managed clusters, one per scaling mode.
enum ManagedPlacement {
    /// Place onto the first ready cluster, capacity is not tracked.
    FirstReadyCluster(FirstReadyCluster),
    /// Place onto the first schedulable cluster, in configured order, whose static limit holds.
    FirstSchedulableWithinLimit(FirstSchedulableWithinLimit),
    /// Place onto the first ready cluster whose dynamic capacity holds.
    FirstReadyWithCapacity(FirstReadyWithCapacity),
}

impl ClusterPlacementStrategy {
    /// Create the strategy matching the configured scaling mode.
    pub fn new(config: Arc<Config>, store: Arc<dyn ClusterStore>) -> Self {
        let enterprise = RequestedEnterpriseCluster {
            config: config.clone(),
            store: store.clone(),
        };
        let managed = match config.dataplane.scaling_type {
            ScalingType::Manual => ManagedPlacement::FirstSchedulableWithinLimit(FirstSchedulableWithinLimit { config, store }),
            ScalingType::Auto => ManagedPlacement::FirstReadyWithCapacity(FirstReadyWithCapacity { config, store }),
            ScalingType::None => ManagedPlacement::FirstReadyCluster(FirstReadyCluster { store }),
        };
        Self { managed, enterprise }
    }

    /// Find a cluster able to host the given kafka request.
    #[tracing::instrument(level = "debug", skip(self, kafka), fields(kafka = %kafka.id, instance_type = %kafka.instance_type))]
    pub fn find_cluster(&self, kafka: &KafkaRequest) -> Result<Option<Cluster>> {
        if kafka.is_enterprise() {
            return self.enterprise.find_cluster(kafka);
        }
        match &self.managed {
            ManagedPlacement::FirstReadyCluster(inner) => inner.find_cluster(kafka),
            ManagedPlacement::FirstSchedulableWithinLimit(inner) => inner.find_cluster(kafka),
            ManagedPlacement::FirstReadyWithCapacity(inner) => inner.find_cluster(kafka),
        }
    }
}

/// Places enterprise requests onto the cluster they name, within its dynamic capacity.
struct RequestedEnterpriseCluster {
    config: Arc<Config>,
    store: Arc<dyn ClusterStore>,
}

impl RequestedEnterpriseCluster {
    fn find_cluster(&self, kafka: &KafkaRequest) -> Result<Option<Cluster>> {
        let cluster = self
            .store
            .find_cluster_by_cluster_id(&kafka.cluster_id)
            .with_context(|| format!("failed to find cluster {}", kafka.cluster_id))?
            .ok_or_else(|| AppError::ResourceNotFound(format!("cluster {}", kafka.cluster_id)))?;
        if cluster.organisation_id != kafka.organisation_id {
            bail!(AppError::Forbidden(format!(
                "organisation {} is not allowed to use cluster {}",
                kafka.organisation_id, cluster.cluster_id
            )));
        }
        if cluster.status != ClusterStatus::Ready {
            bail!(AppError::InvalidInput(format!("cluster {} is not ready", cluster.cluster_id)));
        }

        let weight = self.config.instance_types.capacity_consumed(&kafka.instance_type, &kafka.size_id)?;
        let max_units = match cluster.dynamic_capacity_info.get(&kafka.instance_type) {
            Some(info) => info.max_units,
            None => bail!(AppError::InstanceTypeNotSupported(format!(
                "cluster {} has no capacity for instance type {}",
                cluster.cluster_id, kafka.instance_type
            ))),
        };
        let counts = self
            .store
            .find_streaming_unit_count_by_cluster_and_instance_type()
            .context("failed to find streaming unit counts per cluster and instance type")?;
        let used = counts.get(&cluster.cluster_id, &kafka.instance_type).map(|val| val.count).unwrap_or(0);
        if max_units - (used + weight) < 0 {
            tracing::debug!(cluster = %cluster.cluster_id, used, max_units, weight, "enterprise cluster has no capacity left");
            return Ok(None);
        }
        Ok(Some(cluster))
    }
}

pub struct FirstReadyCluster {
    store: Arc<dyn ClusterStore>,
}

impl FirstReadyCluster {
    fn find_cluster(&self, kafka: &KafkaRequest) -> Result<Option<Cluster>> {
        let criteria = FindClusterCriteria::for_kafka(kafka, ClusterStatus::Ready);
        let cluster = self
            .store
            .find_clusters(&|cluster| criteria.matches(cluster) && cluster.cluster_type == ClusterType::Managed)
            .with_context(|| format!("failed to find cluster with criteria {:?}", criteria))?
            .into_iter()
            .next();
        Ok(cluster)
    }
}

pub struct FirstSchedulableWithinLimit {
    config: Arc<Config>,
    store: Arc<dyn ClusterStore>,
}

impl FirstSchedulableWithinLimit {
    fn find_cluster(&self, kafka: &KafkaRequest) -> Result<Option<Cluster>> {
        let weight = self.config.instance_types.capacity_consumed(&kafka.instance_type, &kafka.size_id)?;
        let cluster_config = &self.config.dataplane.cluster_config;

        let criteria = FindClusterCriteria::for_kafka(kafka, ClusterStatus::Ready);
        let clusters = self
            .store
            .find_all_clusters(&criteria)
            .with_context(|| format!("failed to find all clusters with criteria {:?}", criteria))?;

        // Configured clusters come first in their declared order, unconfigured ones keep
        // repository order after them.
        let mut candidates: Vec<Cluster> = clusters
            .into_iter()
            .filter(|cluster| cluster.cluster_type == ClusterType::Managed && cluster_config.is_cluster_schedulable(&cluster.cluster_id))
            .collect();
        candidates.sort_by_key(|cluster| cluster_config.position(&cluster.cluster_id).unwrap_or(usize::MAX));
        if candidates.is_empty() {
            return Ok(None);
        }

        let cluster_ids: Vec<String> = candidates.iter().map(|cluster| cluster.cluster_id.clone()).collect();
        let counts = self
            .store
            .find_kafka_instance_count(&cluster_ids)
            .with_context(|| format!("failed to count kafka instances of clusters {:?}", cluster_ids))?;

        for cluster in candidates {
            let count = counts
                .iter()
                .find(|val| val.cluster_id == cluster.cluster_id)
                .map(|val| val.count)
                .unwrap_or(0);
            if cluster_config.is_number_of_kafka_within_cluster_limit(&cluster.cluster_id, count + weight) {
                return Ok(Some(cluster));
            }
            tracing::debug!(cluster = %cluster.cluster_id, count, weight, "cluster limit reached");
        }
        Ok(None)
    }
}

pub struct FirstReadyWithCapacity {
    config: Arc<Config>,
    store: Arc<dyn ClusterStore>,
}

impl FirstReadyWithCapacity {
    fn find_cluster(&self, kafka: &KafkaRequest) -> Result<Option<Cluster>> {
        let criteria = FindClusterCriteria::for_kafka(kafka, ClusterStatus::Ready);
        let clusters = self
            .store
            .find_all_clusters(&criteria)
            .with_context(|| format!("failed to find all clusters with criteria {:?}", criteria))?;
        let counts = self
            .store
            .find_streaming_unit_count_by_cluster_and_instance_type()
            .context("failed to find streaming unit counts per cluster and instance type")?;
        let weight = self.config.instance_types.capacity_consumed(&kafka.instance_type, &kafka.size_id)?;

        for cluster in clusters.into_iter().filter(|cluster| cluster.cluster_type == ClusterType::Managed) {
            let (used, max_units) = counts
                .get(&cluster.cluster_id, &kafka.instance_type)
                .map(|val| (val.count, val.max_units))
                .unwrap_or_else(|| (0, cluster.max_units(&kafka.instance_type)));
            if used + weight <= max_units {
                return Ok(Some(cluster));
            }
            tracing::debug!(cluster = %cluster.cluster_id, used, max_units, weight, "cluster has no capacity left");
        }
        Ok(None)
    }
}
