//! Persisted cluster & kafka state along with the capacity queries derived from it.
//!
//! Capacity counters are never stored. Every count is computed from the live kafka rows at
//! query time, so the counters can not drift from the records they describe.

mod clusters;
mod kafkas;
#[cfg(test)]
mod clusters_test;

use anyhow::Result;

use crate::models::{Cluster, ClusterStatus, KafkaRequest, KafkaStatus};

/// The filter shared by every placement strategy & cluster capacity query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindClusterCriteria {
    pub provider: String,
    pub region: String,
    pub multi_az: bool,
    pub status: ClusterStatus,
    pub supported_instance_type: String,
}

impl FindClusterCriteria {
    /// Build the criteria matching the placement attributes of the given kafka request.
    pub fn for_kafka(kafka: &KafkaRequest, status: ClusterStatus) -> Self {
        Self {
            provider: kafka.cloud_provider.clone(),
            region: kafka.region.clone(),
            multi_az: kafka.multi_az,
            status,
            supported_instance_type: kafka.instance_type.clone(),
        }
    }

    /// Check if the given cluster satisfies these criteria.
    ///
    /// An empty instance type matches every cluster.
    pub fn matches(&self, cluster: &Cluster) -> bool {
        cluster.is_live()
            && cluster.cloud_provider == self.provider
            && cluster.region == self.region
            && cluster.multi_az == self.multi_az
            && cluster.status == self.status
            && (self.supported_instance_type.is_empty() || cluster.supports_instance_type(&self.supported_instance_type))
    }
}

/// The number of streaming units consumed on a cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KafkaInstanceCount {
    pub cluster_id: String,
    pub count: i64,
}

/// The streaming units consumed by one instance type on a cluster, along with the cluster's
/// declared maximum for that instance type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterStreamingUnitCount {
    pub cluster_id: String,
    pub instance_type: String,
    pub status: ClusterStatus,
    pub count: i64,
    pub max_units: i64,
}

/// A list of streaming unit counts per cluster & instance type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingUnitCountList(pub Vec<ClusterStreamingUnitCount>);

impl StreamingUnitCountList {
    /// Get the count of the given cluster & instance type.
    pub fn get(&self, cluster_id: &str, instance_type: &str) -> Option<&ClusterStreamingUnitCount> {
        self.0.iter().find(|val| val.cluster_id == cluster_id && val.instance_type == instance_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cluster records & cluster capacity queries.
pub trait ClusterStore: Send + Sync {
    /// Find all live clusters matching the given filter, ordered by creation time.
    fn find_clusters(&self, filter: &dyn Fn(&Cluster) -> bool) -> Result<Vec<Cluster>>;

    /// Find a live cluster by its cluster ID.
    fn find_cluster_by_cluster_id(&self, cluster_id: &str) -> Result<Option<Cluster>>;

    /// Register a new cluster, failing if its cluster ID is already known.
    fn register_cluster(&self, cluster: &Cluster) -> Result<()>;

    /// Overwrite an existing cluster record.
    fn update_cluster(&self, cluster: &Cluster) -> Result<()>;

    /// Update the status of the given cluster.
    fn update_cluster_status(&self, cluster_id: &str, status: ClusterStatus) -> Result<()>;

    /// Count the streaming units consumed on each of the given clusters.
    ///
    /// Every requested cluster appears in the output, with a count of zero when it hosts
    /// nothing. Kafkas in `deleting` are not counted.
    fn find_kafka_instance_count(&self, cluster_ids: &[String]) -> Result<Vec<KafkaInstanceCount>>;

    /// Count the streaming units consumed per cluster & instance type.
    ///
    /// Every supported instance type of every non-failed cluster appears in the output, with a
    /// count of zero when nothing of that type is hosted.
    fn find_streaming_unit_count_by_cluster_and_instance_type(&self) -> Result<StreamingUnitCountList>;

    /// Find the first cluster matching the given criteria.
    fn find_cluster(&self, criteria: &FindClusterCriteria) -> Result<Option<Cluster>> {
        Ok(self.find_clusters(&|cluster| criteria.matches(cluster))?.into_iter().next())
    }

    /// Find all clusters matching the given criteria.
    fn find_all_clusters(&self, criteria: &FindClusterCriteria) -> Result<Vec<Cluster>> {
        self.find_clusters(&|cluster| criteria.matches(cluster))
    }

    /// Find all clusters in the given status.
    fn find_clusters_by_status(&self, status: ClusterStatus) -> Result<Vec<Cluster>> {
        self.find_clusters(&|cluster| cluster.status == status)
    }
}

/// Kafka request records.
pub trait KafkaStore: Send + Sync {
    /// Find all live kafka requests matching the given filter, ordered by creation time.
    fn find_kafkas(&self, filter: &dyn Fn(&KafkaRequest) -> bool) -> Result<Vec<KafkaRequest>>;

    /// Get a live kafka request by ID.
    fn get_kafka(&self, id: &str) -> Result<Option<KafkaRequest>>;

    /// Insert a new kafka request.
    fn create_kafka(&self, kafka: &KafkaRequest) -> Result<()>;

    /// Overwrite an existing kafka request.
    fn update_kafka(&self, kafka: &KafkaRequest) -> Result<()>;

    /// Atomically apply the given mutation to a live kafka request.
    ///
    /// The mutation returns `false` to skip the write, and may be invoked more than once
    /// when concurrent writers race on the same request. Returns the written request.
    fn modify_kafka(&self, id: &str, mutation: &mut dyn FnMut(&mut KafkaRequest) -> bool) -> Result<Option<KafkaRequest>>;

    /// Soft delete the given kafka request.
    fn delete_kafka(&self, id: &str) -> Result<()>;

    /// List all live kafka requests in the given status.
    fn list_kafkas_by_status(&self, status: KafkaStatus) -> Result<Vec<KafkaRequest>> {
        self.find_kafkas(&|kafka| kafka.status == status)
    }

    /// Atomically update the status of the given kafka request.
    ///
    /// Returns `false` without writing when the update is refused: a request in `deprovision`
    /// may only move to `deleting`, and a request is never updated to its current status.
    fn update_kafka_status(&self, id: &str, status: KafkaStatus) -> Result<bool> {
        let written = self.modify_kafka(id, &mut |kafka: &mut KafkaRequest| {
            if kafka.status == KafkaStatus::Deprovision && status != KafkaStatus::Deleting {
                tracing::debug!(kafka = %kafka.id, %status, "refusing status update of deprovisioning kafka");
                return false;
            }
            if kafka.status == status {
                tracing::debug!(kafka = %kafka.id, %status, "kafka is already in the requested status");
                return false;
            }
            kafka.status = status;
            true
        })?;
        Ok(written.is_some())
    }

    /// Count all live kafka requests.
    fn count_kafkas(&self) -> Result<i64> {
        Ok(self.find_kafkas(&|_| true)?.len() as i64)
    }
}
