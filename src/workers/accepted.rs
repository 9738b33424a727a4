use std::sync::Arc;

use anyhow::{Context, Result};

use crate::clusters::ClusterService;
use crate::models::{Cluster, KafkaRequest, KafkaStatus};
use crate::placement::ClusterPlacementStrategy;
use crate::store::KafkaStore;
use crate::telemetry::{MetricEvent, Metrics};
use crate::workers::Worker;

/// Places accepted kafkas onto clusters & moves them to `preparing`.
pub struct AcceptedKafkaWorker {
    clusters: ClusterService,
    kafkas: Arc<dyn KafkaStore>,
    placement: Arc<ClusterPlacementStrategy>,
    metrics: Arc<dyn Metrics>,
}

impl AcceptedKafkaWorker {
    /// Create a new instance.
    pub fn new(clusters: ClusterService, kafkas: Arc<dyn KafkaStore>, placement: Arc<ClusterPlacementStrategy>, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            clusters,
            kafkas,
            placement,
            metrics,
        }
    }

    /// Place the given kafka & move it to `preparing`, returning false when no cluster is
    /// currently available.
    fn reconcile_kafka(&self, kafka: &KafkaRequest) -> Result<bool> {
        let cluster = if kafka.cluster_id.is_empty() {
            match self.placement.find_cluster(kafka)? {
                Some(cluster) => cluster,
                None => {
                    tracing::info!(kafka = %kafka.id, region = %kafka.region, instance_type = %kafka.instance_type, "no available cluster found for kafka");
                    return Ok(false);
                }
            }
        } else {
            match self.clusters.find_cluster_by_id(&kafka.cluster_id)? {
                Some(cluster) => cluster,
                None => {
                    tracing::warn!(kafka = %kafka.id, cluster = %kafka.cluster_id, "assigned cluster of kafka no longer exists");
                    return Ok(false);
                }
            }
        };

        let (strimzi_version, kafka_version) = latest_versions(&cluster);
        let written = self.kafkas.modify_kafka(&kafka.id, &mut |kafka: &mut KafkaRequest| {
            if kafka.status != KafkaStatus::Accepted {
                return false;
            }
            kafka.cluster_id = cluster.cluster_id.clone();
            if kafka.desired_strimzi_version.is_empty() {
                kafka.desired_strimzi_version = strimzi_version.clone();
            }
            if kafka.desired_kafka_version.is_empty() {
                kafka.desired_kafka_version = kafka_version.clone();
            }
            kafka.status = KafkaStatus::Preparing;
            true
        })?;
        if let Some(kafka) = written {
            self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
                status: KafkaStatus::Preparing,
                kafka_id: kafka.id.clone(),
                cluster_id: kafka.cluster_id.clone(),
                elapsed: kafka.age(),
            });
            tracing::info!(kafka = %kafka.id, cluster = %kafka.cluster_id, "kafka assigned to cluster");
        }
        Ok(true)
    }
}

impl Worker for AcceptedKafkaWorker {
    fn name(&self) -> &'static str {
        "accepted_kafka"
    }

    fn reconcile(&self) -> Result<usize> {
        let accepted = self
            .kafkas
            .list_kafkas_by_status(KafkaStatus::Accepted)
            .context("failed to list accepted kafkas")?;
        let mut advanced = 0;
        for kafka in accepted.iter() {
            match self.reconcile_kafka(kafka) {
                Ok(true) => advanced += 1,
                Ok(false) => (),
                Err(err) => tracing::error!(error = ?err, kafka = %kafka.id, "failed to reconcile accepted kafka"),
            }
        }
        Ok(advanced)
    }
}

/// The latest ready strimzi version of the cluster along with its latest kafka version.
fn latest_versions(cluster: &Cluster) -> (String, String) {
    cluster
        .available_strimzi_versions
        .iter()
        .rev()
        .find(|version| version.ready)
        .map(|version| (version.version.clone(), version.kafka_versions.last().cloned().unwrap_or_default()))
        .unwrap_or_default()
}
