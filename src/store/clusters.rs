use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use time::OffsetDateTime;

use crate::database::Database;
use crate::error::{AppError, ERR_DECODE_CLUSTER, ERR_ITER_FAILURE};
use crate::models::{Cluster, ClusterStatus, KafkaStatus};
use crate::store::{ClusterStore, ClusterStreamingUnitCount, KafkaInstanceCount, KafkaStore, StreamingUnitCountList};
use crate::utils;

impl ClusterStore for Database {
    fn find_clusters(&self, filter: &dyn Fn(&Cluster) -> bool) -> Result<Vec<Cluster>> {
        let mut clusters = Vec::new();
        for kv_res in self.clusters_tree().iter() {
            let (_, val) = kv_res.context(ERR_ITER_FAILURE)?;
            let cluster: Cluster = utils::decode_model(&val).context(ERR_DECODE_CLUSTER)?;
            if cluster.is_live() && filter(&cluster) {
                clusters.push(cluster);
            }
        }
        clusters.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(clusters)
    }

    fn find_cluster_by_cluster_id(&self, cluster_id: &str) -> Result<Option<Cluster>> {
        let val = match self.clusters_tree().get(cluster_id).context("error fetching cluster")? {
            Some(val) => val,
            None => return Ok(None),
        };
        let cluster: Cluster = utils::decode_model(&val).context(ERR_DECODE_CLUSTER)?;
        Ok(Some(cluster).filter(Cluster::is_live))
    }

    fn register_cluster(&self, cluster: &Cluster) -> Result<()> {
        if cluster.cluster_id.is_empty() {
            bail!(AppError::InvalidInput("cluster_id is undefined".into()));
        }
        let val = utils::encode_model(cluster)?;
        self.clusters_tree()
            .compare_and_swap(cluster.cluster_id.as_bytes(), None as Option<&[u8]>, Some(val))
            .context("error registering cluster")?
            .map_err(|_| AppError::InvalidInput(format!("cluster {} is already registered", cluster.cluster_id)))?;
        Ok(())
    }

    fn update_cluster(&self, cluster: &Cluster) -> Result<()> {
        let mut cluster = cluster.clone();
        cluster.updated_at = OffsetDateTime::now_utc();
        let val = utils::encode_model(&cluster)?;
        self.clusters_tree()
            .insert(cluster.cluster_id.as_bytes(), val)
            .with_context(|| format!("error updating cluster {}", cluster.cluster_id))?;
        Ok(())
    }

    fn update_cluster_status(&self, cluster_id: &str, status: ClusterStatus) -> Result<()> {
        let mut cluster = self
            .find_cluster_by_cluster_id(cluster_id)?
            .ok_or_else(|| AppError::ResourceNotFound(format!("cluster {}", cluster_id)))?;
        cluster.status = status;
        self.update_cluster(&cluster)
    }

    fn find_kafka_instance_count(&self, cluster_ids: &[String]) -> Result<Vec<KafkaInstanceCount>> {
        let instance_types = &self.config().instance_types;
        let mut counts: HashMap<&str, i64> = cluster_ids.iter().map(|id| (id.as_str(), 0)).collect();
        let kafkas = self.find_kafkas(&|kafka| kafka.status != KafkaStatus::Deleting && counts.contains_key(kafka.cluster_id.as_str()))?;
        for kafka in kafkas.iter() {
            let weight = instance_types
                .capacity_consumed(&kafka.instance_type, &kafka.size_id)
                .with_context(|| format!("error resolving capacity of kafka {}", kafka.id))?;
            if let Some(count) = counts.get_mut(kafka.cluster_id.as_str()) {
                *count += weight;
            }
        }
        Ok(cluster_ids
            .iter()
            .map(|id| KafkaInstanceCount {
                cluster_id: id.clone(),
                count: counts.get(id.as_str()).copied().unwrap_or(0),
            })
            .collect())
    }

    fn find_streaming_unit_count_by_cluster_and_instance_type(&self) -> Result<StreamingUnitCountList> {
        let instance_types = &self.config().instance_types;
        let clusters = self.find_clusters(&|cluster| cluster.status != ClusterStatus::Failed)?;
        let mut counts: Vec<ClusterStreamingUnitCount> = clusters
            .iter()
            .flat_map(|cluster| {
                cluster.supported_instance_types().map(move |instance_type| ClusterStreamingUnitCount {
                    cluster_id: cluster.cluster_id.clone(),
                    instance_type: instance_type.to_string(),
                    status: cluster.status,
                    count: 0,
                    max_units: cluster.max_units(instance_type),
                })
            })
            .collect();

        let kafkas = self.find_kafkas(&|kafka| kafka.status != KafkaStatus::Deleting && !kafka.cluster_id.is_empty())?;
        for kafka in kafkas.iter() {
            let entry = counts
                .iter_mut()
                .find(|val| val.cluster_id == kafka.cluster_id && val.instance_type == kafka.instance_type);
            if let Some(entry) = entry {
                entry.count += instance_types
                    .capacity_consumed(&kafka.instance_type, &kafka.size_id)
                    .with_context(|| format!("error resolving capacity of kafka {}", kafka.id))?;
            }
        }
        Ok(StreamingUnitCountList(counts))
    }
}
