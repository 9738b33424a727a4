use anyhow::Result;
use rand::prelude::*;
use time::OffsetDateTime;

use crate::models::{
    new_id, Cluster, ClusterStatus, ClusterType, DynamicCapacityInfo, KafkaRequest, KafkaStatus, BILLING_MODEL_ENTERPRISE, INSTANCE_TYPE_DEVELOPER,
    INSTANCE_TYPE_STANDARD,
};
use crate::quota::QUOTA_TYPE_MANAGEMENT_LIST;
use crate::store::{ClusterStore, KafkaStore};

pub const PROVIDER: &str = "aws";
pub const REGION: &str = "us-east-1";

/// Build a ready, multi AZ, managed cluster accepting every instance type.
pub fn ready_cluster(cluster_id: &str) -> Cluster {
    let mut cluster = Cluster::new(cluster_id, PROVIDER, REGION, true);
    cluster.status = ClusterStatus::Ready;
    cluster.supported_instance_type = format!("{},{}", INSTANCE_TYPE_STANDARD, INSTANCE_TYPE_DEVELOPER);
    cluster.cluster_dns = format!("apps.{}.example.com", cluster_id);
    cluster
}

/// Build a ready cluster declaring the given streaming unit maximum for standard instances.
pub fn ready_cluster_with_capacity(cluster_id: &str, max_units: i64) -> Cluster {
    let mut cluster = ready_cluster(cluster_id);
    cluster
        .dynamic_capacity_info
        .insert(INSTANCE_TYPE_STANDARD.into(), DynamicCapacityInfo { max_units });
    cluster
}

/// Build a ready enterprise cluster of the fixture organisation, outside of the default region.
pub fn enterprise_cluster(cluster_id: &str, max_units: i64) -> Cluster {
    let mut cluster = ready_cluster_with_capacity(cluster_id, max_units);
    cluster.cluster_type = ClusterType::Enterprise;
    cluster.organisation_id = "test-org".into();
    cluster.cloud_provider = "gcp".into();
    cluster.region = "europe-west1".into();
    cluster
}

/// Build a standard enterprise kafka request naming the given cluster.
pub fn enterprise_request(name: &str, cluster_id: &str) -> KafkaRequest {
    let mut kafka = kafka_request(name);
    kafka.desired_billing_model = BILLING_MODEL_ENTERPRISE.into();
    kafka.cluster_id = cluster_id.into();
    kafka
}

/// Build a standard kafka request in the default provider & region.
pub fn kafka_request(name: &str) -> KafkaRequest {
    let mut kafka = KafkaRequest::new(name, INSTANCE_TYPE_STANDARD, "x1", PROVIDER, REGION, "test-user");
    kafka.multi_az = true;
    kafka.organisation_id = "test-org".into();
    kafka.quota_type = QUOTA_TYPE_MANAGEMENT_LIST.into();
    kafka
}

/// Build a kafka request with an ID, assigned to the given cluster in the given status.
pub fn kafka_on(cluster_id: &str, status: KafkaStatus) -> KafkaRequest {
    let mut kafka = kafka_request("kafka");
    kafka.id = new_id();
    kafka.name = format!("kafka-{}", &kafka.id[..8]);
    kafka.cluster_id = cluster_id.into();
    kafka.status = status;
    kafka.bootstrap_server_host = format!("{}.kafka.example.com", kafka.name);
    kafka
}

/// Register the given clusters with strictly increasing creation times, in order.
pub fn setup_clusters(store: &dyn ClusterStore, clusters: &[Cluster]) -> Result<()> {
    let base = OffsetDateTime::now_utc() - time::Duration::seconds(clusters.len() as i64);
    for (idx, cluster) in clusters.iter().enumerate() {
        let mut cluster = cluster.clone();
        cluster.created_at = base + time::Duration::seconds(idx as i64);
        store.register_cluster(&cluster)?;
    }
    Ok(())
}

/// Create a random number of ready standard kafkas on the given cluster, returning the count.
pub fn setup_kafkas(store: &dyn KafkaStore, cluster_id: &str) -> Result<i64> {
    let count = rand::thread_rng().gen_range(5..20);
    for _ in 0..count {
        store.create_kafka(&kafka_on(cluster_id, KafkaStatus::Ready))?;
    }
    Ok(count)
}

/// Create the given number of kafkas in the given status on the given cluster.
pub fn setup_kafkas_in_status(store: &dyn KafkaStore, cluster_id: &str, status: KafkaStatus, count: usize) -> Result<Vec<KafkaRequest>> {
    let mut kafkas = Vec::with_capacity(count);
    for _ in 0..count {
        let kafka = kafka_on(cluster_id, status);
        store.create_kafka(&kafka)?;
        kafkas.push(kafka);
    }
    Ok(kafkas)
}
