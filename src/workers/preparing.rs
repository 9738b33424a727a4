use std::sync::Arc;

use anyhow::{Context, Result};

use crate::clusters::ClusterService;
use crate::config::Config;
use crate::models::{new_id, KafkaRequest, KafkaStatus};
use crate::reconcile::DEFAULT_INGRESS_DNS_NAME_PREFIX;
use crate::store::KafkaStore;
use crate::telemetry::{MetricEvent, Metrics};
use crate::workers::Worker;

/// The ingress prefix of kafka bootstrap hosts.
const KAFKA_INGRESS_DNS_NAME_PREFIX: &str = "kas";
/// The number of characters of a kafka name kept in its identifiers.
const TRUNCATED_NAME_LEN: usize = 10;

/// Assigns the bootstrap host & first placement ID of preparing kafkas & moves them to
/// `provisioning`.
pub struct PreparingKafkaWorker {
    config: Arc<Config>,
    clusters: ClusterService,
    kafkas: Arc<dyn KafkaStore>,
    metrics: Arc<dyn Metrics>,
}

impl PreparingKafkaWorker {
    /// Create a new instance.
    pub fn new(config: Arc<Config>, clusters: ClusterService, kafkas: Arc<dyn KafkaStore>, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            config,
            clusters,
            kafkas,
            metrics,
        }
    }

    fn reconcile_kafka(&self, kafka: &KafkaRequest) -> Result<bool> {
        let domain = match self.config.kafka_domain_name.as_deref() {
            Some(domain) if !domain.is_empty() => domain.to_string(),
            _ => {
                let cluster_dns = self.clusters.get_cluster_dns(&kafka.cluster_id)?;
                cluster_dns.replacen(DEFAULT_INGRESS_DNS_NAME_PREFIX, KAFKA_INGRESS_DNS_NAME_PREFIX, 1)
            }
        };
        let host = bootstrap_server_host(kafka, &domain);
        let namespace = namespace_name(kafka);
        let placement_id = new_id();

        let written = self.kafkas.modify_kafka(&kafka.id, &mut |kafka: &mut KafkaRequest| {
            if kafka.status != KafkaStatus::Preparing {
                return false;
            }
            if kafka.bootstrap_server_host.is_empty() {
                kafka.bootstrap_server_host = host.clone();
            }
            if kafka.namespace.is_empty() {
                kafka.namespace = namespace.clone();
            }
            kafka.placement_id = placement_id.clone();
            kafka.status = KafkaStatus::Provisioning;
            true
        })?;
        Ok(match written {
            Some(kafka) => {
                self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
                    status: KafkaStatus::Provisioning,
                    kafka_id: kafka.id.clone(),
                    cluster_id: kafka.cluster_id.clone(),
                    elapsed: kafka.age(),
                });
                tracing::info!(kafka = %kafka.id, host = %kafka.bootstrap_server_host, "kafka is provisioning");
                true
            }
            None => false,
        })
    }
}

impl Worker for PreparingKafkaWorker {
    fn name(&self) -> &'static str {
        "preparing_kafka"
    }

    fn reconcile(&self) -> Result<usize> {
        let preparing = self
            .kafkas
            .list_kafkas_by_status(KafkaStatus::Preparing)
            .context("failed to list preparing kafkas")?;
        let mut advanced = 0;
        for kafka in preparing.iter() {
            match self.reconcile_kafka(kafka) {
                Ok(true) => advanced += 1,
                Ok(false) => (),
                Err(err) => tracing::error!(error = ?err, kafka = %kafka.id, "failed to reconcile preparing kafka"),
            }
        }
        Ok(advanced)
    }
}

/// Build the bootstrap server host of the given kafka under the given domain.
pub fn bootstrap_server_host(kafka: &KafkaRequest, domain: &str) -> String {
    format!("{}.{}", truncated_identifier(kafka), domain)
}

/// Build the data plane namespace of the given kafka.
pub fn namespace_name(kafka: &KafkaRequest) -> String {
    format!("kafka-{}", kafka.id.to_lowercase())
}

/// The truncated name of the kafka followed by its ID, safe for use as a DNS label.
fn truncated_identifier(kafka: &KafkaRequest) -> String {
    let name: String = kafka.name.chars().take(TRUNCATED_NAME_LEN).collect();
    let ident = format!("{}-{}", name, kafka.id).to_lowercase();
    let ident: String = ident
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '-' })
        .collect();
    ident.trim_matches('-').to_string()
}
