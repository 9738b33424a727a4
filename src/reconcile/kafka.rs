use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::clusters::ClusterService;
use crate::config::Config;
use crate::error::AppError;
use crate::models::status::find_ready_condition;
use crate::models::{new_id, Cluster, DataPlaneKafkaStatus, KafkaAgentRoute, KafkaRequest, KafkaRoute, KafkaStatus};
use crate::reconcile::{classify, KafkaStatusClass};
use crate::store::KafkaStore;
use crate::telemetry::{KafkaOperation, MetricEvent, Metrics};

/// The prefix of a cluster's default ingress DNS.
pub const DEFAULT_INGRESS_DNS_NAME_PREFIX: &str = "apps";
/// The Ready condition reason reported while strimzi is being upgraded.
const REASON_STRIMZI_UPDATING: &str = "StrimziUpdating";
/// The Ready condition reason reported while kafka is being upgraded.
const REASON_KAFKA_UPDATING: &str = "KafkaUpdating";

/// Advances the lifecycle of kafka instances from their cluster agent's status reports.
#[derive(Clone)]
pub struct KafkaStatusReconciler {
    config: Arc<Config>,
    clusters: ClusterService,
    kafkas: Arc<dyn KafkaStore>,
    metrics: Arc<dyn Metrics>,
}

impl KafkaStatusReconciler {
    /// Create a new instance.
    pub fn new(config: Arc<Config>, clusters: ClusterService, kafkas: Arc<dyn KafkaStore>, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            config,
            clusters,
            kafkas,
            metrics,
        }
    }

    /// Apply a batch of kafka status reports of the given cluster.
    ///
    /// Each report is applied independently, in order. A failing report is logged and does not
    /// prevent the rest of the batch from being applied. Only an unknown cluster fails the call.
    #[tracing::instrument(level = "debug", skip(self, reports), fields(reports = reports.len()))]
    pub fn update_data_plane_kafka_statuses(&self, cluster_id: &str, reports: &[DataPlaneKafkaStatus]) -> Result<()> {
        if cluster_id.is_empty() {
            bail!(AppError::InvalidInput("cluster id is undefined".into()));
        }
        let cluster = self
            .clusters
            .find_cluster_by_id(cluster_id)?
            .ok_or_else(|| AppError::InvalidInput(format!("Cluster agent with ID '{}' not found", cluster_id)))?;

        for report in reports {
            if let Err(err) = self.reconcile_kafka_status(&cluster, report) {
                tracing::error!(error = ?err, kafka = %report.kafka_cluster_id, cluster = %cluster_id, "error reconciling kafka status report");
            }
        }
        Ok(())
    }

    fn reconcile_kafka_status(&self, cluster: &Cluster, report: &DataPlaneKafkaStatus) -> Result<()> {
        let kafka = self
            .kafkas
            .get_kafka(&report.kafka_cluster_id)?
            .ok_or_else(|| AppError::ResourceNotFound(format!("kafka {}", report.kafka_cluster_id)))?;
        if kafka.cluster_id != cluster.cluster_id {
            tracing::warn!(
                kafka = %kafka.id,
                assigned_cluster = %kafka.cluster_id,
                reporting_cluster = %cluster.cluster_id,
                "kafka is not assigned to the reporting cluster, skipping"
            );
            return Ok(());
        }

        let kafka = self.update_version_fields(kafka, report)?;
        match classify(&report.conditions) {
            KafkaStatusClass::Ready => self.set_kafka_ready(cluster, kafka, report),
            KafkaStatusClass::Error => {
                let message = find_ready_condition(&report.conditions).map(|cond| cond.message.as_str()).unwrap_or_default();
                self.set_kafka_failed(&kafka, message)
            }
            KafkaStatusClass::Deleted => self.set_kafka_deleting(&kafka),
            KafkaStatusClass::Rejected => self.reassign_kafka(&kafka),
            KafkaStatusClass::Unknown => {
                tracing::info!(kafka = %kafka.id, "kafka status is unknown");
                Ok(())
            }
            KafkaStatusClass::Installing => {
                tracing::debug!(kafka = %kafka.id, "kafka is still installing");
                Ok(())
            }
        }
    }

    /// Track the versions & upgrade flags reported for the kafka, returning its latest state.
    fn update_version_fields(&self, kafka: KafkaRequest, report: &DataPlaneKafkaStatus) -> Result<KafkaRequest> {
        let ready_reason = find_ready_condition(&report.conditions).map(|cond| cond.reason.clone());
        let written = self.kafkas.modify_kafka(&kafka.id, &mut |kafka: &mut KafkaRequest| {
            let mut changed = false;
            if !report.kafka_version.is_empty() && report.kafka_version != kafka.actual_kafka_version {
                kafka.actual_kafka_version = report.kafka_version.clone();
                changed = true;
            }
            if !report.strimzi_version.is_empty() && report.strimzi_version != kafka.actual_strimzi_version {
                kafka.actual_strimzi_version = report.strimzi_version.clone();
                changed = true;
            }
            if let Some(reason) = ready_reason.as_deref() {
                let strimzi_upgrading = reason == REASON_STRIMZI_UPDATING;
                let kafka_upgrading = reason == REASON_KAFKA_UPDATING;
                if kafka.strimzi_upgrading != strimzi_upgrading || kafka.kafka_upgrading != kafka_upgrading {
                    kafka.strimzi_upgrading = strimzi_upgrading;
                    kafka.kafka_upgrading = kafka_upgrading;
                    changed = true;
                }
            }
            changed
        })?;
        Ok(written.unwrap_or(kafka))
    }

    fn set_kafka_ready(&self, cluster: &Cluster, mut kafka: KafkaRequest, report: &DataPlaneKafkaStatus) -> Result<()> {
        if kafka.routes.is_empty() {
            kafka = self.persist_kafka_routes(cluster, &kafka, &report.routes)?;
        }
        if !kafka.routes_created {
            tracing::debug!(kafka = %kafka.id, "routes of kafka are not yet created");
            return Ok(());
        }

        let written = self.kafkas.modify_kafka(&kafka.id, &mut |kafka: &mut KafkaRequest| {
            if kafka.status != KafkaStatus::Provisioning {
                return false;
            }
            kafka.status = KafkaStatus::Ready;
            kafka.failed_reason.clear();
            true
        })?;
        if let Some(kafka) = written {
            self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
                status: KafkaStatus::Ready,
                kafka_id: kafka.id.clone(),
                cluster_id: kafka.cluster_id.clone(),
                elapsed: kafka.age(),
            });
            self.metrics.record(MetricEvent::KafkaCreationDuration { elapsed: kafka.age() });
            self.metrics.record(MetricEvent::KafkaOperationSuccess(KafkaOperation::Create));
            self.metrics.record(MetricEvent::KafkaOperationTotal(KafkaOperation::Create));
            tracing::info!(kafka = %kafka.id, cluster = %kafka.cluster_id, "kafka is ready");
        }
        Ok(())
    }

    fn persist_kafka_routes(&self, cluster: &Cluster, kafka: &KafkaRequest, agent_routes: &[KafkaAgentRoute]) -> Result<KafkaRequest> {
        let cluster_dns = self
            .clusters
            .get_cluster_dns(&cluster.cluster_id)
            .with_context(|| format!("failed to get DNS entry for cluster {}", cluster.cluster_id))?;
        let routes = if agent_routes.is_empty() {
            default_routes(kafka, &cluster_dns, self.config.num_of_brokers)
        } else {
            build_routes(agent_routes, kafka, &cluster_dns)?
        };

        let routes_created = !self.config.manage_route_dns;
        let written = self.kafkas.modify_kafka(&kafka.id, &mut |kafka: &mut KafkaRequest| {
            if !kafka.routes.is_empty() {
                return false;
            }
            kafka.routes = routes.clone();
            kafka.routes_created = routes_created;
            true
        })?;
        tracing::info!(kafka = %kafka.id, "stored routes of kafka");
        match written {
            Some(kafka) => Ok(kafka),
            None => self
                .kafkas
                .get_kafka(&kafka.id)?
                .ok_or_else(|| AppError::ResourceNotFound(format!("kafka {}", kafka.id)).into()),
        }
    }

    fn set_kafka_failed(&self, kafka: &KafkaRequest, message: &str) -> Result<()> {
        if kafka.status == KafkaStatus::Failed {
            return Ok(());
        }
        let failed_reason = format!("Kafka reported as failed: '{}'", message);
        let mut prior = kafka.status;
        let written = self.kafkas.modify_kafka(&kafka.id, &mut |kafka: &mut KafkaRequest| {
            if kafka.status == KafkaStatus::Failed {
                return false;
            }
            prior = kafka.status;
            kafka.status = KafkaStatus::Failed;
            kafka.failed_reason = failed_reason.clone();
            true
        })?;
        if let Some(kafka) = written {
            if prior == KafkaStatus::Provisioning {
                self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
                    status: KafkaStatus::Failed,
                    kafka_id: kafka.id.clone(),
                    cluster_id: kafka.cluster_id.clone(),
                    elapsed: kafka.age(),
                });
                self.metrics.record(MetricEvent::KafkaOperationTotal(KafkaOperation::Create));
            }
            tracing::error!(kafka = %kafka.id, reason = %kafka.failed_reason, "kafka reported as failed by the data plane agent");
        }
        Ok(())
    }

    fn set_kafka_deleting(&self, kafka: &KafkaRequest) -> Result<()> {
        let updated = self
            .kafkas
            .update_kafka_status(&kafka.id, KafkaStatus::Deleting)
            .with_context(|| format!("failed to update status {} for kafka {}", KafkaStatus::Deleting, kafka.id))?;
        if updated {
            self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
                status: KafkaStatus::Deleting,
                kafka_id: kafka.id.clone(),
                cluster_id: kafka.cluster_id.clone(),
                elapsed: kafka.age(),
            });
        }
        Ok(())
    }

    fn reassign_kafka(&self, kafka: &KafkaRequest) -> Result<()> {
        let placement_id = new_id();
        let written = self.kafkas.modify_kafka(&kafka.id, &mut |kafka: &mut KafkaRequest| {
            if kafka.status != KafkaStatus::Provisioning {
                return false;
            }
            kafka.placement_id = placement_id.clone();
            true
        })?;
        match written {
            Some(kafka) => {
                self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
                    status: KafkaStatus::Provisioning,
                    kafka_id: kafka.id.clone(),
                    cluster_id: kafka.cluster_id.clone(),
                    elapsed: kafka.age(),
                });
                tracing::info!(kafka = %kafka.id, placement_id = %kafka.placement_id, "kafka rejected by data plane, placement reassigned");
            }
            None => tracing::info!(kafka = %kafka.id, status = %kafka.status, "kafka rejected by data plane outside of provisioning, ignoring"),
        }
        Ok(())
    }
}

/// Build the routes of a kafka from the route entries reported by its cluster's agent.
///
/// Every router must be the cluster's base domain or one of its subdomains.
pub fn build_routes(agent_routes: &[KafkaAgentRoute], kafka: &KafkaRequest, cluster_dns: &str) -> Result<Vec<KafkaRoute>> {
    let ingress_prefix = format!("{}.", DEFAULT_INGRESS_DNS_NAME_PREFIX);
    let base_domain = cluster_dns.strip_prefix(ingress_prefix.as_str()).unwrap_or(cluster_dns);
    let subdomain_suffix = format!(".{}", base_domain);
    agent_routes
        .iter()
        .map(|route| {
            if route.router != base_domain && !route.router.ends_with(subdomain_suffix.as_str()) {
                bail!(AppError::InvalidInput(format!(
                    "router {:?} of route {:?} does not belong to cluster domain {:?}",
                    route.router, route.name, base_domain
                )));
            }
            let domain = if route.prefix.is_empty() {
                kafka.bootstrap_server_host.clone()
            } else {
                format!("{}-{}", route.prefix, kafka.bootstrap_server_host)
            };
            Ok(KafkaRoute {
                domain,
                router: route.router.clone(),
            })
        })
        .collect()
}

/// Build the default routes of a kafka when its cluster's agent reports none.
pub fn default_routes(kafka: &KafkaRequest, cluster_dns: &str, num_of_brokers: u32) -> Vec<KafkaRoute> {
    let router = format!("router-default.{}", cluster_dns);
    let host = &kafka.bootstrap_server_host;
    let mut routes = vec![
        KafkaRoute {
            domain: host.clone(),
            router: router.clone(),
        },
        KafkaRoute {
            domain: format!("admin-server-{}", host),
            router: router.clone(),
        },
    ];
    routes.extend((0..num_of_brokers).map(|idx| KafkaRoute {
        domain: format!("broker-{}-{}", idx, host),
        router: router.clone(),
    }));
    routes
}
