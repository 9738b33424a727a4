//! Admission of new kafka requests.


use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use time::OffsetDateTime;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{new_id, KafkaRequest, KafkaStatus, INSTANCE_TYPE_STANDARD};
use crate::placement::ClusterPlacementStrategy;
use crate::quota::QuotaServiceFactory;
use crate::store::KafkaStore;
use crate::telemetry::{KafkaOperation, MetricEvent, Metrics};

/// Gate-keeps new kafka requests against fleet capacity & quota.
///
/// The capacity checks & the insert of a request form one critical section per registrar.
/// Separate registrars, as in separate processes, do not exclude each other.
pub struct KafkaRegistrar {
    config: Arc<Config>,
    kafkas: Arc<dyn KafkaStore>,
    placement: Arc<ClusterPlacementStrategy>,
    quotas: QuotaServiceFactory,
    metrics: Arc<dyn Metrics>,
    lock: Mutex<()>,
}

impl KafkaRegistrar {
    /// Create a new instance.
    pub fn new(
        config: Arc<Config>, kafkas: Arc<dyn KafkaStore>, placement: Arc<ClusterPlacementStrategy>, quotas: QuotaServiceFactory, metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            config,
            kafkas,
            placement,
            quotas,
            metrics,
            lock: Mutex::new(()),
        }
    }

    /// Admit the given kafka request, returning the stored request in the accepted status.
    #[tracing::instrument(level = "debug", skip(self, request), fields(name = %request.name, instance_type = %request.instance_type))]
    pub fn register_kafka_job(&self, request: KafkaRequest) -> Result<KafkaRequest> {
        let _guard = self.lock.lock().map_err(|_| AppError::Ise(anyhow!("kafka admission lock poisoned")))?;

        let mut kafka = request;
        kafka.id = new_id();
        kafka.multi_az = kafka.instance_type == INSTANCE_TYPE_STANDARD;
        let size = self.config.instance_types.instance_size(&kafka.instance_type, &kafka.size_id)?.clone();

        let live = self.kafkas.count_kafkas().context("failed to count kafka instances")?;
        if live >= self.config.max_capacity {
            bail!(AppError::TooManyInstances(format!(
                "cluster capacity of {} kafka instances has been reached",
                self.config.max_capacity
            )));
        }

        let enterprise = kafka.is_enterprise();
        if !enterprise && !self.has_available_capacity_in_region(&kafka, size.capacity_consumed)? {
            bail!(AppError::TooManyInstances(format!(
                "region {} cannot accept instance type: {} at this moment",
                kafka.region, kafka.instance_type
            )));
        }

        // Auto scaling places managed requests asynchronously in the accepted worker.
        if enterprise || !self.config.dataplane.is_auto_scaling_enabled() {
            let cluster = self
                .placement
                .find_cluster(&kafka)
                .with_context(|| format!("failed to find a cluster for kafka {}", kafka.name))?
                .ok_or_else(|| {
                    if enterprise {
                        AppError::TooManyInstances(format!(
                            "cluster {:?} cannot accept instance type: {:?} at this moment",
                            kafka.cluster_id, kafka.instance_type
                        ))
                    } else {
                        AppError::TooManyInstances(format!(
                            "region {} cannot accept instance type: {} at this moment",
                            kafka.region, kafka.instance_type
                        ))
                    }
                })?;
            if enterprise {
                kafka.cloud_provider = cluster.cloud_provider.clone();
                kafka.region = cluster.region.clone();
            }
            kafka.cluster_id = cluster.cluster_id;
        }

        if kafka.is_developer() {
            self.check_developer_limits(&kafka)?;
        }

        let quota = self.quotas.get_quota_service(&self.config.quota_type)?;
        if !quota.check_quota(&kafka)? {
            bail!(AppError::QuotaExceeded(format!(
                "insufficient quota: owner {} is not entitled to {} instances",
                kafka.owner, kafka.instance_type
            )));
        }
        kafka.subscription_id = quota.reserve_quota(&kafka)?;

        let now = OffsetDateTime::now_utc();
        kafka.status = KafkaStatus::Accepted;
        kafka.quota_type = self.config.quota_type.clone();
        kafka.created_at = now;
        kafka.updated_at = now;
        kafka.expires_at = size.lifespan_seconds.map(|secs| now + time::Duration::seconds(secs));
        self.kafkas
            .create_kafka(&kafka)
            .with_context(|| format!("failed to create kafka request {}", kafka.name))?;

        self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
            status: KafkaStatus::Accepted,
            kafka_id: kafka.id.clone(),
            cluster_id: kafka.cluster_id.clone(),
            elapsed: kafka.age(),
        });
        tracing::info!(kafka = %kafka.id, name = %kafka.name, cluster = %kafka.cluster_id, "registered new kafka request");
        Ok(kafka)
    }

    /// Request the deprovisioning of the given kafka.
    ///
    /// A kafka already being deprovisioned or deleted is left untouched.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn register_kafka_deprovision_job(&self, id: &str) -> Result<()> {
        self.metrics.record(MetricEvent::KafkaOperationTotal(KafkaOperation::Deprovision));
        let kafka = self
            .kafkas
            .get_kafka(id)?
            .ok_or_else(|| AppError::ResourceNotFound(format!("kafka {}", id)))?;
        if kafka.status == KafkaStatus::Deleting {
            tracing::debug!(kafka = %id, "kafka is already being deleted");
            return Ok(());
        }
        let updated = self
            .kafkas
            .update_kafka_status(id, KafkaStatus::Deprovision)
            .with_context(|| format!("failed to update status {} for kafka {}", KafkaStatus::Deprovision, id))?;
        if updated {
            self.metrics.record(MetricEvent::KafkaOperationSuccess(KafkaOperation::Deprovision));
            self.metrics.record(MetricEvent::KafkaStatusSinceCreated {
                status: KafkaStatus::Deprovision,
                kafka_id: kafka.id.clone(),
                cluster_id: kafka.cluster_id.clone(),
                elapsed: kafka.age(),
            });
            tracing::info!(kafka = %id, "registered kafka deprovision job");
        }
        Ok(())
    }

    /// Check the region limit of the request's instance type.
    ///
    /// A region without a configured limit accepts the request, placement decides later.
    fn has_available_capacity_in_region(&self, kafka: &KafkaRequest, weight: i64) -> Result<bool> {
        let limit = match self
            .config
            .providers
            .instance_limit(&kafka.region, &kafka.cloud_provider, &kafka.instance_type)?
        {
            Some(limit) => limit,
            None => return Ok(true),
        };
        if limit <= 0 {
            return Ok(false);
        }

        let in_region = self
            .kafkas
            .find_kafkas(&|other: &KafkaRequest| {
                other.region == kafka.region
                    && other.cloud_provider == kafka.cloud_provider
                    && other.instance_type == kafka.instance_type
                    && other.status != KafkaStatus::Deleting
            })
            .with_context(|| format!("failed to count kafka instances in region {}", kafka.region))?;
        let mut used = 0;
        for other in in_region.iter() {
            used += self.config.instance_types.capacity_consumed(&other.instance_type, &other.size_id)?;
        }
        Ok(used + weight <= limit)
    }

    fn check_developer_limits(&self, kafka: &KafkaRequest) -> Result<()> {
        if !self.config.allow_developer_instance {
            bail!(AppError::Forbidden("developer instances are not allowed".into()));
        }
        let owned = self
            .kafkas
            .find_kafkas(&|other: &KafkaRequest| other.is_developer() && other.owner == kafka.owner && other.status != KafkaStatus::Deleting)
            .with_context(|| format!("failed to count developer instances of {}", kafka.owner))?
            .len() as i64;
        if owned >= self.config.max_allowed_developer_instances {
            bail!(AppError::TooManyInstances(format!(
                "only {} developer instance(s) allowed per user",
                self.config.max_allowed_developer_instances
            )));
        }
        Ok(())
    }
}
