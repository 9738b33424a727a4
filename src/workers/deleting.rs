use std::sync::Arc;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::models::{KafkaRequest, KafkaStatus};
use crate::quota::QuotaServiceFactory;
use crate::store::KafkaStore;
use crate::telemetry::{KafkaOperation, MetricEvent, Metrics};
use crate::workers::Worker;

/// Expires developer kafkas, releases kafkas which were never provisioned & removes kafkas
/// whose deletion was confirmed by their cluster's agent.
pub struct DeletingKafkaWorker {
    kafkas: Arc<dyn KafkaStore>,
    quotas: QuotaServiceFactory,
    metrics: Arc<dyn Metrics>,
}

impl DeletingKafkaWorker {
    /// Create a new instance.
    pub fn new(kafkas: Arc<dyn KafkaStore>, quotas: QuotaServiceFactory, metrics: Arc<dyn Metrics>) -> Self {
        Self { kafkas, quotas, metrics }
    }

    /// Request the deprovisioning of every kafka past its expiration time.
    fn expire_kafkas(&self) -> Result<usize> {
        let now = OffsetDateTime::now_utc();
        let expired = self
            .kafkas
            .find_kafkas(&|kafka: &KafkaRequest| {
                matches!(kafka.expires_at, Some(expires_at) if expires_at <= now)
                    && kafka.status != KafkaStatus::Deprovision
                    && kafka.status != KafkaStatus::Deleting
            })
            .context("failed to list expired kafkas")?;
        let mut count = 0;
        for kafka in expired.iter() {
            match self.kafkas.update_kafka_status(&kafka.id, KafkaStatus::Deprovision) {
                Ok(true) => {
                    tracing::info!(kafka = %kafka.id, "kafka has expired, deprovisioning");
                    count += 1;
                }
                Ok(false) => (),
                Err(err) => tracing::error!(error = ?err, kafka = %kafka.id, "failed to deprovision expired kafka"),
            }
        }
        Ok(count)
    }

    /// Move deprovisioned kafkas which never reached their cluster straight to `deleting`, no
    /// agent will ever report on them.
    fn release_unprovisioned_kafkas(&self) -> Result<usize> {
        let unplaced = self
            .kafkas
            .find_kafkas(&|kafka: &KafkaRequest| kafka.status == KafkaStatus::Deprovision && kafka.bootstrap_server_host.is_empty())
            .context("failed to list unprovisioned deprovisioned kafkas")?;
        let mut count = 0;
        for kafka in unplaced.iter() {
            match self.kafkas.update_kafka_status(&kafka.id, KafkaStatus::Deleting) {
                Ok(true) => count += 1,
                Ok(false) => (),
                Err(err) => tracing::error!(error = ?err, kafka = %kafka.id, "failed to update status of unprovisioned kafka"),
            }
        }
        Ok(count)
    }

    /// Release the quota of the given kafka & soft delete it.
    fn delete_kafka(&self, kafka: &KafkaRequest) -> Result<()> {
        self.metrics.record(MetricEvent::KafkaOperationTotal(KafkaOperation::Delete));
        let quota = self.quotas.get_quota_service(&kafka.quota_type)?;
        quota
            .delete_quota(&kafka.subscription_id)
            .with_context(|| format!("failed to delete quota of kafka {}", kafka.id))?;
        self.kafkas.delete_kafka(&kafka.id)?;
        self.metrics.record(MetricEvent::KafkaOperationSuccess(KafkaOperation::Delete));
        tracing::info!(kafka = %kafka.id, "kafka deleted");
        Ok(())
    }
}

impl Worker for DeletingKafkaWorker {
    fn name(&self) -> &'static str {
        "deleting_kafka"
    }

    fn reconcile(&self) -> Result<usize> {
        let mut count = self.expire_kafkas()?;
        count += self.release_unprovisioned_kafkas()?;

        let deleting = self
            .kafkas
            .list_kafkas_by_status(KafkaStatus::Deleting)
            .context("failed to list deleting kafkas")?;
        for kafka in deleting.iter() {
            match self.delete_kafka(kafka) {
                Ok(()) => count += 1,
                Err(err) => tracing::error!(error = ?err, kafka = %kafka.id, "failed to delete kafka"),
            }
        }
        Ok(count)
    }
}
