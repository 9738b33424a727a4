use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::error::AppError;
use crate::models::status::find_ready_condition;
use crate::models::{ClusterStatus, DataPlaneClusterStatus};
use crate::reconcile::parse_condition_bool;
use crate::store::ClusterStore;
use crate::telemetry::{MetricEvent, Metrics};

/// Advances the lifecycle of data plane clusters from their agents' status reports.
#[derive(Clone)]
pub struct ClusterStatusReconciler {
    store: Arc<dyn ClusterStore>,
    metrics: Arc<dyn Metrics>,
}

impl ClusterStatusReconciler {
    /// Create a new instance.
    pub fn new(store: Arc<dyn ClusterStore>, metrics: Arc<dyn Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Apply a status report of the given cluster.
    ///
    /// Reports for clusters which can not accept them are ignored. Applying the same report
    /// more than once writes nothing & emits nothing after the first application.
    #[tracing::instrument(level = "debug", skip(self, report))]
    pub fn update_data_plane_cluster_status(&self, cluster_id: &str, report: &DataPlaneClusterStatus) -> Result<()> {
        if cluster_id.is_empty() {
            bail!(AppError::InvalidInput("cluster id is undefined".into()));
        }
        let mut cluster = self
            .store
            .find_cluster_by_cluster_id(cluster_id)
            .with_context(|| format!("failed to find cluster {}", cluster_id))?
            .ok_or_else(|| AppError::InvalidInput(format!("Cluster agent with ID '{}' not found", cluster_id)))?;

        if !cluster.status.accepts_status_reports() {
            tracing::debug!(cluster = %cluster_id, status = %cluster.status, "cluster can not accept status reports, ignoring");
            return Ok(());
        }

        let ready = match find_ready_condition(&report.conditions) {
            Some(cond) => parse_condition_bool(&cond.status).with_context(|| format!("invalid Ready condition reported for cluster {}", cluster_id))?,
            None => false,
        };

        if !ready {
            if cluster.status != ClusterStatus::WaitingForFleetshardOperator {
                self.store
                    .update_cluster_status(cluster_id, ClusterStatus::WaitingForFleetshardOperator)
                    .with_context(|| format!("failed to update status of cluster {}", cluster_id))?;
                self.metrics.record(MetricEvent::ClusterStatusSinceCreated {
                    status: ClusterStatus::WaitingForFleetshardOperator,
                    cluster_id: cluster_id.into(),
                    elapsed: cluster.age(),
                });
                tracing::info!(cluster = %cluster_id, "cluster is not ready, waiting for fleetshard operator");
            }
            return Ok(());
        }

        if cluster.strimzi_versions_differ(&report.available_strimzi_versions) {
            cluster.available_strimzi_versions = report.available_strimzi_versions.clone();
            self.store
                .update_cluster(&cluster)
                .with_context(|| format!("failed to update available strimzi versions of cluster {}", cluster_id))?;
        }

        if cluster.status != ClusterStatus::Ready {
            let prior = cluster.status;
            self.store
                .update_cluster_status(cluster_id, ClusterStatus::Ready)
                .with_context(|| format!("failed to update status of cluster {}", cluster_id))?;
            if prior == ClusterStatus::WaitingForFleetshardOperator {
                self.metrics.record(MetricEvent::ClusterCreationDuration {
                    cluster_id: cluster_id.into(),
                    elapsed: cluster.age(),
                });
            }
            self.metrics.record(MetricEvent::ClusterStatusSinceCreated {
                status: ClusterStatus::Ready,
                cluster_id: cluster_id.into(),
                elapsed: cluster.age(),
            });
            tracing::info!(cluster = %cluster_id, prior = %prior, "cluster is ready");
        }
        Ok(())
    }
}
