//! Metrics emitted by the placement & reconciliation core.

use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};

use crate::config::Config;
use crate::models::{ClusterStatus, KafkaStatus};

pub const METRIC_CLUSTER_STATUS_SINCE_CREATED: &str = "fleet_manager_cluster_status_since_created_in_seconds";
pub const METRIC_CLUSTER_CREATE_DURATION: &str = "fleet_manager_cluster_create_request_duration_seconds";
pub const METRIC_KAFKA_STATUS_SINCE_CREATED: &str = "fleet_manager_kafka_requests_status_since_created_in_seconds";
pub const METRIC_KAFKA_CREATE_DURATION: &str = "fleet_manager_kafka_create_request_duration_seconds";
pub const METRIC_KAFKA_OPERATIONS_TOTAL: &str = "fleet_manager_kafka_operations_total_count";
pub const METRIC_KAFKA_OPERATIONS_SUCCESS: &str = "fleet_manager_kafka_operations_success_count";

/// A kafka operation tracked by the operation counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KafkaOperation {
    Create,
    Deprovision,
    Delete,
}

impl KafkaOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Deprovision => "deprovision",
            Self::Delete => "delete",
        }
    }
}

/// A single metric emission.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricEvent {
    /// The time a cluster took to reach the given status since it was created.
    ClusterStatusSinceCreated { status: ClusterStatus, cluster_id: String, elapsed: Duration },
    /// The time a cluster took to become ready since it was created.
    ClusterCreationDuration { cluster_id: String, elapsed: Duration },
    /// The time a kafka took to reach the given status since it was created.
    KafkaStatusSinceCreated {
        status: KafkaStatus,
        kafka_id: String,
        cluster_id: String,
        elapsed: Duration,
    },
    /// The time a kafka took to become ready since it was created.
    KafkaCreationDuration { elapsed: Duration },
    KafkaOperationTotal(KafkaOperation),
    KafkaOperationSuccess(KafkaOperation),
}

/// A fire-and-forget metrics sink.
pub trait Metrics: Send + Sync {
    fn record(&self, event: MetricEvent);
}

/// A metrics sink backed by the global `metrics` recorder.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrometheusMetrics;

impl PrometheusMetrics {
    /// Register all metrics emitted by this sink.
    ///
    /// This function should be called only once, after the global recorder is installed.
    pub fn register() {
        metrics::register_histogram!(METRIC_CLUSTER_STATUS_SINCE_CREATED, metrics::Unit::Seconds, "time elapsed between cluster creation and a status change");
        metrics::register_histogram!(METRIC_CLUSTER_CREATE_DURATION, metrics::Unit::Seconds, "time taken by a cluster to become ready");
        metrics::register_histogram!(METRIC_KAFKA_STATUS_SINCE_CREATED, metrics::Unit::Seconds, "time elapsed between kafka creation and a status change");
        metrics::register_histogram!(METRIC_KAFKA_CREATE_DURATION, metrics::Unit::Seconds, "time taken by a kafka to become ready");
        metrics::register_counter!(METRIC_KAFKA_OPERATIONS_TOTAL, metrics::Unit::Count, "number of kafka operations attempted");
        metrics::register_counter!(METRIC_KAFKA_OPERATIONS_SUCCESS, metrics::Unit::Count, "number of kafka operations which succeeded");
    }
}

impl Metrics for PrometheusMetrics {
    fn record(&self, event: MetricEvent) {
        match event {
            MetricEvent::ClusterStatusSinceCreated { status, cluster_id, elapsed } => {
                metrics::histogram!(METRIC_CLUSTER_STATUS_SINCE_CREATED, elapsed, "status" => status.as_str(), "cluster_id" => cluster_id);
            }
            MetricEvent::ClusterCreationDuration { cluster_id, elapsed } => {
                metrics::histogram!(METRIC_CLUSTER_CREATE_DURATION, elapsed, "cluster_id" => cluster_id);
            }
            MetricEvent::KafkaStatusSinceCreated {
                status,
                kafka_id,
                cluster_id,
                elapsed,
            } => {
                metrics::histogram!(
                    METRIC_KAFKA_STATUS_SINCE_CREATED, elapsed,
                    "status" => status.as_str(), "kafka_id" => kafka_id, "cluster_id" => cluster_id
                );
            }
            MetricEvent::KafkaCreationDuration { elapsed } => {
                metrics::histogram!(METRIC_KAFKA_CREATE_DURATION, elapsed, "operation" => KafkaOperation::Create.as_str());
            }
            MetricEvent::KafkaOperationTotal(op) => metrics::increment_counter!(METRIC_KAFKA_OPERATIONS_TOTAL, "operation" => op.as_str()),
            MetricEvent::KafkaOperationSuccess(op) => metrics::increment_counter!(METRIC_KAFKA_OPERATIONS_SUCCESS, "operation" => op.as_str()),
        }
    }
}

/// Get a handle to the metrics recorder, initializing it as needed.
pub fn get_metrics_recorder(config: &Config) -> &'static PrometheusRecorder {
    static RECORDER: OnceLock<PrometheusRecorder> = OnceLock::new();
    RECORDER.get_or_init(|| {
        PrometheusBuilder::new()
            .add_global_label("scaling_type", format!("{:?}", config.dataplane.scaling_type).to_lowercase())
            .build()
    })
}

#[cfg(test)]
pub use recording::RecordingMetrics;
