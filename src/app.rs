use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::StreamExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, SignalStream};
use tokio_stream::StreamMap;

use crate::admission::KafkaRegistrar;
use crate::clusters::provider::ProviderFactory;
use crate::clusters::ClusterService;
use crate::config::Config;
use crate::database::Database;
use crate::placement::ClusterPlacementStrategy;
use crate::quota::QuotaServiceFactory;
use crate::reconcile::{ClusterStatusReconciler, KafkaStatusReconciler};
use crate::server::spawn_metrics_server;
use crate::store::{ClusterStore, KafkaStore};
use crate::telemetry::{Metrics, PrometheusMetrics};
use crate::workers::{AcceptedKafkaWorker, DeletingKafkaWorker, PreparingKafkaWorker, WorkerCtl};

/// The services through which callers drive the fleet.
#[derive(Clone)]
pub struct Services {
    pub clusters: ClusterService,
    pub registrar: Arc<KafkaRegistrar>,
    pub cluster_status: ClusterStatusReconciler,
    pub kafka_status: KafkaStatusReconciler,
}

/// The application object for when the fleet manager is running as a server.
pub struct App {
    /// The application's runtime config.
    _config: Arc<Config>,
    /// The application's database system.
    db: Database,
    services: Services,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,

    /// The join handles of the background workers.
    workers: Vec<JoinHandle<Result<()>>>,
    /// The join handle of the metrics server.
    metrics_server: JoinHandle<Result<()>>,
}

impl App {
    /// Create a new instance.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);

        // Initialize this node's storage.
        let db = Database::new(config.clone()).await.context("error opening database")?;
        let cluster_store: Arc<dyn ClusterStore> = Arc::new(db.clone());
        let kafka_store: Arc<dyn KafkaStore> = Arc::new(db.clone());
        let metrics: Arc<dyn Metrics> = Arc::new(PrometheusMetrics);

        // Register statically configured clusters before anything is placed.
        let clusters = ClusterService::new(config.clone(), cluster_store.clone(), ProviderFactory::default());
        let registrar_clusters = clusters.clone();
        let registered = Database::spawn_blocking(move || registrar_clusters.register_configured_clusters())
            .await?
            .context("error registering configured clusters")?;
        tracing::info!(registered, scaling_type = ?config.dataplane.scaling_type, "registered configured clusters");

        let placement = Arc::new(ClusterPlacementStrategy::new(config.clone(), cluster_store.clone()));
        let quotas = QuotaServiceFactory::new(config.clone(), kafka_store.clone());
        let services = Services {
            clusters: clusters.clone(),
            registrar: Arc::new(KafkaRegistrar::new(
                config.clone(),
                kafka_store.clone(),
                placement.clone(),
                quotas.clone(),
                metrics.clone(),
            )),
            cluster_status: ClusterStatusReconciler::new(cluster_store, metrics.clone()),
            kafka_status: KafkaStatusReconciler::new(config.clone(), clusters.clone(), kafka_store.clone(), metrics.clone()),
        };

        // Spawn the background workers.
        let interval = Duration::from_secs(config.reconcile_interval_seconds);
        let workers = vec![
            WorkerCtl::new(
                Arc::new(AcceptedKafkaWorker::new(clusters.clone(), kafka_store.clone(), placement, metrics.clone())),
                interval,
                shutdown_tx.clone(),
            )
            .spawn(),
            WorkerCtl::new(
                Arc::new(PreparingKafkaWorker::new(config.clone(), clusters, kafka_store.clone(), metrics.clone())),
                interval,
                shutdown_tx.clone(),
            )
            .spawn(),
            WorkerCtl::new(Arc::new(DeletingKafkaWorker::new(kafka_store, quotas, metrics)), interval, shutdown_tx.clone()).spawn(),
        ];

        let metrics_server = spawn_metrics_server(&config, shutdown_tx.subscribe());

        Ok(Self {
            _config: config,
            db,
            services,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
            workers,
            metrics_server,
        })
    }

    /// The services of this application.
    pub fn services(&self) -> Services {
        self.services.clone()
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        let mut signals = StreamMap::new();
        signals.insert("sigterm", SignalStream::new(signal(SignalKind::terminate()).context("error building signal stream")?));
        signals.insert("sigint", SignalStream::new(signal(SignalKind::interrupt()).context("error building signal stream")?));

        loop {
            tokio::select! {
                Some((_, sig)) = signals.next() => {
                    tracing::debug!(signal = ?sig, "signal received, beginning graceful shutdown");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = self.shutdown_rx.next() => break,
            }
        }

        // Begin shutdown routine.
        tracing::debug!("fleet manager is shutting down");
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await.context("error joining worker handle").and_then(|res| res) {
                tracing::error!(error = ?err, "error shutting down worker");
            }
        }
        if let Err(err) = self.metrics_server.await.context("error joining metrics server handle").and_then(|res| res) {
            tracing::error!(error = ?err, "error shutting down metrics server");
        }
        if let Err(err) = self.db.flush().await {
            tracing::error!(error = ?err, "error flushing database during shutdown");
        }

        tracing::debug!("fleet manager shutdown complete");
        Ok(())
    }
}
