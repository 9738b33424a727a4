//! Background workers driving accepted requests towards provisioning & deleted requests out
//! of the fleet.

mod accepted;
mod deleting;
mod preparing;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::stream::StreamExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;

use crate::database::Database;

pub use accepted::AcceptedKafkaWorker;
pub use deleting::DeletingKafkaWorker;
pub use preparing::{bootstrap_server_host, namespace_name, PreparingKafkaWorker};

/// A reconciliation pass executed periodically by a worker controller.
pub trait Worker: Send + Sync + 'static {
    /// The name of this worker, used for logging.
    fn name(&self) -> &'static str;

    /// Execute one pass, returning the number of kafkas advanced.
    ///
    /// Failures of individual kafkas are logged and do not fail the pass.
    fn reconcile(&self) -> Result<usize>;
}

/// A controller executing a worker on a fixed interval until shutdown.
pub struct WorkerCtl {
    worker: Arc<dyn Worker>,
    interval: Duration,
    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,
}

impl WorkerCtl {
    /// Create a new instance.
    pub fn new(worker: Arc<dyn Worker>, interval: Duration, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            worker,
            interval,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        tracing::debug!(worker = self.worker.name(), "worker has started");
        let timer = tokio::time::sleep(self.interval);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => {
                    timer.set(tokio::time::sleep(self.interval));
                    self.reconcile().await;
                }
                _ = self.shutdown_rx.next() => break,
            }
        }

        tracing::debug!(worker = self.worker.name(), "worker has shutdown");
        Ok(())
    }

    /// Execute a single pass of the worker.
    #[tracing::instrument(level = "trace", skip(self), fields(worker = self.worker.name()))]
    async fn reconcile(&mut self) {
        let worker = self.worker.clone();
        match Database::spawn_blocking(move || worker.reconcile()).await {
            Ok(Ok(count)) if count > 0 => tracing::debug!(worker = self.worker.name(), count, "worker pass finished"),
            Ok(Ok(_)) => (),
            Ok(Err(err)) => tracing::error!(error = ?err, worker = self.worker.name(), "error during worker pass"),
            Err(err) => {
                tracing::error!(error = ?err, worker = self.worker.name(), "error joining worker pass, shutting down");
                let _ = self.shutdown_tx.send(());
            }
        }
    }
}
