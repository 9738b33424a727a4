//! Database management.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sled::{Config as SledConfig, Db};

use crate::config::Config;
use crate::error::{ShutdownError, ShutdownResult, ERR_DB_FLUSH};

pub type Tree = sled::Tree;

/// The default path to use for data storage.
pub const DEFAULT_DATA_PATH: &str = "/usr/local/fleet-manager/db";
/// The DB tree used for data plane clusters.
const TREE_CLUSTERS: &str = "clusters";
/// The DB tree used for kafka requests.
const TREE_KAFKAS: &str = "kafkas";

/// The default path to use for data storage.
pub fn default_data_path() -> String {
    DEFAULT_DATA_PATH.to_string()
}

/// An abstraction over the fleet manager database.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    /// System runtime config.
    config: Arc<Config>,
    /// The underlying DB handle.
    db: Db,
    /// The tree of cluster records keyed by cluster ID.
    clusters: Tree,
    /// The tree of kafka requests keyed by kafka ID.
    kafkas: Tree,
}

impl Database {
    /// Open the database for usage.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        // Determine the database path, and ensure it exists.
        let dbpath = PathBuf::from(&config.storage_data_path);
        tokio::fs::create_dir_all(&dbpath)
            .await
            .context("error creating dir for fleet manager database")?;

        Self::spawn_blocking(move || -> Result<Self> {
            let db = SledConfig::new()
                .path(dbpath)
                .mode(sled::Mode::HighThroughput)
                .open()
                .context("error opening database")?;
            let clusters = db.open_tree(TREE_CLUSTERS).with_context(|| format!("could not open DB tree {}", TREE_CLUSTERS))?;
            let kafkas = db.open_tree(TREE_KAFKAS).with_context(|| format!("could not open DB tree {}", TREE_KAFKAS))?;
            let inner = Arc::new(DatabaseInner { config, db, clusters, kafkas });
            Ok(Self { inner })
        })
        .await?
    }

    /// Spawn a blocking database-related function, returning a ShutdownError if anything goes
    /// wrong related to spawning & joining.
    #[tracing::instrument(level = "trace", skip(f), err)]
    pub async fn spawn_blocking<F, R>(f: F) -> ShutdownResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|err| ShutdownError::from(anyhow::Error::from(err)))
    }

    /// The runtime config this database was opened with.
    pub fn config(&self) -> &Arc<Config> {
        &self.inner.config
    }

    /// Get a handle to the DB tree of clusters.
    pub fn clusters_tree(&self) -> &Tree {
        &self.inner.clusters
    }

    /// Get a handle to the DB tree of kafka requests.
    pub fn kafkas_tree(&self) -> &Tree {
        &self.inner.kafkas
    }

    /// Flush all pending writes to disk.
    pub async fn flush(&self) -> Result<()> {
        let db = self.inner.db.clone();
        Self::spawn_blocking(move || db.flush().context(ERR_DB_FLUSH))
            .await??;
        Ok(())
    }
}
