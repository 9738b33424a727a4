//! Data plane cluster lifecycle operations.

pub mod provider;
#[cfg(test)]
mod mod_test;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, ManualCluster};
use crate::error::AppError;
use crate::models::{Cluster, ClusterStatus, ClusterType};
use crate::store::ClusterStore;
use provider::ProviderFactory;

/// Cluster registration, lookup & scaling.
#[derive(Clone)]
pub struct ClusterService {
    config: Arc<Config>,
    store: Arc<dyn ClusterStore>,
    providers: ProviderFactory,
}

impl ClusterService {
    /// Create a new instance.
    pub fn new(config: Arc<Config>, store: Arc<dyn ClusterStore>, providers: ProviderFactory) -> Self {
        Self { config, store, providers }
    }

    /// Register a new cluster in the accepted status.
    pub fn register_cluster_job(&self, cluster: &Cluster) -> Result<()> {
        let mut cluster = cluster.clone();
        cluster.status = ClusterStatus::Accepted;
        self.store
            .register_cluster(&cluster)
            .with_context(|| format!("failed to register cluster job for cluster {}", cluster.cluster_id))?;
        tracing::info!(cluster = %cluster.cluster_id, provider = %cluster.provider_type, "registered new cluster job");
        Ok(())
    }

    /// Register every statically configured cluster which is not yet known.
    ///
    /// Returns the number of clusters registered.
    pub fn register_configured_clusters(&self) -> Result<usize> {
        let mut registered = 0;
        for manual in self.config.dataplane.cluster_config.clusters() {
            if self.store.find_cluster_by_cluster_id(&manual.cluster_id)?.is_some() {
                continue;
            }
            let cluster = cluster_from_config(manual);
            self.store
                .register_cluster(&cluster)
                .with_context(|| format!("failed to register configured cluster {}", manual.cluster_id))?;
            tracing::info!(cluster = %cluster.cluster_id, status = %cluster.status, "registered configured cluster");
            registered += 1;
        }
        Ok(registered)
    }

    /// Find a cluster by its cluster ID.
    pub fn find_cluster_by_id(&self, cluster_id: &str) -> Result<Option<Cluster>> {
        self.store
            .find_cluster_by_cluster_id(cluster_id)
            .with_context(|| format!("failed to find cluster {}", cluster_id))
    }

    /// Get the ingress DNS of the given cluster, fetching it from its provider on first use.
    pub fn get_cluster_dns(&self, cluster_id: &str) -> Result<String> {
        let mut cluster = self.must_find_cluster(cluster_id)?;
        if !cluster.cluster_dns.is_empty() {
            return Ok(cluster.cluster_dns);
        }
        let provider = self.providers.get_provider(cluster.provider_type)?;
        let dns = provider
            .get_cluster_dns(&cluster)
            .with_context(|| format!("failed to get cluster DNS of cluster {} from provider", cluster_id))?;
        cluster.cluster_dns = dns.clone();
        self.store.update_cluster(&cluster)?;
        Ok(dns)
    }

    /// Add compute nodes to the given cluster.
    pub fn scale_up(&self, cluster_id: &str, nodes: u32) -> Result<()> {
        let cluster = self.must_find_cluster(cluster_id)?;
        let provider = self.providers.get_provider(cluster.provider_type)?;
        provider
            .scale_up(&cluster, nodes)
            .with_context(|| format!("failed to scale up cluster {} by {} nodes", cluster_id, nodes))?;
        tracing::info!(cluster = %cluster_id, nodes, "scaled up cluster");
        Ok(())
    }

    /// Remove compute nodes from the given cluster.
    pub fn scale_down(&self, cluster_id: &str, nodes: u32) -> Result<()> {
        let cluster = self.must_find_cluster(cluster_id)?;
        let provider = self.providers.get_provider(cluster.provider_type)?;
        provider
            .scale_down(&cluster, nodes)
            .with_context(|| format!("failed to scale down cluster {} by {} nodes", cluster_id, nodes))?;
        tracing::info!(cluster = %cluster_id, nodes, "scaled down cluster");
        Ok(())
    }

    fn must_find_cluster(&self, cluster_id: &str) -> Result<Cluster> {
        match self.find_cluster_by_id(cluster_id)? {
            Some(cluster) => Ok(cluster),
            None => Err(AppError::ResourceNotFound(format!("cluster {}", cluster_id)).into()),
        }
    }
}

/// Build a cluster record from its static configuration.
fn cluster_from_config(manual: &ManualCluster) -> Cluster {
    let mut cluster = Cluster::new(&manual.cluster_id, &manual.cloud_provider, &manual.region, manual.multi_az);
    cluster.status = manual.status;
    cluster.cluster_type = ClusterType::Managed;
    cluster.provider_type = manual.provider_type;
    cluster.cluster_dns = manual.cluster_dns.clone();
    cluster.supported_instance_type = manual.supported_instance_type.clone();
    cluster
}
