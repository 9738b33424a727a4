//! Provisioning providers of data plane clusters.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::error::AppError;
use crate::models::{Cluster, ProviderType};

/// The capacity operations of a cluster provisioning provider.
pub trait Provider: Send + Sync {
    /// Add the given number of compute nodes to the cluster.
    fn scale_up(&self, cluster: &Cluster, nodes: u32) -> Result<()>;

    /// Remove the given number of compute nodes from the cluster.
    fn scale_down(&self, cluster: &Cluster, nodes: u32) -> Result<()>;

    /// Get the ingress DNS of the cluster.
    fn get_cluster_dns(&self, cluster: &Cluster) -> Result<String>;
}

/// Resolves the provider responsible for a cluster.
#[derive(Clone)]
pub struct ProviderFactory {
    providers: HashMap<ProviderType, Arc<dyn Provider>>,
}

impl Default for ProviderFactory {
    fn default() -> Self {
        let mut providers: HashMap<ProviderType, Arc<dyn Provider>> = HashMap::new();
        providers.insert(ProviderType::Standalone, Arc::new(StandaloneProvider));
        Self { providers }
    }
}

impl ProviderFactory {
    /// Add or replace the provider of the given type.
    pub fn with_provider(mut self, provider_type: ProviderType, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider_type, provider);
        self
    }

    /// Get the provider of the given type.
    pub fn get_provider(&self, provider_type: ProviderType) -> Result<Arc<dyn Provider>> {
        match self.providers.get(&provider_type) {
            Some(provider) => Ok(provider.clone()),
            None => bail!(AppError::InvalidInput(format!("provider type {} is not configured", provider_type))),
        }
    }
}

/// The provider of clusters which are provisioned outside of the fleet manager.
///
/// Capacity of such clusters is managed by their operators, so scaling is a no-op.
pub struct StandaloneProvider;

impl Provider for StandaloneProvider {
    fn scale_up(&self, cluster: &Cluster, nodes: u32) -> Result<()> {
        tracing::debug!(cluster = %cluster.cluster_id, nodes, "scaling of standalone clusters is managed externally");
        Ok(())
    }

    fn scale_down(&self, cluster: &Cluster, nodes: u32) -> Result<()> {
        tracing::debug!(cluster = %cluster.cluster_id, nodes, "scaling of standalone clusters is managed externally");
        Ok(())
    }

    fn get_cluster_dns(&self, cluster: &Cluster) -> Result<String> {
        if cluster.cluster_dns.is_empty() {
            bail!(AppError::InvalidInput(format!("standalone cluster {} has no cluster_dns configured", cluster.cluster_id)));
        }
        Ok(cluster.cluster_dns.clone())
    }
}
