use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::clusters::provider::{Provider, ProviderFactory};
use crate::clusters::ClusterService;
use crate::config::{ClusterConfig, Config, ManualCluster};
use crate::database::Database;
use crate::error::AppError;
use crate::fixtures;
use crate::models::{Cluster, ClusterStatus, ProviderType, INSTANCE_TYPE_STANDARD};
use crate::store::ClusterStore;

/// A provider answering DNS lookups with a fixed domain, counting the lookups.
#[derive(Default)]
struct DnsProvider {
    lookups: AtomicUsize,
}

impl Provider for DnsProvider {
    fn scale_up(&self, _cluster: &Cluster, _nodes: u32) -> Result<()> {
        Ok(())
    }

    fn scale_down(&self, _cluster: &Cluster, _nodes: u32) -> Result<()> {
        Ok(())
    }

    fn get_cluster_dns(&self, cluster: &Cluster) -> Result<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(format!("apps.{}.dns.example.com", cluster.cluster_id))
    }
}

fn manual_cluster(cluster_id: &str) -> ManualCluster {
    ManualCluster {
        name: cluster_id.into(),
        cluster_id: cluster_id.into(),
        cloud_provider: fixtures::PROVIDER.into(),
        region: fixtures::REGION.into(),
        multi_az: true,
        schedulable: true,
        kafka_instance_limit: 10,
        status: ClusterStatus::Ready,
        provider_type: ProviderType::Standalone,
        cluster_dns: format!("apps.{}.example.com", cluster_id),
        supported_instance_type: INSTANCE_TYPE_STANDARD.into(),
    }
}

async fn setup(config: Config, providers: ProviderFactory) -> Result<(ClusterService, Database)> {
    let config = Arc::new(config);
    let db = Database::new(config.clone()).await?;
    Ok((ClusterService::new(config, Arc::new(db.clone()), providers), db))
}

#[tokio::test]
async fn register_cluster_job_accepts_new_clusters_once() -> Result<()> {
    let (config, _tmpdir) = Config::new_test_unshared()?;
    let (clusters, db) = setup(config, ProviderFactory::default()).await?;
    let cluster = fixtures::ready_cluster("cluster-a");

    clusters.register_cluster_job(&cluster)?;
    let duplicate = clusters.register_cluster_job(&cluster).expect_err("expected duplicate registration to fail");

    let status = db.find_cluster_by_cluster_id("cluster-a")?.map(|val| val.status);
    assert_eq!(status, Some(ClusterStatus::Accepted), "expected registered cluster to be accepted");
    assert!(matches!(AppError::from_anyhow(duplicate), AppError::InvalidInput(_)), "expected invalid input for duplicate");
    Ok(())
}

#[tokio::test]
async fn register_configured_clusters_is_idempotent() -> Result<()> {
    let (mut config, _tmpdir) = Config::new_test_unshared()?;
    config.dataplane.cluster_config = ClusterConfig::new(vec![manual_cluster("cluster-a"), manual_cluster("cluster-b")])?;
    let (clusters, db) = setup(config, ProviderFactory::default()).await?;
    fixtures::setup_clusters(&db, &[fixtures::ready_cluster("cluster-b")])?;

    let first = clusters.register_configured_clusters()?;
    let second = clusters.register_configured_clusters()?;

    assert_eq!(first, 1, "expected only the unknown cluster to be registered got {}", first);
    assert_eq!(second, 0, "expected nothing to be registered again got {}", second);
    let cluster = db.find_cluster_by_cluster_id("cluster-a")?.context("cluster missing")?;
    assert_eq!(cluster.status, ClusterStatus::Ready, "expected configured status");
    assert_eq!(cluster.provider_type, ProviderType::Standalone, "expected configured provider type");
    assert_eq!(cluster.cluster_dns, "apps.cluster-a.example.com", "expected configured cluster DNS");
    Ok(())
}

#[tokio::test]
async fn get_cluster_dns_is_fetched_once_and_stored() -> Result<()> {
    let (config, _tmpdir) = Config::new_test_unshared()?;
    let provider = Arc::new(DnsProvider::default());
    let (clusters, db) = setup(config, ProviderFactory::default().with_provider(ProviderType::Ocm, provider.clone())).await?;
    let mut cluster = fixtures::ready_cluster("cluster-a");
    cluster.cluster_dns.clear();
    fixtures::setup_clusters(&db, &[cluster])?;

    let first = clusters.get_cluster_dns("cluster-a")?;
    let second = clusters.get_cluster_dns("cluster-a")?;

    assert_eq!(first, "apps.cluster-a.dns.example.com", "unexpected cluster DNS");
    assert_eq!(first, second, "expected the stored DNS to be returned");
    assert_eq!(provider.lookups.load(Ordering::SeqCst), 1, "expected a single provider lookup");
    let stored = db.find_cluster_by_cluster_id("cluster-a")?.map(|val| val.cluster_dns);
    assert_eq!(stored, Some(first), "expected the DNS to be stored on the cluster");
    Ok(())
}

#[tokio::test]
async fn get_cluster_dns_requires_a_configured_provider() -> Result<()> {
    let (config, _tmpdir) = Config::new_test_unshared()?;
    let (clusters, db) = setup(config, ProviderFactory::default()).await?;
    let mut cluster = fixtures::ready_cluster("cluster-a");
    cluster.cluster_dns.clear();
    fixtures::setup_clusters(&db, &[cluster])?;

    let err = clusters.get_cluster_dns("cluster-a").expect_err("expected missing provider to fail");

    assert!(matches!(AppError::from_anyhow(err), AppError::InvalidInput(_)), "expected invalid input error");
    Ok(())
}

#[tokio::test]
async fn scaling_requires_a_known_cluster() -> Result<()> {
    let (config, _tmpdir) = Config::new_test_unshared()?;
    let (clusters, db) = setup(config, ProviderFactory::default()).await?;
    let mut cluster = fixtures::ready_cluster("cluster-a");
    cluster.provider_type = ProviderType::Standalone;
    fixtures::setup_clusters(&db, &[cluster])?;

    clusters.scale_up("cluster-a", 3)?;
    clusters.scale_down("cluster-a", 3)?;
    let up = clusters.scale_up("missing", 3).expect_err("expected unknown cluster to fail");
    let down = clusters.scale_down("missing", 3).expect_err("expected unknown cluster to fail");

    assert!(matches!(AppError::from_anyhow(up), AppError::ResourceNotFound(_)), "expected not found on scale up");
    assert!(matches!(AppError::from_anyhow(down), AppError::ResourceNotFound(_)), "expected not found on scale down");
    Ok(())
}

#[tokio::test]
async fn standalone_clusters_require_a_configured_dns() -> Result<()> {
    let (config, _tmpdir) = Config::new_test_unshared()?;
    let (clusters, db) = setup(config, ProviderFactory::default()).await?;
    let mut cluster = fixtures::ready_cluster("cluster-a");
    cluster.provider_type = ProviderType::Standalone;
    cluster.cluster_dns.clear();
    fixtures::setup_clusters(&db, &[cluster])?;

    let err = clusters.get_cluster_dns("cluster-a").expect_err("expected standalone cluster without DNS to fail");

    assert!(matches!(AppError::from_anyhow(err), AppError::InvalidInput(_)), "expected invalid input error");
    let stored = db.find_cluster_by_cluster_id("cluster-a")?.map(|val| val.cluster_dns);
    assert_eq!(stored, Some(String::new()), "expected nothing to be stored");
    Ok(())
}
