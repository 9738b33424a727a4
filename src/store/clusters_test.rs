use anyhow::Result;

use crate::config::Config;
use crate::database::Database;
use crate::error::AppError;
use crate::fixtures;
use crate::models::{ClusterStatus, KafkaStatus, INSTANCE_TYPE_DEVELOPER, INSTANCE_TYPE_STANDARD};
use crate::store::{ClusterStore, FindClusterCriteria, KafkaStore};

#[tokio::test]
async fn register_cluster_rejects_duplicates() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;
    let db = Database::new(config).await?;

    db.register_cluster(&fixtures::ready_cluster("cluster-a"))?;
    let err = db
        .register_cluster(&fixtures::ready_cluster("cluster-a"))
        .expect_err("expected duplicate registration to fail");

    assert!(matches!(AppError::from_anyhow(err), AppError::InvalidInput(_)), "expected invalid input error");
    Ok(())
}

#[tokio::test]
async fn find_cluster_by_cluster_id_absence_is_not_an_error() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;
    let db = Database::new(config).await?;

    let cluster = db.find_cluster_by_cluster_id("missing")?;

    assert!(cluster.is_none(), "expected no cluster got {:?}", cluster);
    Ok(())
}

#[tokio::test]
async fn find_all_clusters_matches_criteria_in_creation_order() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;
    let db = Database::new(config).await?;
    let mut other_region = fixtures::ready_cluster("cluster-c");
    other_region.region = "eu-west-1".into();
    let mut not_ready = fixtures::ready_cluster("cluster-d");
    not_ready.status = ClusterStatus::Provisioning;
    let mut developer_only = fixtures::ready_cluster("cluster-e");
    developer_only.supported_instance_type = INSTANCE_TYPE_DEVELOPER.into();
    fixtures::setup_clusters(
        &db,
        &[
            fixtures::ready_cluster("cluster-z"),
            other_region,
            not_ready,
            developer_only,
            fixtures::ready_cluster("cluster-a"),
        ],
    )?;
    let criteria = FindClusterCriteria::for_kafka(&fixtures::kafka_request("kafka"), ClusterStatus::Ready);

    let clusters = db.find_all_clusters(&criteria)?;
    let first = db.find_cluster(&criteria)?;

    let ids: Vec<&str> = clusters.iter().map(|val| val.cluster_id.as_str()).collect();
    assert_eq!(ids, vec!["cluster-z", "cluster-a"], "expected matching clusters in creation order");
    assert_eq!(first.map(|val| val.cluster_id), Some("cluster-z".to_string()), "expected first match to be cluster-z");
    Ok(())
}

#[tokio::test]
async fn find_kafka_instance_count_zero_fills_requested_clusters() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;
    let db = Database::new(config).await?;
    fixtures::setup_clusters(&db, &[fixtures::ready_cluster("cluster-a"), fixtures::ready_cluster("cluster-b")])?;
    let expected = fixtures::setup_kafkas(&db, "cluster-a")?;
    fixtures::setup_kafkas_in_status(&db, "cluster-a", KafkaStatus::Deleting, 3)?;
    fixtures::setup_kafkas(&db, "cluster-other")?;

    let counts = db.find_kafka_instance_count(&["cluster-a".to_string(), "cluster-b".to_string()])?;

    assert_eq!(counts.len(), 2, "expected an entry per requested cluster, got {:?}", counts);
    assert_eq!(counts[0].cluster_id, "cluster-a", "expected requested order to be kept");
    assert_eq!(counts[0].count, expected, "expected {} units on cluster-a got {}", expected, counts[0].count);
    assert_eq!(counts[1].cluster_id, "cluster-b", "expected requested order to be kept");
    assert_eq!(counts[1].count, 0, "expected cluster-b to be zero filled got {}", counts[1].count);
    Ok(())
}

#[tokio::test]
async fn find_kafka_instance_count_ignores_soft_deleted_kafkas() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;
    let db = Database::new(config).await?;
    let kafkas = fixtures::setup_kafkas_in_status(&db, "cluster-a", KafkaStatus::Ready, 2)?;
    db.delete_kafka(&kafkas[0].id)?;

    let counts = db.find_kafka_instance_count(&["cluster-a".to_string()])?;

    assert_eq!(counts[0].count, 1, "expected soft deleted kafka to be ignored got {}", counts[0].count);
    Ok(())
}

#[tokio::test]
async fn streaming_unit_counts_cover_every_supported_instance_type() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;
    let db = Database::new(config).await?;
    let mut failed = fixtures::ready_cluster_with_capacity("cluster-failed", 10);
    failed.status = ClusterStatus::Failed;
    fixtures::setup_clusters(
        &db,
        &[
            fixtures::ready_cluster_with_capacity("cluster-a", 10),
            fixtures::ready_cluster_with_capacity("cluster-b", 20),
            failed,
        ],
    )?;
    let expected = fixtures::setup_kafkas(&db, "cluster-a")?;
    fixtures::setup_kafkas_in_status(&db, "cluster-a", KafkaStatus::Deleting, 2)?;

    let counts = db.find_streaming_unit_count_by_cluster_and_instance_type()?;

    assert_eq!(counts.len(), 4, "expected 2 instance types for each of 2 live clusters, got {:?}", counts);
    let standard_a = counts.get("cluster-a", INSTANCE_TYPE_STANDARD).map(|val| (val.count, val.max_units));
    assert_eq!(standard_a, Some((expected, 10)), "unexpected standard count of cluster-a");
    let standard_b = counts.get("cluster-b", INSTANCE_TYPE_STANDARD).map(|val| (val.count, val.max_units));
    assert_eq!(standard_b, Some((0, 20)), "expected cluster-b to be zero filled");
    let developer_a = counts.get("cluster-a", INSTANCE_TYPE_DEVELOPER).map(|val| (val.count, val.max_units));
    assert_eq!(developer_a, Some((0, 0)), "expected undeclared developer capacity of 0");
    assert!(counts.get("cluster-failed", INSTANCE_TYPE_STANDARD).is_none(), "expected failed clusters to be excluded");
    Ok(())
}

#[tokio::test]
async fn update_cluster_status_persists() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;
    let db = Database::new(config).await?;
    fixtures::setup_clusters(&db, &[fixtures::ready_cluster("cluster-a")])?;

    db.update_cluster_status("cluster-a", ClusterStatus::Full)?;
    let err = db
        .update_cluster_status("missing", ClusterStatus::Full)
        .expect_err("expected update of missing cluster to fail");

    let status = db.find_cluster_by_cluster_id("cluster-a")?.map(|val| val.status);
    assert_eq!(status, Some(ClusterStatus::Full), "expected status full");
    assert!(matches!(AppError::from_anyhow(err), AppError::ResourceNotFound(_)), "expected not found error");
    let full = db.find_clusters_by_status(ClusterStatus::Full)?;
    assert_eq!(full.len(), 1, "expected one full cluster got {}", full.len());
    Ok(())
}
