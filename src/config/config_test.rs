use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{Config, ScalingType};
use crate::error::AppError;
use crate::models::{ClusterStatus, ProviderType};

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::write(&path, contents).context("error writing test config file")?;
    Ok(path.to_string_lossy().to_string())
}

#[test]
fn config_defaults() -> Result<()> {
    let (config, _tmpdir) = Config::new_test()?;

    assert_eq!(config.dataplane.scaling_type, ScalingType::Manual, "expected manual scaling by default");
    assert_eq!(config.max_capacity, 1000, "expected default max capacity of 1000 got {}", config.max_capacity);
    assert_eq!(config.num_of_brokers, 3, "expected 3 brokers by default got {}", config.num_of_brokers);
    assert!(!config.manage_route_dns, "expected route DNS management to be disabled by default");
    let weight = config.instance_types.capacity_consumed("standard", "x1")?;
    assert_eq!(weight, 1, "expected default standard weight of 1 got {}", weight);
    assert!(config.dataplane.cluster_config.clusters().is_empty(), "expected no configured clusters");
    Ok(())
}

#[test]
fn config_from_env() -> Result<()> {
    let config: Config = envy::from_iter(vec![
        ("RUST_LOG".to_string(), "info".to_string()),
        ("DATAPLANE_CLUSTER_SCALING_TYPE".to_string(), "auto".to_string()),
        ("MAX_CAPACITY".to_string(), "5".to_string()),
        ("MANAGE_ROUTE_DNS".to_string(), "true".to_string()),
        ("KAFKA_DOMAIN_NAME".to_string(), "kafka.example.com".to_string()),
    ])?;
    let config = config.load_files()?;

    assert!(config.dataplane.is_auto_scaling_enabled(), "expected auto scaling to be enabled");
    assert_eq!(config.max_capacity, 5, "expected max capacity of 5 got {}", config.max_capacity);
    assert!(config.manage_route_dns, "expected route DNS management to be enabled");
    assert_eq!(config.kafka_domain_name.as_deref(), Some("kafka.example.com"), "unexpected kafka domain name");
    Ok(())
}

#[test]
fn dataplane_cluster_config_preserves_declared_order() -> Result<()> {
    let (mut config, tmpdir) = Config::new_test_unshared()?;
    let path = write_file(
        tmpdir.path(),
        "clusters.yaml",
        r#"
clusters:
  - cluster_id: cluster-b
    cloud_provider: aws
    region: us-east-1
    multi_az: true
    schedulable: true
    kafka_instance_limit: 5
  - cluster_id: cluster-a
    cloud_provider: aws
    region: us-east-1
    multi_az: true
    schedulable: false
    kafka_instance_limit: -1
    status: ready
  - name: standalone
    cluster_id: cluster-c
    provider_type: standalone
    cluster_dns: apps.cluster-c.example.com
    supported_instance_type: developer
"#,
    )?;
    config.dataplane_cluster_config_file = Some(path);
    let config = config.load_files()?;
    let cluster_config = &config.dataplane.cluster_config;

    let ids: Vec<&str> = cluster_config.clusters().iter().map(|val| val.cluster_id.as_str()).collect();
    assert_eq!(ids, vec!["cluster-b", "cluster-a", "cluster-c"], "expected declared order to be preserved");
    assert_eq!(cluster_config.position("cluster-a"), Some(1), "expected cluster-a at position 1");
    assert!(cluster_config.is_cluster_schedulable("cluster-b"), "expected cluster-b to be schedulable");
    assert!(!cluster_config.is_cluster_schedulable("cluster-a"), "expected cluster-a to be unschedulable");
    assert!(cluster_config.is_cluster_schedulable("unknown"), "expected unconfigured clusters to be schedulable");
    assert!(cluster_config.is_number_of_kafka_within_cluster_limit("cluster-b", 5), "expected 5 units to fit a limit of 5");
    assert!(!cluster_config.is_number_of_kafka_within_cluster_limit("cluster-b", 6), "expected 6 units to exceed a limit of 5");
    assert!(cluster_config.is_number_of_kafka_within_cluster_limit("cluster-a", 10_000), "expected -1 to be unlimited");

    let cluster_b = cluster_config.get("cluster-b").context("cluster-b missing")?;
    assert_eq!(cluster_b.status, ClusterStatus::Provisioning, "expected default status of provisioning");
    assert_eq!(cluster_b.supported_instance_type, "standard,developer", "expected default supported instance types");
    let cluster_c = cluster_config.get("cluster-c").context("cluster-c missing")?;
    assert_eq!(cluster_c.provider_type, ProviderType::Standalone, "expected standalone provider");
    Ok(())
}

#[test]
fn dataplane_cluster_config_rejects_invalid_clusters() -> Result<()> {
    let cases = [
        (
            "duplicate",
            "clusters:\n  - cluster_id: cluster-a\n  - cluster_id: cluster-a\n",
        ),
        ("missing id", "clusters:\n  - cluster_id: \"\"\n"),
        (
            "standalone without dns",
            "clusters:\n  - name: standalone\n    cluster_id: cluster-a\n    provider_type: standalone\n",
        ),
        (
            "standalone without name",
            "clusters:\n  - cluster_id: cluster-a\n    provider_type: standalone\n    cluster_dns: apps.example.com\n",
        ),
    ];
    for (name, contents) in cases {
        let (mut config, tmpdir) = Config::new_test_unshared()?;
        config.dataplane_cluster_config_file = Some(write_file(tmpdir.path(), "clusters.yaml", contents)?);
        assert!(config.load_files().is_err(), "expected {} config to be rejected", name);
    }
    Ok(())
}

#[test]
fn supported_instance_types_are_validated() -> Result<()> {
    let (mut config, tmpdir) = Config::new_test_unshared()?;
    let path = write_file(
        tmpdir.path(),
        "instance-types.yaml",
        r#"
supported_instance_types:
  - id: standard
    sizes:
      - id: x1
        capacity_consumed: 1
        quota_consumed: 1
      - id: x2
        capacity_consumed: 2
        quota_consumed: 2
  - id: developer
    sizes:
      - id: x1
        capacity_consumed: 1
        quota_consumed: 1
        lifespan_seconds: 3600
"#,
    )?;
    config.supported_instance_types_config_file = Some(path);
    let config = config.load_files()?;

    let weight = config.instance_types.capacity_consumed("standard", "x2")?;
    assert_eq!(weight, 2, "expected weight 2 for standard x2 got {}", weight);
    let err = config.instance_types.capacity_consumed("enterprise", "x1").expect_err("expected unknown type to fail");
    assert!(matches!(AppError::from_anyhow(err), AppError::InstanceTypeNotSupported(_)), "expected instance type not supported");
    let err = config.instance_types.capacity_consumed("standard", "x9").expect_err("expected unknown size to fail");
    assert!(matches!(AppError::from_anyhow(err), AppError::InstancePlanNotSupported(_)), "expected instance plan not supported");

    let (mut config, tmpdir) = Config::new_test_unshared()?;
    let path = write_file(
        tmpdir.path(),
        "instance-types.yaml",
        "supported_instance_types:\n  - id: standard\n    sizes:\n      - id: x1\n        capacity_consumed: 0\n        quota_consumed: 1\n",
    )?;
    config.supported_instance_types_config_file = Some(path);
    assert!(config.load_files().is_err(), "expected zero weight sizes to be rejected");
    Ok(())
}

#[test]
fn provider_instance_limits() -> Result<()> {
    let (mut config, tmpdir) = Config::new_test_unshared()?;
    assert_eq!(config.providers.instance_limit("us-east-1", "aws", "standard")?, None, "expected empty provider config to be unlimited");

    let path = write_file(
        tmpdir.path(),
        "providers.yaml",
        r#"
supported_providers:
  - name: aws
    default: true
    regions:
      - name: us-east-1
        default: true
        supported_instance_type:
          standard:
            limit: 5
          developer: {}
"#,
    )?;
    config.providers_config_file = Some(path);
    let config = config.load_files()?;
    let providers = &config.providers;

    assert_eq!(providers.instance_limit("us-east-1", "aws", "standard")?, Some(5), "expected standard limit of 5");
    assert_eq!(providers.instance_limit("us-east-1", "aws", "developer")?, None, "expected developer to be unlimited");
    let err = providers.instance_limit("eu-west-1", "aws", "standard").expect_err("expected unknown region to fail");
    assert!(matches!(AppError::from_anyhow(err), AppError::InvalidInput(_)), "expected invalid input for unknown region");
    let err = providers.instance_limit("us-east-1", "gcp", "standard").expect_err("expected unknown provider to fail");
    assert!(matches!(AppError::from_anyhow(err), AppError::InvalidInput(_)), "expected invalid input for unknown provider");
    let err = providers.instance_limit("us-east-1", "aws", "enterprise").expect_err("expected unknown type to fail");
    assert!(matches!(AppError::from_anyhow(err), AppError::InstanceTypeNotSupported(_)), "expected instance type not supported");
    Ok(())
}

#[test]
fn quota_management_list_is_loaded() -> Result<()> {
    let (mut config, tmpdir) = Config::new_test_unshared()?;
    let path = write_file(
        tmpdir.path(),
        "quota-management-list.yaml",
        r#"
registered_organisations:
  - id: org-1
    max_allowed_instances: 4
    registered_users:
      - alice
  - id: org-2
    max_allowed_instances: 1
    any_user: true
registered_service_accounts:
  - username: robot
    max_allowed_instances: 2
"#,
    )?;
    config.quota_management_list_config_file = Some(path);
    let config = config.load_files()?;
    let list = &config.quota_list;

    let org = list.organisation("org-1").context("org-1 missing")?;
    assert!(org.is_user_registered("alice"), "expected alice to be registered");
    assert!(!org.is_user_registered("bob"), "expected bob not to be registered");
    let org = list.organisation("org-2").context("org-2 missing")?;
    assert!(org.is_user_registered("anyone"), "expected any user of org-2 to be registered");
    let robot = list.service_account("robot").context("robot missing")?;
    assert_eq!(robot.max_allowed_instances, 2, "expected robot limit of 2");
    Ok(())
}
