//! Runtime configuration.

mod dataplane;
mod instance_types;
mod providers;
mod quota_list;
#[cfg(test)]
mod config_test;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub use dataplane::{ClusterConfig, DataplaneClusterConfig, ManualCluster, ScalingType};
pub use instance_types::{InstanceSize, InstanceType, SupportedInstanceTypes};
pub use providers::{ProviderConfig, ProviderRegion, RegionInstanceTypeLimit, SupportedProvider};
pub use quota_list::{QuotaManagementList, RegisteredOrganisation, RegisteredServiceAccount};

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The server's logging config, which uses Rust's `env_logger` directives.
    pub rust_log: String,
    /// The port used to serve prometheus metrics.
    #[serde(default = "Config::default_metrics_port")]
    pub metrics_port: u16,

    /// The path to the database on disk.
    #[serde(default = "crate::database::default_data_path")]
    pub storage_data_path: String,

    /// The scaling mode of the data plane fleet, which determines the placement strategy.
    #[serde(default)]
    pub dataplane_cluster_scaling_type: ScalingType,
    /// The path to the YAML list of statically configured data plane clusters.
    #[serde(default)]
    pub dataplane_cluster_config_file: Option<String>,
    /// The path to the YAML definition of the supported kafka instance types.
    #[serde(default)]
    pub supported_instance_types_config_file: Option<String>,
    /// The path to the YAML definition of cloud providers, regions and region limits.
    #[serde(default)]
    pub providers_config_file: Option<String>,
    /// The path to the YAML quota management list.
    #[serde(default)]
    pub quota_management_list_config_file: Option<String>,

    /// The maximum number of live kafka instances across the fleet.
    #[serde(default = "Config::default_max_capacity")]
    pub max_capacity: i64,
    /// The quota scheme used to admit new kafka requests.
    #[serde(default = "Config::default_quota_type")]
    pub quota_type: String,
    /// Whether developer instances may be created at all.
    #[serde(default = "Config::default_allow_developer_instance")]
    pub allow_developer_instance: bool,
    /// The number of developer instances a single owner may hold.
    #[serde(default = "Config::default_max_allowed_developer_instances")]
    pub max_allowed_developer_instances: i64,

    /// The number of brokers of a kafka instance, used to build default routes.
    #[serde(default = "Config::default_num_of_brokers")]
    pub num_of_brokers: u32,
    /// The interval between background reconciliation passes.
    #[serde(default = "Config::default_reconcile_interval_seconds")]
    pub reconcile_interval_seconds: u64,
    /// When enabled, route DNS records are created by an external worker which marks
    /// `routes_created`, otherwise routes count as created once persisted.
    #[serde(default)]
    pub manage_route_dns: bool,
    /// The external domain of kafka bootstrap hosts, else the cluster's ingress DNS is used.
    #[serde(default)]
    pub kafka_domain_name: Option<String>,

    /// The statically configured data plane clusters.
    ///
    /// This value is derived from `dataplane_cluster_config_file`.
    #[serde(skip, default)]
    pub dataplane: DataplaneClusterConfig,
    /// The supported instance types.
    ///
    /// This value is derived from `supported_instance_types_config_file`.
    #[serde(skip, default)]
    pub instance_types: SupportedInstanceTypes,
    /// The provider & region configuration.
    ///
    /// This value is derived from `providers_config_file`.
    #[serde(skip, default)]
    pub providers: ProviderConfig,
    /// The quota management list.
    ///
    /// This value is derived from `quota_management_list_config_file`.
    #[serde(skip, default)]
    pub quota_list: QuotaManagementList,
}

impl Config {
    /// Create a new config instance.
    ///
    /// The runtime environment is parsed first, after which each of the referenced YAML files
    /// is loaded and validated.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        let config: Config = envy::from_env().context("error building config from env")?;
        config.load_files()
    }

    /// Load and validate all YAML files referenced by this config.
    pub fn load_files(mut self) -> Result<Self> {
        if let Some(path) = self.dataplane_cluster_config_file.as_deref() {
            self.dataplane.cluster_config = ClusterConfig::new(read_yaml::<dataplane::ClusterList>(path)?.clusters)
                .with_context(|| format!("invalid dataplane cluster config in {}", path))?;
        }
        self.dataplane.scaling_type = self.dataplane_cluster_scaling_type;
        if let Some(path) = self.supported_instance_types_config_file.as_deref() {
            self.instance_types = read_yaml(path)?;
        }
        self.instance_types
            .validate()
            .context("invalid supported instance types config")?;
        if let Some(path) = self.providers_config_file.as_deref() {
            self.providers = read_yaml(path)?;
        }
        if let Some(path) = self.quota_management_list_config_file.as_deref() {
            self.quota_list = read_yaml(path)?;
        }
        Ok(self)
    }

    fn default_metrics_port() -> u16 {
        9090
    }

    fn default_max_capacity() -> i64 {
        1000
    }

    fn default_quota_type() -> String {
        crate::quota::QUOTA_TYPE_MANAGEMENT_LIST.into()
    }

    fn default_allow_developer_instance() -> bool {
        true
    }

    fn default_max_allowed_developer_instances() -> i64 {
        1
    }

    fn default_num_of_brokers() -> u32 {
        3
    }

    fn default_reconcile_interval_seconds() -> u64 {
        30
    }
}

/// Read and deserialize the YAML file at the given path.
fn read_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("error opening config file {}", path.display()))?;
    serde_yaml::from_reader(file).with_context(|| format!("error parsing config file {}", path.display()))
}

#[cfg(test)]
impl Config {
    /// Build a config suitable for tests, storing data in a new temporary directory.
    pub fn new_test() -> Result<(std::sync::Arc<Self>, tempfile::TempDir)> {
        let (config, tmpdir) = Self::new_test_unshared()?;
        Ok((std::sync::Arc::new(config), tmpdir))
    }

    /// Build a test config which callers may still customize before sharing it.
    pub fn new_test_unshared() -> Result<(Self, tempfile::TempDir)> {
        let tmpdir = tempfile::tempdir().context("error creating tmp dir")?;
        let config: Config = envy::from_iter(vec![
            ("RUST_LOG".into(), "error".into()),
            ("STORAGE_DATA_PATH".into(), tmpdir.path().to_string_lossy().to_string()),
        ])
        .context("error building test config")?;
        Ok((config.load_files()?, tmpdir))
    }
}
