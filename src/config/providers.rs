use std::collections::HashMap;

use anyhow::Result;
use serde::Deserialize;

use crate::error::AppError;

/// The cloud providers & regions in which kafka instances may be created.
///
/// An empty configuration places no restriction on providers or regions.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub supported_providers: Vec<SupportedProvider>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SupportedProvider {
    pub name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub regions: Vec<ProviderRegion>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ProviderRegion {
    pub name: String,
    #[serde(default)]
    pub default: bool,
    /// The instance types accepted by this region, mapped to their limits.
    #[serde(default)]
    pub supported_instance_type: HashMap<String, RegionInstanceTypeLimit>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RegionInstanceTypeLimit {
    /// The maximum number of streaming units of this instance type in the region.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl ProviderConfig {
    /// Get the streaming unit limit of the given instance type in the given region.
    ///
    /// `None` means the region places no limit on the instance type.
    pub fn instance_limit(&self, region: &str, provider: &str, instance_type: &str) -> Result<Option<i64>> {
        if self.supported_providers.is_empty() {
            return Ok(None);
        }
        let provider_cfg = self
            .supported_providers
            .iter()
            .find(|val| val.name == provider)
            .ok_or_else(|| AppError::InvalidInput(format!("provider {:?} is not supported", provider)))?;
        let region_cfg = provider_cfg
            .regions
            .iter()
            .find(|val| val.name == region)
            .ok_or_else(|| AppError::InvalidInput(format!("region {:?} is not supported for provider {:?}", region, provider)))?;
        let limit = region_cfg.supported_instance_type.get(instance_type).ok_or_else(|| {
            AppError::InstanceTypeNotSupported(format!("instance type {:?} is not supported in region {:?}", instance_type, region))
        })?;
        Ok(limit.limit)
    }
}
