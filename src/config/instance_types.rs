use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::kafka::{INSTANCE_TYPE_DEVELOPER, INSTANCE_TYPE_STANDARD};

/// The kafka instance types supported by the fleet.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SupportedInstanceTypes {
    pub supported_instance_types: Vec<InstanceType>,
}

/// A kafka instance type along with its sizes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InstanceType {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub sizes: Vec<InstanceSize>,
}

/// A size of a kafka instance type.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InstanceSize {
    pub id: String,
    /// The number of streaming units charged against a cluster.
    pub capacity_consumed: i64,
    /// The number of streaming units charged against a quota.
    pub quota_consumed: i64,
    #[serde(default)]
    pub max_data_retention_size: String,
    #[serde(default)]
    pub lifespan_seconds: Option<i64>,
}

impl Default for SupportedInstanceTypes {
    fn default() -> Self {
        let size = |lifespan_seconds| InstanceSize {
            id: "x1".into(),
            capacity_consumed: 1,
            quota_consumed: 1,
            max_data_retention_size: "1000Gi".into(),
            lifespan_seconds,
        };
        Self {
            supported_instance_types: vec![
                InstanceType {
                    id: INSTANCE_TYPE_STANDARD.into(),
                    display_name: "Standard".into(),
                    sizes: vec![size(None)],
                },
                InstanceType {
                    id: INSTANCE_TYPE_DEVELOPER.into(),
                    display_name: "Trial".into(),
                    sizes: vec![size(Some(172800))],
                },
            ],
        }
    }
}

impl SupportedInstanceTypes {
    /// Get the instance type with the given ID.
    pub fn instance_type(&self, id: &str) -> Result<&InstanceType> {
        self.supported_instance_types
            .iter()
            .find(|typ| typ.id == id)
            .ok_or_else(|| AppError::InstanceTypeNotSupported(format!("instance type {:?} is not supported", id)).into())
    }

    /// Get the size of the given instance type.
    pub fn instance_size(&self, instance_type: &str, size_id: &str) -> Result<&InstanceSize> {
        self.instance_type(instance_type)?.size(size_id)
    }

    /// The number of streaming units an instance of the given type & size consumes on a cluster.
    pub fn capacity_consumed(&self, instance_type: &str, size_id: &str) -> Result<i64> {
        Ok(self.instance_size(instance_type, size_id)?.capacity_consumed)
    }

    /// Validate this configuration.
    pub fn validate(&self) -> Result<()> {
        let mut type_ids = HashSet::new();
        for typ in self.supported_instance_types.iter() {
            if !type_ids.insert(typ.id.as_str()) {
                bail!("instance type {} is defined more than once", typ.id);
            }
            if typ.sizes.is_empty() {
                bail!("instance type {} defines no sizes", typ.id);
            }
            let mut size_ids = HashSet::new();
            for size in typ.sizes.iter() {
                if !size_ids.insert(size.id.as_str()) {
                    bail!("size {} of instance type {} is defined more than once", size.id, typ.id);
                }
                if size.capacity_consumed < 1 || size.quota_consumed < 1 {
                    bail!("size {} of instance type {} must consume at least 1 streaming unit", size.id, typ.id);
                }
                if matches!(size.lifespan_seconds, Some(val) if val < 1) {
                    bail!("size {} of instance type {} has an invalid lifespan", size.id, typ.id);
                }
            }
        }
        Ok(())
    }
}

impl InstanceType {
    /// Get the size with the given ID.
    pub fn size(&self, size_id: &str) -> Result<&InstanceSize> {
        self.sizes
            .iter()
            .find(|size| size.id == size_id)
            .ok_or_else(|| AppError::InstancePlanNotSupported(format!("size {:?} is not supported for instance type {:?}", size_id, self.id)).into())
    }
}
