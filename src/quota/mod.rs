//! Quota enforcement at admission time.


use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{KafkaRequest, KafkaStatus, INSTANCE_TYPE_STANDARD};
use crate::store::KafkaStore;

/// The quota type backed by the statically configured quota management list.
pub const QUOTA_TYPE_MANAGEMENT_LIST: &str = "quota-management-list";

/// A quota scheme deciding which owners may create which kafka instances.
pub trait QuotaService: Send + Sync {
    /// Check if the owner of the given request is entitled to its instance type at all.
    fn check_quota(&self, kafka: &KafkaRequest) -> Result<bool>;

    /// Reserve the quota consumed by the given request, returning its subscription ID.
    fn reserve_quota(&self, kafka: &KafkaRequest) -> Result<String>;

    /// Release the quota reserved under the given subscription ID.
    fn delete_quota(&self, subscription_id: &str) -> Result<()>;
}

/// Resolves the quota service of a quota type.
#[derive(Clone)]
pub struct QuotaServiceFactory {
    management_list: Arc<QuotaManagementListService>,
}

impl QuotaServiceFactory {
    /// Create a new instance.
    pub fn new(config: Arc<Config>, kafkas: Arc<dyn KafkaStore>) -> Self {
        Self {
            management_list: Arc::new(QuotaManagementListService::new(config, kafkas)),
        }
    }

    /// Get the quota service of the given quota type.
    pub fn get_quota_service(&self, quota_type: &str) -> Result<Arc<dyn QuotaService>> {
        match quota_type {
            QUOTA_TYPE_MANAGEMENT_LIST => Ok(self.management_list.clone()),
            _ => bail!(AppError::InvalidInput(format!("unsupported quota type {:?}", quota_type))),
        }
    }
}

/// A quota service backed by the quota management list.
///
/// Registered users may create standard instances, charged against the streaming units of
/// their organisation or service account. Unlisted users may only create developer instances.
pub struct QuotaManagementListService {
    config: Arc<Config>,
    kafkas: Arc<dyn KafkaStore>,
}

/// The allowance a request is charged against.
enum Allowance<'a> {
    Organisation { id: &'a str, max: i64 },
    ServiceAccount { username: &'a str, max: i64 },
}

impl QuotaManagementListService {
    /// Create a new instance.
    pub fn new(config: Arc<Config>, kafkas: Arc<dyn KafkaStore>) -> Self {
        Self { config, kafkas }
    }

    fn allowance<'a>(&'a self, kafka: &'a KafkaRequest) -> Option<Allowance<'a>> {
        let list = &self.config.quota_list;
        if let Some(org) = list.organisation(&kafka.organisation_id) {
            if org.is_user_registered(&kafka.owner) {
                return Some(Allowance::Organisation {
                    id: &org.id,
                    max: org.max_allowed_instances,
                });
            }
        }
        list.service_account(&kafka.owner).map(|acct| Allowance::ServiceAccount {
            username: &acct.username,
            max: acct.max_allowed_instances,
        })
    }
}

impl QuotaService for QuotaManagementListService {
    fn check_quota(&self, kafka: &KafkaRequest) -> Result<bool> {
        let registered = self.allowance(kafka).is_some();
        Ok(if kafka.is_developer() { !registered } else { registered && kafka.instance_type == INSTANCE_TYPE_STANDARD })
    }

    fn reserve_quota(&self, kafka: &KafkaRequest) -> Result<String> {
        if kafka.is_developer() {
            return Ok(String::new());
        }
        let allowance = match self.allowance(kafka) {
            Some(allowance) => allowance,
            None => bail!(AppError::QuotaExceeded("Insufficient quota".into())),
        };

        let consumers = self
            .kafkas
            .find_kafkas(&|other| {
                other.instance_type == kafka.instance_type
                    && other.status != KafkaStatus::Deleting
                    && match &allowance {
                        Allowance::Organisation { id, .. } => other.organisation_id == *id,
                        Allowance::ServiceAccount { username, .. } => other.owner == *username,
                    }
            })
            .context("failed to count the streaming units consumed by quota holder")?;
        let instance_types = &self.config.instance_types;
        let mut consumed = instance_types.instance_size(&kafka.instance_type, &kafka.size_id)?.quota_consumed;
        for other in consumers.iter() {
            consumed += instance_types.instance_size(&other.instance_type, &other.size_id)?.quota_consumed;
        }

        match allowance {
            Allowance::Organisation { id, max } if consumed > max => bail!(AppError::QuotaExceeded(format!(
                "Organization '{}' has reached a maximum number of {} allowed streaming units.",
                id, max
            ))),
            Allowance::ServiceAccount { username, max } if consumed > max => bail!(AppError::QuotaExceeded(format!(
                "User '{}' has reached a maximum number of {} allowed streaming units.",
                username, max
            ))),
            _ => Ok(String::new()),
        }
    }

    fn delete_quota(&self, _subscription_id: &str) -> Result<()> {
        Ok(())
    }
}
