use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The instance type ID of standard kafka instances.
pub const INSTANCE_TYPE_STANDARD: &str = "standard";
/// The instance type ID of developer kafka instances.
pub const INSTANCE_TYPE_DEVELOPER: &str = "developer";
/// The billing model of kafka instances placed onto a tenant's own enterprise cluster.
pub const BILLING_MODEL_ENTERPRISE: &str = "enterprise";

/// A tenant request for a managed kafka instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KafkaRequest {
    pub id: String,
    pub name: String,
    /// The ID of the cluster hosting this instance, empty until placed.
    #[serde(default)]
    pub cluster_id: String,
    pub status: KafkaStatus,
    /// An opaque token re-minted whenever this instance is reassigned.
    #[serde(default)]
    pub placement_id: String,
    pub instance_type: String,
    pub size_id: String,
    pub cloud_provider: String,
    pub region: String,
    pub multi_az: bool,
    pub owner: String,
    #[serde(default)]
    pub organisation_id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub bootstrap_server_host: String,

    #[serde(default)]
    pub desired_kafka_version: String,
    #[serde(default)]
    pub actual_kafka_version: String,
    #[serde(default)]
    pub desired_strimzi_version: String,
    #[serde(default)]
    pub actual_strimzi_version: String,
    #[serde(default)]
    pub kafka_upgrading: bool,
    #[serde(default)]
    pub strimzi_upgrading: bool,

    #[serde(default)]
    pub routes: Vec<KafkaRoute>,
    #[serde(default)]
    pub routes_created: bool,
    #[serde(default)]
    pub failed_reason: String,
    /// The quota scheme which admitted this request.
    #[serde(default)]
    pub quota_type: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub desired_billing_model: String,

    #[serde(with = "crate::utils::timestamp_nanos")]
    pub created_at: OffsetDateTime,
    #[serde(with = "crate::utils::timestamp_nanos")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "crate::utils::timestamp_nanos_opt")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default, with = "crate::utils::timestamp_nanos_opt")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl KafkaRequest {
    /// Create a new unadmitted request.
    ///
    /// The ID, status and timestamps are assigned again at admission time.
    pub fn new(
        name: impl Into<String>, instance_type: impl Into<String>, size_id: impl Into<String>, cloud_provider: impl Into<String>, region: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: String::new(),
            name: name.into(),
            cluster_id: String::new(),
            status: KafkaStatus::Accepted,
            placement_id: String::new(),
            instance_type: instance_type.into(),
            size_id: size_id.into(),
            cloud_provider: cloud_provider.into(),
            region: region.into(),
            multi_az: false,
            owner: owner.into(),
            organisation_id: String::new(),
            namespace: String::new(),
            bootstrap_server_host: String::new(),
            desired_kafka_version: String::new(),
            actual_kafka_version: String::new(),
            desired_strimzi_version: String::new(),
            actual_strimzi_version: String::new(),
            kafka_upgrading: false,
            strimzi_upgrading: false,
            routes: Vec::new(),
            routes_created: false,
            failed_reason: String::new(),
            quota_type: String::new(),
            subscription_id: String::new(),
            desired_billing_model: String::new(),
            created_at: now,
            updated_at: now,
            expires_at: None,
            deleted_at: None,
        }
    }

    pub fn is_developer(&self) -> bool {
        self.instance_type == INSTANCE_TYPE_DEVELOPER
    }

    /// Check if this request must be placed onto the enterprise cluster it names.
    pub fn is_enterprise(&self) -> bool {
        self.desired_billing_model.eq_ignore_ascii_case(BILLING_MODEL_ENTERPRISE)
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// The time elapsed since this request was created.
    pub fn age(&self) -> std::time::Duration {
        let elapsed = OffsetDateTime::now_utc() - self.created_at;
        std::time::Duration::try_from(elapsed).unwrap_or_default()
    }
}

/// A route exposing a kafka instance through a cluster router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaRoute {
    pub domain: String,
    pub router: String,
}

/// The lifecycle status of a kafka request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KafkaStatus {
    Accepted,
    Preparing,
    Provisioning,
    Ready,
    Failed,
    Deprovision,
    Deleting,
}

impl KafkaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Preparing => "preparing",
            Self::Provisioning => "provisioning",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Deprovision => "deprovision",
            Self::Deleting => "deleting",
        }
    }
}

impl fmt::Display for KafkaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KafkaStatus {
    type Err = anyhow::Error;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        Ok(match val {
            "accepted" => Self::Accepted,
            "preparing" => Self::Preparing,
            "provisioning" => Self::Provisioning,
            "ready" => Self::Ready,
            "failed" => Self::Failed,
            "deprovision" => Self::Deprovision,
            "deleting" => Self::Deleting,
            _ => bail!("unknown kafka status {:?}", val),
        })
    }
}
