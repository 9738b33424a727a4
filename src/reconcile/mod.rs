//! Reconciliation of the status reports pushed by data plane agents.

mod cluster;
mod kafka;

use anyhow::{bail, Result};

use crate::error::AppError;
use crate::models::status::find_ready_condition;
use crate::models::Condition;

pub use cluster::ClusterStatusReconciler;
pub use kafka::{build_routes, default_routes, KafkaStatusReconciler, DEFAULT_INGRESS_DNS_NAME_PREFIX};

/// The class of a kafka status report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KafkaStatusClass {
    Ready,
    Error,
    Deleted,
    Rejected,
    Unknown,
    Installing,
}

/// Classify the conditions of a kafka status report.
///
/// Only the first `Ready` condition is considered. Its status decides `Ready` & `Unknown`,
/// after which its reason decides the remaining classes, defaulting to `Installing`.
pub fn classify(conditions: &[Condition]) -> KafkaStatusClass {
    let cond = match find_ready_condition(conditions) {
        Some(cond) => cond,
        None => return KafkaStatusClass::Installing,
    };
    if cond.status.eq_ignore_ascii_case("true") {
        return KafkaStatusClass::Ready;
    }
    if cond.status.eq_ignore_ascii_case("unknown") {
        return KafkaStatusClass::Unknown;
    }
    match cond.reason.to_ascii_lowercase().as_str() {
        "installing" => KafkaStatusClass::Installing,
        "deleted" => KafkaStatusClass::Deleted,
        "error" => KafkaStatusClass::Error,
        "rejected" => KafkaStatusClass::Rejected,
        _ => KafkaStatusClass::Installing,
    }
}

/// Parse a condition status as a boolean.
pub fn parse_condition_bool(val: &str) -> Result<bool> {
    match val {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => bail!(AppError::InvalidInput(format!("invalid boolean condition status {:?}", val))),
    }
}
