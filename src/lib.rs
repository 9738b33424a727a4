//! A fleet manager control plane for managed kafka instances.
//!
//! Kafka requests are admitted against fleet capacity & quota, placed onto data plane
//! clusters by a placement strategy, and advanced through their lifecycle from the status
//! reports pushed by each cluster's agent.

pub mod admission;
mod app;
pub mod clusters;
pub mod config;
pub mod database;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod models;
pub mod placement;
pub mod quota;
pub mod reconcile;
mod server;
pub mod store;
pub mod telemetry;
mod utils;
pub mod workers;

// Public exports for binaries.
pub use crate::{
    app::{App, Services},
    config::Config,
    telemetry::{get_metrics_recorder, PrometheusMetrics},
};
