//! The metrics & health check server.

use std::net::SocketAddr;

use anyhow::Result;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::{extract::Extension, routing::get, AddExtensionLayer, Router};
use futures::prelude::*;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::telemetry::get_metrics_recorder;

/// The content type of the prometheus text exposition format.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Spawn the server exposing `/metrics` & `/healthcheck` until shutdown is signalled.
pub fn spawn_metrics_server(config: &Config, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<Result<()>> {
    let handle = get_metrics_recorder(config).handle();
    let app = Router::new()
        .route("/metrics", get(prometheus_scrape))
        .route("/healthcheck", get(healthcheck))
        .layer(AddExtensionLayer::new(handle));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async move {
            let _res = shutdown.recv().await;
        });
    tracing::info!(%addr, "metrics server is listening");
    tokio::spawn(server.map_err(anyhow::Error::from))
}

async fn prometheus_scrape(Extension(handle): Extension<PrometheusHandle>) -> (StatusCode, HeaderMap, String) {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE));
    (StatusCode::OK, headers, handle.render())
}

async fn healthcheck() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
