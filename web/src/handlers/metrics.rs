//! Prometheus scrape endpoint.

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, header},
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;

/// Scrape path.
pub const METRICS_PATH: &str = "/metrics";

/// Router serving [`METRICS_PATH`] from `handle`.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route(METRICS_PATH, get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        handle.render(),
    )
}
