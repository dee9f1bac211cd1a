//! Health endpoints.
//!
//! `/health/ready` evaluates checks tagged `ready`; `/health/live` evaluates
//! every registered check. Both render the same JSON report:
//!
//! ```json
//! {
//!   "status": "Healthy",
//!   "results": {
//!     "bus": {
//!       "status": "Healthy",
//!       "description": "In-process mediator running",
//!       "data": { "transport": "mediator" }
//!     }
//!   }
//! }
//! ```

use crate::error::AppError;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use transit_platform_runtime::health::{
    HealthCheckService, HealthReport, HealthStatus, READY_TAG,
};

/// Readiness path.
pub const READY_PATH: &str = "/health/ready";

/// Liveness path.
pub const LIVE_PATH: &str = "/health/live";

/// Router serving [`READY_PATH`] and [`LIVE_PATH`].
pub fn health_router(service: Arc<HealthCheckService>) -> Router {
    Router::new()
        .route(READY_PATH, get(ready))
        .route(LIVE_PATH, get(live))
        .with_state(service)
}

/// `GET /health/ready`
pub async fn ready(State(service): State<Arc<HealthCheckService>>) -> Response {
    let report = service
        .check_health(|registration| registration.has_tag(READY_TAG))
        .await;
    write_health_response(&report)
}

/// `GET /health/live`
pub async fn live(State(service): State<Arc<HealthCheckService>>) -> Response {
    let report = service.check_health(|_| true).await;
    write_health_response(&report)
}

/// HTTP status for an overall health status. Degraded still serves traffic.
#[must_use]
pub const fn status_code(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Serialize)]
struct HealthBody<'a> {
    status: HealthStatus,
    results: BTreeMap<&'a str, HealthEntryBody<'a>>,
}

#[derive(Serialize)]
struct HealthEntryBody<'a> {
    status: HealthStatus,
    description: Option<&'a str>,
    data: &'a BTreeMap<String, Value>,
}

/// Render a report as pretty-printed JSON.
#[must_use]
pub fn write_health_response(report: &HealthReport) -> Response {
    let body = HealthBody {
        status: report.status,
        results: report
            .entries
            .iter()
            .map(|(name, entry)| {
                (
                    name.as_str(),
                    HealthEntryBody {
                        status: entry.status,
                        description: entry.description.as_deref(),
                        data: &entry.data,
                    },
                )
            })
            .collect(),
    };

    match serde_json::to_string_pretty(&body) {
        Ok(json) => (
            status_code(report.status),
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            json,
        )
            .into_response(),
        Err(error) => report_unavailable(error),
    }
}

fn report_unavailable(error: serde_json::Error) -> Response {
    AppError::internal("Health report could not be rendered")
        .with_source(error.into())
        .into_response()
}
