//! Health router behavior against real check evaluation.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use transit_platform_runtime::health::{
    HealthCheckRegistration, HealthCheckRegistry, HealthCheckService, READY_TAG,
};
use transit_platform_testing::{StaticHealthCheck, get};
use transit_platform_web::{HttpPipeline, LIVE_PATH, READY_PATH, health_router, with_request_tracking};

fn router(checks: Vec<(&str, StaticHealthCheck, bool)>) -> axum::Router {
    let mut registry = HealthCheckRegistry::new();
    for (name, check, ready) in checks {
        let registration = HealthCheckRegistration::new(name, Arc::new(check))
            .with_timeout(Duration::from_millis(200));
        registry.register(if ready {
            registration.with_tag(READY_TAG)
        } else {
            registration
        });
    }

    let mut pipeline = HttpPipeline::new();
    pipeline.merge(health_router(Arc::new(HealthCheckService::new(registry))));
    with_request_tracking(pipeline.into_router())
}

#[tokio::test]
async fn test_no_checks_is_healthy() {
    let (status, body) = get(router(Vec::new()), READY_PATH).await.unwrap();

    assert_eq!(status, StatusCode::OK);
    let report: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["status"], "Healthy");
    assert!(report["results"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_check_is_reported_not_propagated() {
    let router = router(vec![
        ("broker", StaticHealthCheck::failing("socket closed"), true),
        ("disk", StaticHealthCheck::healthy(), false),
    ]);

    let (status, body) = get(router.clone(), READY_PATH).await.unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let report: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["results"]["broker"]["status"], "Unhealthy");
    assert!(
        report["results"]["broker"]["description"]
            .as_str()
            .unwrap()
            .contains("socket closed")
    );
    assert!(report["results"].get("disk").is_none());

    let (status, body) = get(router, LIVE_PATH).await.unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("\"disk\""));
}

#[tokio::test]
async fn test_slow_check_times_out_as_unhealthy() {
    let router = router(vec![(
        "search",
        StaticHealthCheck::healthy().with_delay(Duration::from_secs(5)),
        true,
    )]);

    let (status, body) = get(router, READY_PATH).await.unwrap();

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let report: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["results"]["search"]["status"], "Unhealthy");
}
