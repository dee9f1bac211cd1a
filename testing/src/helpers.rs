//! Configuration builders and HTTP helpers.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use transit_platform_core::config::Configuration;

/// Configuration from `(key, value)` pairs with `:`-separated keys.
///
/// ```ignore
/// let configuration = configuration(&[("Platform:Transport", "Mediator")]);
/// ```
#[must_use]
pub fn configuration(values: &[(&str, &str)]) -> Configuration {
    values
        .iter()
        .fold(Configuration::new(), |configuration, (key, value)| {
            configuration.with_value(key, *value)
        })
}

/// Minimal Mediator configuration.
#[must_use]
pub fn mediator_configuration() -> Configuration {
    configuration(&[("Platform:Transport", "Mediator")])
}

/// Install a test-writer subscriber so `tracing` output shows up under
/// `cargo test -- --nocapture`. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Send `GET path` to `router` and return the status and body text.
///
/// # Errors
///
/// Returns an error if the request cannot be built or the body cannot be
/// read.
pub async fn get(router: Router, path: &str) -> anyhow::Result<(StatusCode, String)> {
    let response = router
        .oneshot(Request::builder().uri(path).body(Body::empty())?)
        .await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, String::from_utf8(body.to_vec())?))
}
