//! Prometheus metrics for bootstrap and the in-process bus.
//!
//! The recorder is only installed when `Platform:Prometheus` names a
//! service; without it the `metrics` macros are no-ops.
//!
//! # Example
//!
//! ```rust,no_run
//! use transit_platform_runtime::metrics::install_prometheus_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_prometheus_recorder("orders-service")?;
//! if let Some(handle) = handle {
//!     println!("{}", handle.render());
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the global Prometheus recorder, labelling every series with
/// `service`.
///
/// Returns `Ok(None)` if a recorder is already installed (e.g. by another
/// test in the same process).
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or installed.
pub fn install_prometheus_recorder(service: &str) -> Result<Option<PrometheusHandle>, MetricsError> {
    register_metrics();

    let builder = PrometheusBuilder::new()
        .add_global_label("service", service)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    match builder.install_recorder() {
        Ok(handle) => {
            tracing::info!(service, "Prometheus recorder installed");
            Ok(Some(handle))
        }
        Err(e) => {
            let err_msg = e.to_string();
            if err_msg.contains("already initialized") {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(None)
            } else {
                Err(MetricsError::Install(err_msg))
            }
        }
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Bootstrap Metrics
    describe_counter!(
        "platform_plugins_configured_total",
        "Total number of plugin contributions applied, by stage"
    );
    describe_counter!(
        "platform_bootstrap_failures_total",
        "Total number of bootstrap failures, by phase"
    );
    describe_histogram!(
        "platform_bootstrap_duration_seconds",
        "Time taken from configuration binding to health endpoints mounted"
    );
    describe_gauge!(
        "platform_bus_started",
        "Whether the bus is started (1) or stopped (0)"
    );

    // Mediator Metrics
    describe_counter!(
        "mediator_messages_dispatched_total",
        "Total number of messages delivered to in-process handlers"
    );
    describe_counter!(
        "mediator_dispatch_errors_total",
        "Total number of in-process dispatch failures"
    );
}

/// Bootstrap metrics recorder.
pub struct BootstrapMetrics;

impl BootstrapMetrics {
    /// Record one plugin contribution applied.
    pub fn record_plugin_configured(stage: &'static str) {
        counter!("platform_plugins_configured_total", "stage" => stage).increment(1);
    }

    /// Record a bootstrap failure in a phase.
    pub fn record_failure(phase: &'static str) {
        counter!("platform_bootstrap_failures_total", "phase" => phase).increment(1);
    }

    /// Record the total bootstrap duration.
    pub fn record_duration(duration: Duration) {
        histogram!("platform_bootstrap_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record bus started/stopped.
    pub fn record_bus_started(started: bool) {
        gauge!("platform_bus_started").set(if started { 1.0 } else { 0.0 });
    }
}

/// Mediator metrics recorder.
pub struct MediatorMetrics;

impl MediatorMetrics {
    /// Record a successful delivery.
    pub fn record_dispatch() {
        counter!("mediator_messages_dispatched_total").increment(1);
    }

    /// Record a dispatch failure.
    pub fn record_error() {
        counter!("mediator_dispatch_errors_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        let first = install_prometheus_recorder("test-service");
        assert!(first.is_ok());

        // A second install in the same process is tolerated.
        let second = install_prometheus_recorder("test-service");
        assert!(matches!(second, Ok(None)));
    }

    #[test]
    fn test_recorders_without_installed_exporter() {
        // Recording without a handle must not panic.
        BootstrapMetrics::record_plugin_configured("bus_topology");
        BootstrapMetrics::record_failure("bus_started");
        BootstrapMetrics::record_duration(Duration::from_millis(5));
        BootstrapMetrics::record_bus_started(true);
        MediatorMetrics::record_dispatch();
        MediatorMetrics::record_error();
    }
}
