//! Health checks and their evaluation.
//!
//! Checks are registered by name with a set of tags. The HTTP layer asks the
//! [`HealthCheckService`] for a report filtered by a predicate (e.g. "tagged
//! `ready`") and renders it; nothing here knows about HTTP.
//!
//! A check that returns an error, panics, or exceeds its timeout is reported
//! as an [`HealthStatus::Unhealthy`] entry rather than propagated. The
//! overall status is the worst entry; an empty report is healthy.

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use transit_platform_core::control::{BusControl, BusHealthStatus};

/// Tag carried by checks that gate readiness.
pub const READY_TAG: &str = "ready";

/// Health check status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component is operational but experiencing issues
    Degraded,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Check if status is unhealthy
    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }

    /// Get the worst status between two statuses
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }

    /// Stable name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Degraded => "Degraded",
            Self::Unhealthy => "Unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    /// Reported status
    pub status: HealthStatus,
    /// Optional detail
    pub description: Option<String>,
    /// Arbitrary structured data (counts, endpoints, versions)
    pub data: BTreeMap<String, Value>,
}

impl HealthCheckResult {
    /// Create a healthy result
    #[must_use]
    pub const fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: None,
            data: BTreeMap::new(),
        }
    }

    /// Create a degraded result
    #[must_use]
    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            description: Some(description.into()),
            data: BTreeMap::new(),
        }
    }

    /// Create an unhealthy result
    #[must_use]
    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: Some(description.into()),
            data: BTreeMap::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add data to the result
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// A health-checkable component.
///
/// Should complete quickly; every registration carries a timeout and a slow
/// check is reported unhealthy.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Check component health.
    ///
    /// # Errors
    ///
    /// An error is reported as an unhealthy entry carrying its message.
    async fn check(&self) -> anyhow::Result<HealthCheckResult>;
}

/// A named, tagged health check.
#[derive(Clone)]
pub struct HealthCheckRegistration {
    name: String,
    tags: BTreeSet<String>,
    timeout: Duration,
    check: Arc<dyn HealthCheck>,
}

impl HealthCheckRegistration {
    /// Default per-check timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Register `check` under `name` with no tags.
    #[must_use]
    pub fn new(name: impl Into<String>, check: Arc<dyn HealthCheck>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            timeout: Self::DEFAULT_TIMEOUT,
            check,
        }
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Override the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether the check carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl fmt::Debug for HealthCheckRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheckRegistration")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Ordered set of health check registrations, filled during bootstrap.
#[derive(Debug, Clone, Default)]
pub struct HealthCheckRegistry {
    registrations: Vec<HealthCheckRegistration>,
}

impl HealthCheckRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a check. Names are unique: a later registration with the same
    /// name replaces the earlier one.
    pub fn register(&mut self, registration: HealthCheckRegistration) -> &mut Self {
        if let Some(existing) = self
            .registrations
            .iter_mut()
            .find(|r| r.name == registration.name)
        {
            tracing::warn!(check = %registration.name, "Health check registered twice; replacing");
            *existing = registration;
        } else {
            tracing::debug!(check = %registration.name, tags = ?registration.tags, "Health check registered");
            self.registrations.push(registration);
        }
        self
    }

    /// Registrations in registration order.
    #[must_use]
    pub fn registrations(&self) -> &[HealthCheckRegistration] {
        &self.registrations
    }

    /// Number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no checks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// One check's entry in a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReportEntry {
    /// Reported status
    pub status: HealthStatus,
    /// Optional detail
    pub description: Option<String>,
    /// Structured data
    pub data: BTreeMap<String, Value>,
    /// How long the check took
    #[serde(skip)]
    pub duration: Duration,
    /// Tags of the registration
    #[serde(skip)]
    pub tags: BTreeSet<String>,
}

/// Result of evaluating a set of checks.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    /// Worst entry status; healthy when there are no entries
    pub status: HealthStatus,
    /// Entries by check name
    pub entries: BTreeMap<String, HealthReportEntry>,
    /// Wall-clock time for the whole evaluation
    pub total_duration: Duration,
}

impl HealthReport {
    /// Build a report from entries.
    #[must_use]
    pub fn new(entries: BTreeMap<String, HealthReportEntry>, total_duration: Duration) -> Self {
        let status = entries
            .values()
            .map(|e| e.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst);
        Self {
            status,
            entries,
            total_duration,
        }
    }
}

/// Evaluates registered checks.
#[derive(Debug, Clone, Default)]
pub struct HealthCheckService {
    registry: HealthCheckRegistry,
}

impl HealthCheckService {
    /// Service over a finished registry.
    #[must_use]
    pub const fn new(registry: HealthCheckRegistry) -> Self {
        Self { registry }
    }

    /// The registry being evaluated.
    #[must_use]
    pub const fn registry(&self) -> &HealthCheckRegistry {
        &self.registry
    }

    /// Run every check matching `predicate` concurrently.
    pub async fn check_health<P>(&self, predicate: P) -> HealthReport
    where
        P: Fn(&HealthCheckRegistration) -> bool,
    {
        let started = Instant::now();
        let runs = self
            .registry
            .registrations()
            .iter()
            .filter(|r| predicate(r))
            .map(run_check);

        let entries = futures::future::join_all(runs).await.into_iter().collect();
        let report = HealthReport::new(entries, started.elapsed());

        tracing::debug!(
            status = %report.status,
            checks = report.entries.len(),
            duration_ms = report.total_duration.as_millis(),
            "Health evaluated"
        );
        report
    }
}

async fn run_check(registration: &HealthCheckRegistration) -> (String, HealthReportEntry) {
    let started = Instant::now();
    let guarded = AssertUnwindSafe(registration.check.check()).catch_unwind();

    let result = match tokio::time::timeout(registration.timeout, guarded).await {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(error))) => {
            tracing::warn!(check = %registration.name, error = %error, "Health check failed");
            HealthCheckResult::unhealthy(error.to_string())
        }
        Ok(Err(_panic)) => {
            tracing::error!(check = %registration.name, "Health check panicked");
            HealthCheckResult::unhealthy("Health check panicked")
        }
        Err(_elapsed) => {
            tracing::warn!(check = %registration.name, timeout = ?registration.timeout, "Health check timed out");
            HealthCheckResult::unhealthy(format!(
                "Health check timed out after {:?}",
                registration.timeout
            ))
        }
    };

    let entry = HealthReportEntry {
        status: result.status,
        description: result.description,
        data: result.data,
        duration: started.elapsed(),
        tags: registration.tags.clone(),
    };
    (registration.name.clone(), entry)
}

/// Reports the health of a started bus.
pub struct BusHealthCheck {
    bus: Arc<dyn BusControl>,
}

impl BusHealthCheck {
    /// Check over a bus handle.
    #[must_use]
    pub fn new(bus: Arc<dyn BusControl>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl HealthCheck for BusHealthCheck {
    async fn check(&self) -> anyhow::Result<HealthCheckResult> {
        let health = self.bus.health();
        let status = match health.status {
            BusHealthStatus::Healthy => HealthStatus::Healthy,
            BusHealthStatus::Degraded => HealthStatus::Degraded,
            BusHealthStatus::Unhealthy => HealthStatus::Unhealthy,
        };
        Ok(HealthCheckResult {
            status,
            description: Some(health.description),
            data: BTreeMap::new(),
        }
        .with_data("transport", self.bus.transport().as_str())
        .with_data("endpoints", health.endpoints))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    struct Fixed(HealthCheckResult);

    #[async_trait]
    impl HealthCheck for Fixed {
        async fn check(&self) -> anyhow::Result<HealthCheckResult> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl HealthCheck for Failing {
        async fn check(&self) -> anyhow::Result<HealthCheckResult> {
            anyhow::bail!("connection refused")
        }
    }

    struct Panicking;

    #[async_trait]
    impl HealthCheck for Panicking {
        async fn check(&self) -> anyhow::Result<HealthCheckResult> {
            panic!("boom")
        }
    }

    struct Slow;

    #[async_trait]
    impl HealthCheck for Slow {
        async fn check(&self) -> anyhow::Result<HealthCheckResult> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(HealthCheckResult::healthy())
        }
    }

    fn fixed(result: HealthCheckResult) -> Arc<dyn HealthCheck> {
        Arc::new(Fixed(result))
    }

    #[test]
    fn test_health_status_ordering() {
        assert!(HealthStatus::Healthy < HealthStatus::Degraded);
        assert!(HealthStatus::Degraded < HealthStatus::Unhealthy);
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Degraded.worst(HealthStatus::Unhealthy),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_empty_report_is_healthy() {
        let service = HealthCheckService::default();
        let report = service.check_health(|_| true).await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.entries.is_empty());
    }

    #[tokio::test]
    async fn test_predicate_filters_by_tag() {
        let mut registry = HealthCheckRegistry::new();
        registry
            .register(
                HealthCheckRegistration::new("db", fixed(HealthCheckResult::unhealthy("down")))
                    .with_tag(READY_TAG),
            )
            .register(HealthCheckRegistration::new(
                "self",
                fixed(HealthCheckResult::healthy()),
            ));
        let service = HealthCheckService::new(registry);

        let ready = service.check_health(|r| r.has_tag(READY_TAG)).await;
        assert_eq!(ready.status, HealthStatus::Unhealthy);
        assert_eq!(ready.entries.len(), 1);

        let live = service.check_health(|_| true).await;
        assert_eq!(live.entries.len(), 2);
        assert_eq!(live.entries["self"].status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_errors_and_panics_become_unhealthy_entries() {
        let mut registry = HealthCheckRegistry::new();
        registry
            .register(HealthCheckRegistration::new("broker", Arc::new(Failing)))
            .register(HealthCheckRegistration::new("cache", Arc::new(Panicking)));
        let report = HealthCheckService::new(registry).check_health(|_| true).await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(
            report.entries["broker"].description.as_deref(),
            Some("connection refused")
        );
        assert_eq!(report.entries["cache"].status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_timeout_becomes_unhealthy_entry() {
        let mut registry = HealthCheckRegistry::new();
        registry.register(
            HealthCheckRegistration::new("slow", Arc::new(Slow))
                .with_timeout(Duration::from_millis(50)),
        );
        let report = HealthCheckService::new(registry).check_health(|_| true).await;

        let entry = &report.entries["slow"];
        assert_eq!(entry.status, HealthStatus::Unhealthy);
        assert!(entry.description.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_degraded_entry_degrades_report() {
        let mut registry = HealthCheckRegistry::new();
        registry
            .register(HealthCheckRegistration::new(
                "a",
                fixed(HealthCheckResult::healthy()),
            ))
            .register(HealthCheckRegistration::new(
                "b",
                fixed(HealthCheckResult::degraded("slow disk").with_data("free_mb", 12)),
            ));
        let report = HealthCheckService::new(registry).check_health(|_| true).await;

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.entries["b"].data["free_mb"], serde_json::json!(12));
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let mut registry = HealthCheckRegistry::new();
        registry
            .register(HealthCheckRegistration::new("bus", fixed(HealthCheckResult::healthy())))
            .register(
                HealthCheckRegistration::new("bus", fixed(HealthCheckResult::healthy()))
                    .with_tag(READY_TAG),
            );
        assert_eq!(registry.len(), 1);
        assert!(registry.registrations()[0].has_tag(READY_TAG));
    }
}
