//! Plugins that record what the bootstrap asks of them.

use crate::mocks::StaticHealthCheck;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use transit_platform_core::bus::{
    BusRegistrationConfigurator, BusRegistrationContext, Envelope, HandlerRegistration,
    consumer_fn,
};
use transit_platform_core::error::ContributionStage;
use transit_platform_core::transport::BusFactoryConfigurator;
use transit_platform_host::{HttpPipelineContext, PlatformServices, PlatformStartup};
use transit_platform_runtime::health::{HealthCheckRegistration, READY_TAG};
use transit_platform_web::HttpPipeline;

/// Ordered log of plugin calls shared between plugins.
///
/// Entries read `"<plugin>:<stage>"`, where stage is a
/// [`ContributionStage`] label.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Entries in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Configurable [`PlatformStartup`] that logs each call.
#[derive(Debug)]
pub struct RecordingPlugin {
    name: String,
    log: CallLog,
    consumers: Vec<(String, String)>,
    routes: Vec<(String, String)>,
    send_routes: Vec<(String, String)>,
    health_checks: Vec<(String, StaticHealthCheck, bool)>,
    fails_at: Option<ContributionStage>,
}

impl RecordingPlugin {
    /// Plugin that contributes nothing.
    #[must_use]
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            consumers: Vec::new(),
            routes: Vec::new(),
            send_routes: Vec::new(),
            health_checks: Vec::new(),
            fails_at: None,
        }
    }

    /// Register a no-op consumer for `message_type`.
    #[must_use]
    pub fn registers_consumer(mut self, name: impl Into<String>, message_type: impl Into<String>) -> Self {
        self.consumers.push((name.into(), message_type.into()));
        self
    }

    /// Add a `GET` route answering `body`.
    #[must_use]
    pub fn with_route(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.routes.push((path.into(), body.into()));
        self
    }

    /// Add a `GET` route that sends an empty `message_type` envelope through
    /// the running bus and answers `202`, or `503` if the send fails.
    #[must_use]
    pub fn with_send_route(mut self, path: impl Into<String>, message_type: impl Into<String>) -> Self {
        self.send_routes.push((path.into(), message_type.into()));
        self
    }

    /// Register an untagged health check during bus topology. It shows up
    /// on liveness only.
    #[must_use]
    pub fn with_health_check(mut self, name: impl Into<String>, check: StaticHealthCheck) -> Self {
        self.health_checks.push((name.into(), check, false));
        self
    }

    /// Register a health check tagged `ready` during bus topology.
    #[must_use]
    pub fn with_ready_check(mut self, name: impl Into<String>, check: StaticHealthCheck) -> Self {
        self.health_checks.push((name.into(), check, true));
        self
    }

    /// Fail the given stage.
    #[must_use]
    pub const fn fails_at(mut self, stage: ContributionStage) -> Self {
        self.fails_at = Some(stage);
        self
    }

    fn enter(&self, stage: ContributionStage) -> anyhow::Result<()> {
        self.log.push(format!("{}:{}", self.name, stage.as_str()));
        if self.fails_at == Some(stage) {
            anyhow::bail!("{} refused {stage}", self.name);
        }
        Ok(())
    }
}

impl PlatformStartup for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn contribute_bus_topology(
        &self,
        bus: &mut BusRegistrationConfigurator,
        services: &mut PlatformServices,
    ) -> anyhow::Result<()> {
        self.enter(ContributionStage::BusTopology)?;

        for (name, message_type) in &self.consumers {
            bus.add_consumer(
                HandlerRegistration::consumer(name.clone(), consumer_fn(|_| async { Ok(()) }))
                    .handles(message_type.clone()),
            );
        }
        for (name, check, ready) in &self.health_checks {
            let registration = HealthCheckRegistration::new(name.clone(), Arc::new(check.clone()));
            services.add_health_check(if *ready {
                registration.with_tag(READY_TAG)
            } else {
                registration
            });
        }
        Ok(())
    }

    fn configure_bus(
        &self,
        _configurator: &mut dyn BusFactoryConfigurator,
        _context: &BusRegistrationContext<'_>,
    ) -> anyhow::Result<()> {
        self.enter(ContributionStage::BusConfiguration)
    }

    fn contribute_http_pipeline(
        &self,
        pipeline: &mut HttpPipeline,
        context: &HttpPipelineContext<'_>,
    ) -> anyhow::Result<()> {
        self.enter(ContributionStage::HttpPipeline)?;

        for (path, body) in &self.routes {
            let body = body.clone();
            pipeline.route(path, get(move || async move { body }));
        }
        for (path, message_type) in &self.send_routes {
            let bus = Arc::clone(context.bus());
            let message_type = message_type.clone();
            pipeline.route(
                path,
                get(move || {
                    let bus = Arc::clone(&bus);
                    let envelope = Envelope::new(message_type.clone(), json!({}));
                    async move {
                        match bus.send(envelope).await {
                            Ok(()) => StatusCode::ACCEPTED,
                            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
                        }
                    }
                }),
            );
        }
        Ok(())
    }
}
