//! Bootstrap orchestrator.
//!
//! Drives startup through a fixed sequence of phases:
//!
//! ```text
//! Unconfigured
//!   └─ bind_options ───────────────► OptionsBound
//!        └─ configure_bus_contributions ─► PluginsBusConfigured
//!             └─ select_transport ─────► TransportSelected
//!                  └─ start_bus ─────────► BusStarted
//!                       └─ configure_http_pipeline ─► HttpPipelineConfigured
//!                            └─ mount_health_endpoints ─► HealthEndpointsMounted
//! ```
//!
//! Each step checks the current phase and fails with
//! [`BootstrapError::InvalidPhase`] when called out of order. Any failure is
//! fatal: the bootstrap is consumed and nothing is served.
//!
//! # Example
//!
//! ```ignore
//! let ready = Bootstrap::new(Configuration::load()?)
//!     .plugin(OrdersStartup::default())
//!     .with_transport_runtime(TransportKind::RabbitMq, amqp_runtime)
//!     .run()
//!     .await?;
//!
//! PlatformHost::new(ready, ServerOptions::bind(&configuration)?).run().await?;
//! ```

use crate::configurator::PlatformStartupBusConfigurator;
use crate::plugin::{HttpPipelineContext, PlatformStartup, PlatformStartupRegistry};
use crate::services::PlatformServices;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use transit_platform_core::bus::{BusRegistrationConfigurator, BusTopology};
use transit_platform_core::config::Configuration;
use transit_platform_core::control::{BusControl, BusError, TransportRuntime};
use transit_platform_core::environment::HostEnvironment;
use transit_platform_core::error::{BootstrapError, ContributionStage};
use transit_platform_core::options::{PlatformOptions, TransportKind};
use transit_platform_core::saga::SagaDbConfigs;
use transit_platform_core::startup::StartupBusFactory;
use transit_platform_rabbitmq::RabbitMqStartupBusFactory;
use transit_platform_runtime::health::{
    BusHealthCheck, HealthCheckRegistration, HealthCheckService, READY_TAG,
};
use transit_platform_runtime::mediator::MediatorRuntime;
use transit_platform_runtime::metrics::{BootstrapMetrics, install_prometheus_recorder};
use transit_platform_servicebus::ServiceBusStartupBusFactory;
use transit_platform_web::{
    HttpPipeline, LIVE_PATH, METRICS_PATH, READY_PATH, health_router, metrics_router,
    with_request_tracking,
};

/// Application name used when none is given.
pub const DEFAULT_APPLICATION_NAME: &str = "transit-platform";

/// Name of the health check reporting the started bus.
pub const BUS_HEALTH_CHECK: &str = "bus";

/// Bootstrap phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootstrapPhase {
    /// Nothing bound yet
    Unconfigured,
    /// Platform, transport, and saga options bound
    OptionsBound,
    /// Every plugin has contributed its bus topology
    PluginsBusConfigured,
    /// The transport factory has built the native bus configuration
    TransportSelected,
    /// The bus is running
    BusStarted,
    /// Every plugin has contributed to the HTTP pipeline
    HttpPipelineConfigured,
    /// Health endpoints mounted; ready to serve
    HealthEndpointsMounted,
}

impl BootstrapPhase {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::OptionsBound => "options_bound",
            Self::PluginsBusConfigured => "plugins_bus_configured",
            Self::TransportSelected => "transport_selected",
            Self::BusStarted => "bus_started",
            Self::HttpPipelineConfigured => "http_pipeline_configured",
            Self::HealthEndpointsMounted => "health_endpoints_mounted",
        }
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-use startup orchestrator.
pub struct Bootstrap {
    phase: BootstrapPhase,
    configuration: Arc<Configuration>,
    application_name: String,
    plugins: PlatformStartupRegistry,
    factories: Vec<Arc<dyn StartupBusFactory>>,
    runtimes: HashMap<TransportKind, Arc<dyn TransportRuntime>>,
    services: Option<PlatformServices>,
    bus: BusRegistrationConfigurator,
    topology: Option<BusTopology>,
    bus_control: Option<Arc<dyn BusControl>>,
    pipeline: HttpPipeline,
    router: Option<Router>,
    health: Option<Arc<HealthCheckService>>,
    prometheus: Option<PrometheusHandle>,
    started_at: Instant,
}

impl Bootstrap {
    /// Bootstrap over a loaded configuration.
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self {
            phase: BootstrapPhase::Unconfigured,
            configuration: Arc::new(configuration),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            plugins: PlatformStartupRegistry::new(),
            factories: Vec::new(),
            runtimes: HashMap::new(),
            services: None,
            bus: BusRegistrationConfigurator::new(),
            topology: None,
            bus_control: None,
            pipeline: HttpPipeline::new(),
            router: None,
            health: None,
            prometheus: None,
            started_at: Instant::now(),
        }
    }

    /// Name handed to HTTP contributions in [`HostEnvironment`].
    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Register a plugin after those already registered.
    #[must_use]
    pub fn plugin<P: PlatformStartup + 'static>(mut self, plugin: P) -> Self {
        self.plugins.register(plugin);
        self
    }

    /// Register a shared plugin after those already registered.
    #[must_use]
    pub fn plugin_arc(mut self, plugin: Arc<dyn PlatformStartup>) -> Self {
        self.plugins.register_arc(plugin);
        self
    }

    /// Replace the plugin registry.
    #[must_use]
    pub fn plugins(mut self, plugins: PlatformStartupRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    /// Use `factory` instead of the built-in factory for its transport.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn StartupBusFactory>) -> Self {
        self.factories.retain(|f| f.transport() != factory.transport());
        self.factories.push(factory);
        self
    }

    /// Runtime that starts the bus for `transport`. Broker transports have
    /// no built-in runtime; Mediator defaults to [`MediatorRuntime`].
    #[must_use]
    pub fn with_transport_runtime(
        mut self,
        transport: TransportKind,
        runtime: Arc<dyn TransportRuntime>,
    ) -> Self {
        self.runtimes.insert(transport, runtime);
        self
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    /// Services, once options are bound.
    #[must_use]
    pub const fn services(&self) -> Option<&PlatformServices> {
        self.services.as_ref()
    }

    /// Assembled topology, between transport selection and bus start.
    #[must_use]
    pub const fn topology(&self) -> Option<&BusTopology> {
        self.topology.as_ref()
    }

    /// Running bus, once started.
    #[must_use]
    pub const fn bus_control(&self) -> Option<&Arc<dyn BusControl>> {
        self.bus_control.as_ref()
    }

    /// Prometheus handle behind `/metrics`, once mounted.
    #[must_use]
    pub const fn prometheus(&self) -> Option<&PrometheusHandle> {
        self.prometheus.as_ref()
    }

    /// Bind `Platform`, both transport sections, and `SagaDbConfigs`.
    ///
    /// Both transport factories bind unconditionally; an absent section
    /// yields defaults. An unknown or missing transport fails here, before
    /// any factory runs.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Config`] for any binding failure.
    pub fn bind_options(self) -> Result<Self, BootstrapError> {
        self.step(
            "bind_options",
            BootstrapPhase::Unconfigured,
            BootstrapPhase::OptionsBound,
            |this| {
                let platform = PlatformOptions::bind(&this.configuration)?;
                let rabbitmq = RabbitMqStartupBusFactory::configure(&this.configuration)?;
                let service_bus = ServiceBusStartupBusFactory::configure(&this.configuration)?;
                let saga_dbs = SagaDbConfigs::bind(&this.configuration)?;

                tracing::info!(
                    transport = %platform.transport,
                    scheduler = platform.scheduler.as_deref().unwrap_or("native"),
                    environment = %platform.environment,
                    "Platform options bound"
                );

                this.services = Some(PlatformServices::new(
                    Arc::clone(&this.configuration),
                    platform,
                    rabbitmq,
                    service_bus,
                    saga_dbs,
                ));
                Ok(())
            },
        )
    }

    /// Fold every plugin's bus topology contribution, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Contribution`] for the first plugin that
    /// fails; later plugins are not called.
    pub fn configure_bus_contributions(self) -> Result<Self, BootstrapError> {
        const STEP: &str = "configure_bus_contributions";
        self.step(
            STEP,
            BootstrapPhase::OptionsBound,
            BootstrapPhase::PluginsBusConfigured,
            |this| {
                let services = required(this.services.as_mut(), STEP, BootstrapPhase::OptionsBound)?;
                for plugin in this.plugins.iter() {
                    plugin
                        .contribute_bus_topology(&mut this.bus, services)
                        .map_err(|source| {
                            BootstrapError::contribution(
                                plugin.name(),
                                ContributionStage::BusTopology,
                                source,
                            )
                        })?;
                    BootstrapMetrics::record_plugin_configured(ContributionStage::BusTopology.as_str());
                    tracing::debug!(plugin = plugin.name(), "Bus topology contributed");
                }
                Ok(())
            },
        )
    }

    /// Run exactly one transport factory, or none for Mediator.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error: invalid transport options, a failed
    /// plugin `configure_bus`, or a second transport on the bus.
    pub fn select_transport(self) -> Result<Self, BootstrapError> {
        const STEP: &str = "select_transport";
        self.step(
            STEP,
            BootstrapPhase::PluginsBusConfigured,
            BootstrapPhase::TransportSelected,
            |this| {
                let services = required(this.services.as_ref(), STEP, BootstrapPhase::OptionsBound)?;
                let options = services.platform_options();
                let kind = options.transport;

                let override_for = |kind: TransportKind| {
                    this.factories
                        .iter()
                        .find(|f| f.transport() == kind)
                        .map(|f| &**f as &dyn StartupBusFactory)
                };
                let factory: Option<&dyn StartupBusFactory> = match kind {
                    TransportKind::RabbitMq => Some(
                        override_for(kind)
                            .unwrap_or(services.rabbitmq() as &dyn StartupBusFactory),
                    ),
                    TransportKind::AzureServiceBus => Some(
                        override_for(kind)
                            .unwrap_or(services.service_bus() as &dyn StartupBusFactory),
                    ),
                    TransportKind::Mediator => None,
                };

                match factory {
                    Some(factory) => {
                        let configurator = PlatformStartupBusConfigurator::new(
                            options.clone(),
                            this.plugins.clone(),
                        );
                        factory.create_bus(&mut this.bus, &configurator)?;
                        tracing::info!(transport = %kind, "Transport bus configured");
                    }
                    None => {
                        tracing::info!("Mediator transport selected; consumers run in-process");
                    }
                }

                this.topology = Some(std::mem::take(&mut this.bus).into_topology());
                Ok(())
            },
        )
    }

    /// Start the bus with the selected transport's runtime, bounded by
    /// `Platform:BusStartTimeoutSeconds`. Registers the `bus` readiness check
    /// on success.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::NoTransportRuntime`] if no runtime serves
    /// the transport, or [`BootstrapError::BusStart`] with the runtime's
    /// error or [`BusError::StartTimeout`].
    pub async fn start_bus(mut self) -> Result<Self, BootstrapError> {
        const STEP: &str = "start_bus";
        self.expect_phase(STEP, BootstrapPhase::TransportSelected)?;

        match self.start_bus_inner().await {
            Ok(()) => {
                BootstrapMetrics::record_bus_started(true);
                self.advance(BootstrapPhase::BusStarted);
                Ok(self)
            }
            Err(error) => {
                BootstrapMetrics::record_bus_started(false);
                Err(Self::failed(STEP, error))
            }
        }
    }

    async fn start_bus_inner(&mut self) -> Result<(), BootstrapError> {
        const STEP: &str = "start_bus";
        let (kind, timeout, retry) = {
            let services = required(self.services.as_ref(), STEP, BootstrapPhase::OptionsBound)?;
            let options = services.platform_options();
            (options.transport, options.bus_start_timeout, options.retry.clone())
        };
        let topology = required(self.topology.take(), STEP, BootstrapPhase::TransportSelected)?;

        let runtime: Arc<dyn TransportRuntime> = match (self.runtimes.get(&kind), kind) {
            (Some(runtime), _) => Arc::clone(runtime),
            (None, TransportKind::Mediator) => Arc::new(MediatorRuntime::new().with_retry(retry)),
            (None, _) => return Err(BootstrapError::NoTransportRuntime(kind)),
        };

        tracing::info!(
            transport = %kind,
            timeout_secs = timeout.as_secs(),
            endpoints = topology.receive_endpoints().len(),
            "Starting bus"
        );
        let bus = start_with_timeout(&*runtime, topology, timeout).await?;

        let services = required(self.services.as_mut(), STEP, BootstrapPhase::OptionsBound)?;
        services.add_health_check(
            HealthCheckRegistration::new(BUS_HEALTH_CHECK, Arc::new(BusHealthCheck::new(Arc::clone(&bus))))
                .with_tag(READY_TAG),
        );
        self.bus_control = Some(bus);
        Ok(())
    }

    /// Fold every plugin's HTTP pipeline contribution, in registration order.
    ///
    /// Each plugin sees the running bus through [`HttpPipelineContext`].
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Contribution`] for the first plugin that
    /// fails.
    pub fn configure_http_pipeline(self) -> Result<Self, BootstrapError> {
        const STEP: &str = "configure_http_pipeline";
        self.step(
            STEP,
            BootstrapPhase::BusStarted,
            BootstrapPhase::HttpPipelineConfigured,
            |this| {
                let services = required(this.services.as_ref(), STEP, BootstrapPhase::OptionsBound)?;
                let bus = required(this.bus_control.as_ref(), STEP, BootstrapPhase::BusStarted)?;
                let environment = HostEnvironment::new(
                    services.platform_options().environment,
                    this.application_name.clone(),
                );
                let context = HttpPipelineContext::new(&environment, bus, services);
                for plugin in this.plugins.iter() {
                    plugin
                        .contribute_http_pipeline(&mut this.pipeline, &context)
                        .map_err(|source| {
                            BootstrapError::contribution(
                                plugin.name(),
                                ContributionStage::HttpPipeline,
                                source,
                            )
                        })?;
                    BootstrapMetrics::record_plugin_configured(ContributionStage::HttpPipeline.as_str());
                    tracing::debug!(plugin = plugin.name(), "HTTP pipeline contributed");
                }
                Ok(())
            },
        )
    }

    /// Mount `/health/ready`, `/health/live`, and `/metrics` when
    /// `Platform:Prometheus` is set, then wrap the router with request
    /// tracking.
    ///
    /// The Prometheus recorder is installed here. Failing to install it only
    /// disables `/metrics`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Http`] if a plugin routed one of the mounted
    /// paths, or [`BootstrapError::InvalidPhase`] when called out of order.
    pub fn mount_health_endpoints(self) -> Result<Self, BootstrapError> {
        const STEP: &str = "mount_health_endpoints";
        self.step(
            STEP,
            BootstrapPhase::HttpPipelineConfigured,
            BootstrapPhase::HealthEndpointsMounted,
            |this| {
                let services = required(this.services.as_mut(), STEP, BootstrapPhase::OptionsBound)?;

                if let Some(service) = &services.platform_options().prometheus {
                    match install_prometheus_recorder(service) {
                        Ok(handle) => this.prometheus = handle,
                        Err(error) => {
                            tracing::warn!(%error, "Prometheus exporter disabled");
                        }
                    }
                }
                if let Some(path) = reserved_route(this.pipeline.routes(), this.prometheus.is_some()) {
                    return Err(BootstrapError::Http(format!("route {path} is reserved")));
                }

                let health = Arc::new(HealthCheckService::new(services.take_health_checks()));
                let mut pipeline = std::mem::take(&mut this.pipeline);
                pipeline.merge(health_router(Arc::clone(&health)));
                if let Some(handle) = &this.prometheus {
                    pipeline.merge(metrics_router(handle.clone()));
                }

                tracing::info!(
                    checks = health.registry().len(),
                    metrics = this.prometheus.is_some(),
                    "Health endpoints mounted"
                );
                this.router = Some(with_request_tracking(pipeline.into_router()));
                this.health = Some(health);
                Ok(())
            },
        )
    }

    /// Hand over the finished platform.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidPhase`] unless every phase completed.
    pub fn into_ready(mut self) -> Result<ReadyPlatform, BootstrapError> {
        const STEP: &str = "into_ready";
        self.expect_phase(STEP, BootstrapPhase::HealthEndpointsMounted)?;

        let ready = BootstrapPhase::HealthEndpointsMounted;
        let services = required(self.services.take(), STEP, ready)?;
        let platform = ReadyPlatform {
            router: required(self.router.take(), STEP, ready)?,
            bus: required(self.bus_control.take(), STEP, ready)?,
            health: required(self.health.take(), STEP, ready)?,
            options: services.platform_options().clone(),
            configuration: self.configuration,
        };

        let elapsed = self.started_at.elapsed();
        BootstrapMetrics::record_duration(elapsed);
        tracing::info!(
            transport = %platform.options.transport,
            plugins = self.plugins.len(),
            duration_ms = elapsed.as_millis(),
            "Platform ready"
        );
        Ok(platform)
    }

    /// Run every phase in order.
    ///
    /// If a step after the bus has started fails, the bus is stopped before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// The first step failure.
    pub async fn run(self) -> Result<ReadyPlatform, BootstrapError> {
        let started = self
            .bind_options()?
            .configure_bus_contributions()?
            .select_transport()?
            .start_bus()
            .await?;

        let bus = started.bus_control.clone();
        let finished = started
            .configure_http_pipeline()
            .and_then(Self::mount_health_endpoints)
            .and_then(Self::into_ready);

        if let (Err(error), Some(bus)) = (&finished, bus) {
            tracing::warn!(%error, "Stopping bus after failed bootstrap");
            if let Err(stop_error) = bus.stop().await {
                tracing::warn!(error = %stop_error, "Bus stop failed");
            }
        }
        finished
    }

    fn step<F>(
        mut self,
        step: &'static str,
        expected: BootstrapPhase,
        next: BootstrapPhase,
        f: F,
    ) -> Result<Self, BootstrapError>
    where
        F: FnOnce(&mut Self) -> Result<(), BootstrapError>,
    {
        self.expect_phase(step, expected)?;
        f(&mut self).map_err(|error| Self::failed(step, error))?;
        self.advance(next);
        Ok(self)
    }

    fn expect_phase(&self, step: &'static str, expected: BootstrapPhase) -> Result<(), BootstrapError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(BootstrapError::InvalidPhase {
                step,
                expected: expected.to_string(),
                actual: self.phase.to_string(),
            })
        }
    }

    fn advance(&mut self, next: BootstrapPhase) {
        tracing::info!(from = %self.phase, phase = %next, "Bootstrap phase entered");
        self.phase = next;
    }

    fn failed(step: &'static str, error: BootstrapError) -> BootstrapError {
        BootstrapMetrics::record_failure(step);
        tracing::error!(step, %error, "Bootstrap failed");
        error
    }
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("phase", &self.phase)
            .field("application_name", &self.application_name)
            .field("plugins", &self.plugins)
            .field("runtimes", &self.runtimes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

async fn start_with_timeout(
    runtime: &dyn TransportRuntime,
    topology: BusTopology,
    timeout: Duration,
) -> Result<Arc<dyn BusControl>, BusError> {
    tokio::time::timeout(timeout, runtime.start(topology))
        .await
        .map_err(|_| BusError::StartTimeout(timeout))?
}

/// First plugin route that would collide with a host-mounted endpoint.
fn reserved_route(routes: &[String], metrics: bool) -> Option<&str> {
    routes.iter().map(String::as_str).find(|path| {
        *path == READY_PATH || *path == LIVE_PATH || (metrics && *path == METRICS_PATH)
    })
}

fn required<T>(
    value: Option<T>,
    step: &'static str,
    phase: BootstrapPhase,
) -> Result<T, BootstrapError> {
    value.ok_or_else(|| BootstrapError::InvalidPhase {
        step,
        expected: phase.to_string(),
        actual: "incomplete".to_string(),
    })
}

/// A fully bootstrapped platform, ready to serve.
pub struct ReadyPlatform {
    router: Router,
    bus: Arc<dyn BusControl>,
    health: Arc<HealthCheckService>,
    options: PlatformOptions,
    configuration: Arc<Configuration>,
}

impl ReadyPlatform {
    /// The finished HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The running bus.
    #[must_use]
    pub const fn bus(&self) -> &Arc<dyn BusControl> {
        &self.bus
    }

    /// Health evaluation behind the health endpoints.
    #[must_use]
    pub const fn health(&self) -> &Arc<HealthCheckService> {
        &self.health
    }

    /// Resolved platform options.
    #[must_use]
    pub const fn options(&self) -> &PlatformOptions {
        &self.options
    }

    /// The configuration the platform was built from.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
}

impl fmt::Debug for ReadyPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyPlatform")
            .field("transport", &self.bus.transport())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mediator() -> Configuration {
        Configuration::new().with_value("Platform:Transport", "Mediator")
    }

    #[test]
    fn test_phases_are_ordered() {
        assert!(BootstrapPhase::Unconfigured < BootstrapPhase::OptionsBound);
        assert!(BootstrapPhase::BusStarted < BootstrapPhase::HealthEndpointsMounted);
        assert_eq!(BootstrapPhase::TransportSelected.to_string(), "transport_selected");
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        let err = Bootstrap::new(mediator()).select_transport().unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidPhase { step: "select_transport", ref expected, ref actual }
                if expected == "plugins_bus_configured" && actual == "unconfigured"
        ));

        let bound = Bootstrap::new(mediator()).bind_options().unwrap();
        assert_eq!(bound.phase(), BootstrapPhase::OptionsBound);
        assert!(matches!(
            bound.mount_health_endpoints(),
            Err(BootstrapError::InvalidPhase { .. })
        ));
    }

    #[tokio::test]
    async fn test_steps_cannot_repeat() {
        let started = Bootstrap::new(mediator())
            .bind_options()
            .unwrap()
            .configure_bus_contributions()
            .unwrap()
            .select_transport()
            .unwrap()
            .start_bus()
            .await
            .unwrap();

        assert_eq!(started.phase(), BootstrapPhase::BusStarted);
        assert!(matches!(
            started.start_bus().await,
            Err(BootstrapError::InvalidPhase { step: "start_bus", .. })
        ));
    }

    #[test]
    fn test_prometheus_is_not_installed_while_binding() {
        let configuration = mediator().with_value("Platform:Prometheus", "orders-service");
        let bound = Bootstrap::new(configuration).bind_options().unwrap();

        assert_eq!(
            bound.services().unwrap().platform_options().prometheus.as_deref(),
            Some("orders-service")
        );
        assert!(bound.prometheus().is_none());
    }

    #[test]
    fn test_reserved_routes() {
        let routes = |paths: &[&str]| paths.iter().map(ToString::to_string).collect::<Vec<_>>();

        assert_eq!(reserved_route(&routes(&["/orders", "/health/live"]), false), Some("/health/live"));
        assert_eq!(reserved_route(&routes(&["/health/ready"]), false), Some("/health/ready"));
        assert_eq!(reserved_route(&routes(&["/orders", "/metrics"]), false), None);
        assert_eq!(reserved_route(&routes(&["/orders", "/metrics"]), true), Some("/metrics"));
        assert_eq!(reserved_route(&routes(&["/health", "/health/*"]), true), None);
    }

    #[tokio::test]
    async fn test_mediator_runs_without_plugins() {
        let ready = Bootstrap::new(mediator()).run().await.unwrap();

        assert_eq!(ready.bus().transport(), TransportKind::Mediator);
        assert_eq!(ready.health().registry().len(), 1);
        assert!(ready.health().registry().registrations()[0].has_tag(READY_TAG));
    }
}
