//! What the bootstrap hands to plugins while the bus topology is built.

use http::Extensions;
use std::sync::Arc;
use transit_platform_core::config::Configuration;
use transit_platform_core::options::PlatformOptions;
use transit_platform_core::saga::SagaDbConfigs;
use transit_platform_rabbitmq::RabbitMqStartupBusFactory;
use transit_platform_runtime::health::{HealthCheckRegistration, HealthCheckRegistry};
use transit_platform_servicebus::ServiceBusStartupBusFactory;

/// Bound options plus a typed slot map shared across plugins.
///
/// Everything here is built once in the options phase. Plugins may
/// register health checks and insert shared resources (a request client, a
/// connection pool) for later plugins to pick up.
#[derive(Debug)]
pub struct PlatformServices {
    configuration: Arc<Configuration>,
    platform: PlatformOptions,
    rabbitmq: RabbitMqStartupBusFactory,
    service_bus: ServiceBusStartupBusFactory,
    saga_dbs: Arc<SagaDbConfigs>,
    health: HealthCheckRegistry,
    shared: Extensions,
}

impl PlatformServices {
    /// Assemble the services from already-bound parts.
    #[must_use]
    pub fn new(
        configuration: Arc<Configuration>,
        platform: PlatformOptions,
        rabbitmq: RabbitMqStartupBusFactory,
        service_bus: ServiceBusStartupBusFactory,
        saga_dbs: SagaDbConfigs,
    ) -> Self {
        Self {
            configuration,
            platform,
            rabbitmq,
            service_bus,
            saga_dbs: Arc::new(saga_dbs),
            health: HealthCheckRegistry::new(),
            shared: Extensions::new(),
        }
    }

    /// Raw configuration, for plugin-specific sections.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Resolved `Platform` options.
    #[must_use]
    pub const fn platform_options(&self) -> &PlatformOptions {
        &self.platform
    }

    /// RabbitMQ factory bound from `RMQ`, whether or not it is selected.
    #[must_use]
    pub const fn rabbitmq(&self) -> &RabbitMqStartupBusFactory {
        &self.rabbitmq
    }

    /// Service Bus factory bound from `ASB`, whether or not it is selected.
    #[must_use]
    pub const fn service_bus(&self) -> &ServiceBusStartupBusFactory {
        &self.service_bus
    }

    /// Saga persistence options.
    #[must_use]
    pub fn saga_db_configs(&self) -> Arc<SagaDbConfigs> {
        Arc::clone(&self.saga_dbs)
    }

    /// Register a health check.
    pub fn add_health_check(&mut self, registration: HealthCheckRegistration) -> &mut Self {
        self.health.register(registration);
        self
    }

    /// Registered health checks.
    #[must_use]
    pub const fn health_checks(&self) -> &HealthCheckRegistry {
        &self.health
    }

    /// Share a value with later plugins, replacing any value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.shared.insert(value)
    }

    /// A value shared by an earlier plugin.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.shared.get::<T>()
    }

    pub(crate) fn take_health_checks(&mut self) -> HealthCheckRegistry {
        std::mem::take(&mut self.health)
    }
}
