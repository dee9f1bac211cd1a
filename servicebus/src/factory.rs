//! Azure Service Bus startup bus factory.

use crate::configurator::ServiceBusBusFactoryConfigurator;
use crate::options::ServiceBusOptions;
use transit_platform_core::bus::{BusRegistrationConfigurator, SchedulerProvider};
use transit_platform_core::config::Configuration;
use transit_platform_core::error::{BootstrapError, ConfigError};
use transit_platform_core::options::TransportKind;
use transit_platform_core::startup::{StartupBusConfigurator, StartupBusFactory};

/// Builds an Azure Service Bus bus from the `ASB` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceBusStartupBusFactory {
    options: ServiceBusOptions,
}

impl ServiceBusStartupBusFactory {
    /// Factory over already-bound options.
    #[must_use]
    pub const fn new(options: ServiceBusOptions) -> Self {
        Self { options }
    }

    /// Bind `ASB`. Credentials are resolved in
    /// [`create_bus`](StartupBusFactory::create_bus), so a host that never
    /// selects Service Bus does not need them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if a value is malformed.
    pub fn configure(configuration: &Configuration) -> Result<Self, ConfigError> {
        Ok(Self::new(ServiceBusOptions::bind(configuration)?))
    }

    /// Namespace options.
    #[must_use]
    pub const fn options(&self) -> &ServiceBusOptions {
        &self.options
    }
}

impl StartupBusFactory for ServiceBusStartupBusFactory {
    fn transport(&self) -> TransportKind {
        TransportKind::AzureServiceBus
    }

    fn create_bus(
        &self,
        bus: &mut BusRegistrationConfigurator,
        configurator: &dyn StartupBusConfigurator,
    ) -> Result<(), BootstrapError> {
        let connection = self.options.connection()?;

        if !configurator.has_scheduler_endpoint() {
            bus.add_message_scheduler(SchedulerProvider::ScheduledEnqueue);
        }

        let mut cfg = ServiceBusBusFactoryConfigurator::new();
        cfg.host(connection);

        if !configurator.try_configure_quartz(&mut cfg) {
            cfg.use_service_bus_message_scheduler();
        }

        configurator.configure_bus(&mut cfg, &bus.registration_context())?;

        bus.using_transport(Box::new(cfg))
    }
}
