//! Service Bus-native bus configuration.

use crate::connection::ServiceBusConnection;
use std::any::Any;
use transit_platform_core::bus::SchedulerProvider;
use transit_platform_core::options::TransportKind;
use transit_platform_core::transport::{BusFactoryConfigurator, BusFactorySettings};

/// Service Bus bus configurator built by
/// [`ServiceBusStartupBusFactory`](crate::ServiceBusStartupBusFactory).
#[derive(Debug, Default)]
pub struct ServiceBusBusFactoryConfigurator {
    host: Option<ServiceBusConnection>,
    settings: BusFactorySettings,
}

impl ServiceBusBusFactoryConfigurator {
    /// Empty configurator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace credentials.
    pub fn host(&mut self, connection: ServiceBusConnection) {
        tracing::debug!(endpoint = %connection.endpoint(), "Service Bus namespace configured");
        self.host = Some(connection);
    }

    /// Configured namespace credentials.
    #[must_use]
    pub const fn host_settings(&self) -> Option<&ServiceBusConnection> {
        self.host.as_ref()
    }

    /// Schedule with the broker's scheduled-enqueue time.
    pub fn use_service_bus_message_scheduler(&mut self) {
        tracing::info!("Configuring Azure Service Bus message scheduler (scheduled enqueue)");
        self.settings.set_scheduler(SchedulerProvider::ScheduledEnqueue);
    }
}

impl BusFactoryConfigurator for ServiceBusBusFactoryConfigurator {
    fn transport(&self) -> TransportKind {
        TransportKind::AzureServiceBus
    }

    fn settings(&self) -> &BusFactorySettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut BusFactorySettings {
        &mut self.settings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
