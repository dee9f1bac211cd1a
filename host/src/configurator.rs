//! Transport-agnostic half of bus construction.

use crate::plugin::PlatformStartupRegistry;
use transit_platform_core::bus::BusRegistrationContext;
use transit_platform_core::error::{BootstrapError, ContributionStage};
use transit_platform_core::options::PlatformOptions;
use transit_platform_core::startup::StartupBusConfigurator;
use transit_platform_core::transport::BusFactoryConfigurator;
use transit_platform_runtime::metrics::BootstrapMetrics;

/// Scheme prefix for the external scheduler's queue address.
pub const SCHEDULER_QUEUE_SCHEME: &str = "queue:";

/// [`StartupBusConfigurator`] backed by the bound `Platform` options and
/// the plugin registry.
#[derive(Debug, Clone)]
pub struct PlatformStartupBusConfigurator {
    options: PlatformOptions,
    plugins: PlatformStartupRegistry,
}

impl PlatformStartupBusConfigurator {
    /// Configurator over `options` and `plugins`.
    #[must_use]
    pub const fn new(options: PlatformOptions, plugins: PlatformStartupRegistry) -> Self {
        Self { options, plugins }
    }
}

impl StartupBusConfigurator for PlatformStartupBusConfigurator {
    fn has_scheduler_endpoint(&self) -> bool {
        self.options.has_scheduler_endpoint()
    }

    fn configure_bus(
        &self,
        bus: &mut dyn BusFactoryConfigurator,
        context: &BusRegistrationContext<'_>,
    ) -> Result<(), BootstrapError> {
        if let Some(retry) = &self.options.retry {
            bus.use_message_retry(retry.clone());
        }
        if let Some(prefetch) = self.options.prefetch_count {
            bus.set_prefetch_count(prefetch);
        }

        for plugin in self.plugins.iter() {
            plugin.configure_bus(bus, context).map_err(|source| {
                BootstrapError::contribution(
                    plugin.name(),
                    ContributionStage::BusConfiguration,
                    source,
                )
            })?;
            BootstrapMetrics::record_plugin_configured(ContributionStage::BusConfiguration.as_str());
        }

        bus.configure_endpoints(context);

        tracing::info!(
            transport = %bus.transport(),
            endpoints = bus.settings().receive_endpoints().len(),
            "Bus configured"
        );
        Ok(())
    }

    fn try_configure_quartz(&self, bus: &mut dyn BusFactoryConfigurator) -> bool {
        match &self.options.scheduler {
            Some(queue) => {
                let address = format!("{SCHEDULER_QUEUE_SCHEME}{queue}");
                tracing::info!(%address, "Configuring external message scheduler");
                bus.use_message_scheduler(&address);
                true
            }
            None => false,
        }
    }
}
