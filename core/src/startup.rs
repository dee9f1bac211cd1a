//! Startup bus configuration contracts.
//!
//! A [`StartupBusFactory`] is the transport-specific half of bus
//! construction; a [`StartupBusConfigurator`] is the transport-agnostic half
//! every factory delegates to. Both are synchronous: nothing here touches
//! the network.
//!
//! Every factory follows the same algorithm:
//!
//! 1. If [`has_scheduler_endpoint`](StartupBusConfigurator::has_scheduler_endpoint)
//!    is false, register the transport-native message scheduler.
//! 2. Build the native configurator from typed options (host, credentials, TLS).
//! 3. If [`try_configure_quartz`](StartupBusConfigurator::try_configure_quartz)
//!    returns false, enable the native delayed-message scheduler.
//! 4. Call [`configure_bus`](StartupBusConfigurator::configure_bus).
//! 5. Attach the native configurator to the bus.
//!
//! Steps 1 and 3 are mutually exclusive in outcome: one scheduling mechanism
//! is active per bus.

use crate::bus::{BusRegistrationConfigurator, BusRegistrationContext};
use crate::error::BootstrapError;
use crate::options::TransportKind;
use crate::transport::BusFactoryConfigurator;

/// Transport-agnostic bus configuration shared by all factories.
pub trait StartupBusConfigurator: Send + Sync {
    /// Whether platform configuration names an external scheduler endpoint.
    fn has_scheduler_endpoint(&self) -> bool;

    /// Apply settings common to every transport: retry, prefetch, plugin
    /// bus hooks, receive endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Contribution`] if a plugin's bus hook fails.
    fn configure_bus(
        &self,
        configurator: &mut dyn BusFactoryConfigurator,
        context: &BusRegistrationContext<'_>,
    ) -> Result<(), BootstrapError>;

    /// Point the bus at the external scheduler, if one is configured.
    ///
    /// Returns false when no external scheduler is configured, which tells
    /// the caller to fall back to the transport-native scheduler.
    fn try_configure_quartz(&self, configurator: &mut dyn BusFactoryConfigurator) -> bool;
}

/// Builds a transport-specific bus configuration.
pub trait StartupBusFactory: Send + Sync {
    /// Transport this factory builds.
    fn transport(&self) -> TransportKind;

    /// Build the native configuration and attach it to `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Config`] for malformed transport options,
    /// or whatever `configure_bus` returns.
    fn create_bus(
        &self,
        bus: &mut BusRegistrationConfigurator,
        configurator: &dyn StartupBusConfigurator,
    ) -> Result<(), BootstrapError>;
}
