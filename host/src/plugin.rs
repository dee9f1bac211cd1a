//! Plugin contract and the ordered plugin registry.

use crate::services::PlatformServices;
use std::fmt;
use std::sync::Arc;
use transit_platform_core::bus::{BusRegistrationConfigurator, BusRegistrationContext};
use transit_platform_core::control::BusControl;
use transit_platform_core::environment::HostEnvironment;
use transit_platform_core::transport::BusFactoryConfigurator;
use transit_platform_web::HttpPipeline;

/// A module that extends the bus topology and the HTTP pipeline.
///
/// The bootstrap calls each method once, folding over plugins in
/// registration order: every plugin's [`contribute_bus_topology`] runs
/// before the transport is selected, [`configure_bus`] runs inside the
/// transport factory, and [`contribute_http_pipeline`] runs after the bus
/// has started. An `Err` from any of them aborts startup.
///
/// [`contribute_bus_topology`]: PlatformStartup::contribute_bus_topology
/// [`configure_bus`]: PlatformStartup::configure_bus
/// [`contribute_http_pipeline`]: PlatformStartup::contribute_http_pipeline
///
/// # Example
///
/// ```ignore
/// struct Billing;
///
/// impl PlatformStartup for Billing {
///     fn name(&self) -> &str {
///         "billing"
///     }
///
///     fn contribute_bus_topology(
///         &self,
///         bus: &mut BusRegistrationConfigurator,
///         _services: &mut PlatformServices,
///     ) -> anyhow::Result<()> {
///         bus.add_consumer(
///             HandlerRegistration::consumer("IssueInvoiceConsumer", Arc::new(IssueInvoice))
///                 .handles("IssueInvoice"),
///         );
///         Ok(())
///     }
///
///     fn contribute_http_pipeline(
///         &self,
///         pipeline: &mut HttpPipeline,
///         context: &HttpPipelineContext<'_>,
///     ) -> anyhow::Result<()> {
///         pipeline
///             .route("/invoices", get(list_invoices))
///             .route("/invoices", post(issue_invoice).with_state(Arc::clone(context.bus())));
///         Ok(())
///     }
/// }
/// ```
pub trait PlatformStartup: Send + Sync {
    /// Name used in logs and contribution errors.
    fn name(&self) -> &str;

    /// Register consumers, sagas, activities, and request clients.
    ///
    /// `services` holds the bound options and a typed slot map; anything a
    /// plugin inserts there is visible to every later plugin.
    ///
    /// # Errors
    ///
    /// Any error aborts startup.
    fn contribute_bus_topology(
        &self,
        bus: &mut BusRegistrationConfigurator,
        services: &mut PlatformServices,
    ) -> anyhow::Result<()>;

    /// Bus-level settings against the transport-native configurator, applied
    /// before receive endpoints are configured. Not called in Mediator mode.
    ///
    /// # Errors
    ///
    /// Any error aborts startup.
    fn configure_bus(
        &self,
        _bus: &mut dyn BusFactoryConfigurator,
        _context: &BusRegistrationContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Add routes and layers to the HTTP pipeline.
    ///
    /// The bus is already running; handlers that publish or send clone it
    /// out of `context`.
    ///
    /// # Errors
    ///
    /// Any error aborts startup.
    fn contribute_http_pipeline(
        &self,
        pipeline: &mut HttpPipeline,
        context: &HttpPipelineContext<'_>,
    ) -> anyhow::Result<()>;
}

/// What an HTTP contribution can see of the started platform.
#[derive(Clone, Copy)]
pub struct HttpPipelineContext<'a> {
    environment: &'a HostEnvironment,
    bus: &'a Arc<dyn BusControl>,
    services: &'a PlatformServices,
}

impl<'a> HttpPipelineContext<'a> {
    /// Context over a started bus.
    #[must_use]
    pub const fn new(
        environment: &'a HostEnvironment,
        bus: &'a Arc<dyn BusControl>,
        services: &'a PlatformServices,
    ) -> Self {
        Self {
            environment,
            bus,
            services,
        }
    }

    /// Hosting environment and application name.
    #[must_use]
    pub const fn environment(&self) -> &'a HostEnvironment {
        self.environment
    }

    /// The running bus.
    #[must_use]
    pub const fn bus(&self) -> &'a Arc<dyn BusControl> {
        self.bus
    }

    /// Bound options and whatever plugins stored during bus topology.
    #[must_use]
    pub const fn services(&self) -> &'a PlatformServices {
        self.services
    }
}

impl fmt::Debug for HttpPipelineContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPipelineContext")
            .field("environment", self.environment)
            .field("transport", &self.bus.transport())
            .finish_non_exhaustive()
    }
}

/// Plugins in registration order.
#[derive(Clone, Default)]
pub struct PlatformStartupRegistry {
    plugins: Vec<Arc<dyn PlatformStartup>>,
}

impl PlatformStartupRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin.
    pub fn register<P: PlatformStartup + 'static>(&mut self, plugin: P) -> &mut Self {
        self.register_arc(Arc::new(plugin))
    }

    /// Append a shared plugin.
    pub fn register_arc(&mut self, plugin: Arc<dyn PlatformStartup>) -> &mut Self {
        tracing::debug!(plugin = plugin.name(), position = self.plugins.len(), "Plugin registered");
        self.plugins.push(plugin);
        self
    }

    /// Plugins in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PlatformStartup>> {
        self.plugins.iter()
    }

    /// Plugin names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl fmt::Debug for PlatformStartupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<P: PlatformStartup + 'static> FromIterator<P> for PlatformStartupRegistry {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut registry = Self::new();
        for plugin in iter {
            registry.register(plugin);
        }
        registry
    }
}
