//! RabbitMQ startup bus factory.

use crate::configurator::{RabbitMqBusFactoryConfigurator, RabbitMqHostSettings};
use crate::options::{RabbitMqOptions, RabbitMqSslOptions};
use crate::ssl::SslSettings;
use transit_platform_core::bus::{BusRegistrationConfigurator, SchedulerProvider};
use transit_platform_core::config::Configuration;
use transit_platform_core::error::{BootstrapError, ConfigError};
use transit_platform_core::options::TransportKind;
use transit_platform_core::startup::{StartupBusConfigurator, StartupBusFactory};

/// Builds a RabbitMQ bus from the `RMQ` sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RabbitMqStartupBusFactory {
    options: RabbitMqOptions,
    ssl: RabbitMqSslOptions,
}

impl RabbitMqStartupBusFactory {
    /// Factory over already-bound options.
    #[must_use]
    pub const fn new(options: RabbitMqOptions, ssl: RabbitMqSslOptions) -> Self {
        Self { options, ssl }
    }

    /// Bind `RMQ` and `RMQ:SSL`. Absent sections yield defaults; nothing is
    /// validated until [`create_bus`](StartupBusFactory::create_bus).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if a value is malformed.
    pub fn configure(configuration: &Configuration) -> Result<Self, ConfigError> {
        Ok(Self::new(
            RabbitMqOptions::bind(configuration)?,
            RabbitMqSslOptions::bind(configuration)?,
        ))
    }

    /// Connection options.
    #[must_use]
    pub const fn options(&self) -> &RabbitMqOptions {
        &self.options
    }

    /// TLS options.
    #[must_use]
    pub const fn ssl_options(&self) -> &RabbitMqSslOptions {
        &self.ssl
    }

    fn host_settings(&self) -> Result<RabbitMqHostSettings, ConfigError> {
        self.options.validate()?;

        let ssl = if self.options.use_ssl {
            self.ssl.validate()?;
            Some(SslSettings::from_options(&self.options, &self.ssl))
        } else {
            None
        };

        Ok(RabbitMqHostSettings {
            host: self.options.host.clone(),
            port: self.options.port,
            virtual_host: self.options.vhost.clone(),
            username: self.options.user.clone(),
            password: self.options.pass.clone(),
            ssl,
        })
    }
}

impl StartupBusFactory for RabbitMqStartupBusFactory {
    fn transport(&self) -> TransportKind {
        TransportKind::RabbitMq
    }

    fn create_bus(
        &self,
        bus: &mut BusRegistrationConfigurator,
        configurator: &dyn StartupBusConfigurator,
    ) -> Result<(), BootstrapError> {
        let host = self.host_settings()?;

        if !configurator.has_scheduler_endpoint() {
            bus.add_message_scheduler(SchedulerProvider::DelayedExchange);
        }

        let mut cfg = RabbitMqBusFactoryConfigurator::new();
        cfg.host(host);

        if !configurator.try_configure_quartz(&mut cfg) {
            cfg.use_delayed_exchange_message_scheduler();
        }

        configurator.configure_bus(&mut cfg, &bus.registration_context())?;

        bus.using_transport(Box::new(cfg))
    }
}
