//! RabbitMQ-native bus configuration.

use crate::ssl::SslSettings;
use std::any::Any;
use std::fmt;
use transit_platform_core::bus::SchedulerProvider;
use transit_platform_core::options::TransportKind;
use transit_platform_core::transport::{BusFactoryConfigurator, BusFactorySettings};

/// Broker host settings.
#[derive(Clone, PartialEq, Eq)]
pub struct RabbitMqHostSettings {
    /// Broker host name
    pub host: String,
    /// AMQP port
    pub port: u16,
    /// Virtual host
    pub virtual_host: String,
    /// User name
    pub username: String,
    /// Password
    pub password: String,
    /// TLS settings; `None` for plain AMQP
    pub ssl: Option<SslSettings>,
}

impl RabbitMqHostSettings {
    /// Broker address, e.g. `rabbitmqs://rabbit.internal:5671/orders`.
    #[must_use]
    pub fn host_address(&self) -> String {
        let scheme = if self.ssl.is_some() { "rabbitmqs" } else { "rabbitmq" };
        let vhost = self.virtual_host.trim_start_matches('/');
        format!("{scheme}://{}:{}/{vhost}", self.host, self.port)
    }
}

impl fmt::Debug for RabbitMqHostSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMqHostSettings")
            .field("address", &self.host_address())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// RabbitMQ bus configurator built by
/// [`RabbitMqStartupBusFactory`](crate::RabbitMqStartupBusFactory).
#[derive(Debug, Default)]
pub struct RabbitMqBusFactoryConfigurator {
    host: Option<RabbitMqHostSettings>,
    settings: BusFactorySettings,
}

impl RabbitMqBusFactoryConfigurator {
    /// Empty configurator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the broker host.
    pub fn host(&mut self, host: RabbitMqHostSettings) {
        tracing::debug!(address = %host.host_address(), ssl = host.ssl.is_some(), "RabbitMQ host configured");
        self.host = Some(host);
    }

    /// Configured broker host.
    #[must_use]
    pub const fn host_settings(&self) -> Option<&RabbitMqHostSettings> {
        self.host.as_ref()
    }

    /// Schedule through the broker's delayed-exchange plugin.
    pub fn use_delayed_exchange_message_scheduler(&mut self) {
        tracing::info!("Configuring RabbitMQ message scheduler (delayed exchange)");
        self.settings.set_scheduler(SchedulerProvider::DelayedExchange);
    }
}

impl BusFactoryConfigurator for RabbitMqBusFactoryConfigurator {
    fn transport(&self) -> TransportKind {
        TransportKind::RabbitMq
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

#[cfg(test)]
mod tests {
    use super::*;

    fn host(virtual_host: &str) -> RabbitMqHostSettings {
        RabbitMqHostSettings {
            host: "rabbit.internal".to_string(),
            port: 5672,
            virtual_host: virtual_host.to_string(),
            username: "guest".to_string(),
            password: "guest".to_string(),
            ssl: None,
        }
    }

    #[test]
    fn test_host_address() {
        assert_eq!(host("/").host_address(), "rabbitmq://rabbit.internal:5672/");
        assert_eq!(
            host("orders").host_address(),
            "rabbitmq://rabbit.internal:5672/orders"
        );
    }

    #[test]
    fn test_delayed_exchange_occupies_scheduler_slot() {
        let mut cfg = RabbitMqBusFactoryConfigurator::new();
        cfg.use_delayed_exchange_message_scheduler();
        assert_eq!(
            cfg.settings().scheduler(),
            Some(&SchedulerProvider::DelayedExchange)
        );
    }
}
