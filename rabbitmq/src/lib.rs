//! RabbitMQ transport for the transit platform.
//!
//! Binds the `RMQ` and `RMQ:SSL` sections and builds a
//! [`RabbitMqBusFactoryConfigurator`]: broker host, credentials, TLS policy,
//! and the delayed-exchange scheduler when no external scheduler is
//! configured. The AMQP client itself is supplied by the host as a
//! [`TransportRuntime`](transit_platform_core::control::TransportRuntime).
//!
//! # Configuration
//!
//! ```toml
//! [RMQ]
//! Host = "rabbit.internal"
//! Port = 5671
//! VHost = "orders"
//! User = "orders-service"
//! Pass = "..."
//! UseSsl = true
//!
//! [RMQ.SSL]
//! ServerName = "rabbit.example.com"
//! CertPath = "/etc/certs/client.p12"
//! CertPassphrase = "..."
//! CertIdentity = false
//! Trust = false
//! ```
//!
//! # Example
//!
//! ```ignore
//! use transit_platform_rabbitmq::RabbitMqStartupBusFactory;
//!
//! let factory = RabbitMqStartupBusFactory::configure(&configuration)?;
//! factory.create_bus(&mut bus, &startup_configurator)?;
//! ```

pub mod configurator;
pub mod factory;
pub mod options;
pub mod ssl;

pub use configurator::{RabbitMqBusFactoryConfigurator, RabbitMqHostSettings};
pub use factory::RabbitMqStartupBusFactory;
pub use options::{RMQ_SECTION, RMQ_SSL_SECTION, RabbitMqOptions, RabbitMqSslOptions};
pub use ssl::{SslPolicyErrors, SslSettings};
