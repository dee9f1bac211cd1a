//! Azure Service Bus transport for the transit platform.
//!
//! Binds the `ASB` section and builds a [`ServiceBusBusFactoryConfigurator`]
//! with the namespace credentials and, unless an external scheduler is
//! configured, the broker's scheduled-enqueue scheduler.
//!
//! ```toml
//! [ASB]
//! ConnectionString = "Endpoint=sb://orders.servicebus.windows.net/;SharedAccessKeyName=app;SharedAccessKey=..."
//!
//! # or
//! # Namespace = "orders"
//! # SharedAccessKeyName = "app"
//! # SharedAccessKey = "..."
//! ```

pub mod configurator;
pub mod connection;
pub mod factory;
pub mod options;

pub use configurator::ServiceBusBusFactoryConfigurator;
pub use connection::ServiceBusConnection;
pub use factory::ServiceBusStartupBusFactory;
pub use options::{ASB_SECTION, ServiceBusOptions};
