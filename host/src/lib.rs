//! # Transit Platform Host
//!
//! Assembles a message-bus service from configuration and plugins.
//!
//! ## Core Components
//!
//! - **[`PlatformStartup`]**: the plugin contract; plugins contribute bus
//!   topology, bus-level settings, and HTTP routes
//! - **[`Bootstrap`]**: the orchestrator that binds options, folds plugin
//!   contributions, selects one transport factory, starts the bus, and
//!   mounts the health endpoints
//! - **[`PlatformStartupBusConfigurator`]**: the transport-agnostic half of
//!   bus construction (external scheduler, retry, prefetch, endpoints)
//! - **[`PlatformHost`]**: serves the finished router and stops the bus on
//!   shutdown
//!
//! ## Example
//!
//! ```ignore
//! use transit_platform_host::{Bootstrap, PlatformHost, ServerOptions, telemetry};
//!
//! telemetry::init_tracing(telemetry::DEFAULT_FILTER)?;
//! let configuration = Configuration::load()?;
//! let server = ServerOptions::bind(&configuration)?;
//!
//! let ready = Bootstrap::new(configuration)
//!     .plugin(OrdersStartup)
//!     .run()
//!     .await?;
//! PlatformHost::new(ready, server).run().await?;
//! ```

pub mod bootstrap;
pub mod configurator;
pub mod plugin;
pub mod server;
pub mod services;
pub mod telemetry;

pub use bootstrap::{Bootstrap, BootstrapPhase, ReadyPlatform};
pub use configurator::PlatformStartupBusConfigurator;
pub use plugin::{HttpPipelineContext, PlatformStartup, PlatformStartupRegistry};
pub use server::{PlatformHost, ServerOptions};
pub use services::PlatformServices;
