//! # Transit Platform Core
//!
//! Configuration, bus registration model, and transport contracts for
//! bootstrapping a message-bus-backed service.
//!
//! This crate owns everything the bootstrap decides before a single network
//! connection is made: which transport to use, how the scheduler is wired,
//! which consumers, sagas, and activities the bus serves, and how saga
//! persistence is configured. Transport crates implement the contracts in
//! [`transport`] and [`startup`]; the host crate drives them.
//!
//! ## Core Concepts
//!
//! - **Configuration**: hierarchical, case-insensitive key/value tree bound
//!   once at startup ([`config`])
//! - **Transport selection**: `Platform:Transport` normalized into
//!   [`TransportKind`] at the binding boundary ([`options`])
//! - **Registration**: plugins contribute handlers into a
//!   [`BusRegistrationConfigurator`] ([`bus`])
//! - **Bus factories**: one per transport, each building a
//!   [`BusFactoryConfigurator`] ([`startup`], [`transport`])
//! - **Running bus**: a [`TransportRuntime`] turns a finished
//!   [`BusTopology`] into a [`BusControl`] ([`control`])
//!
//! ## Control Flow
//!
//! ```text
//! configuration → transport selection → factory builds native config
//!   → scheduler decision → plugin contributions → bus started
//! ```

pub mod bus;
pub mod config;
pub mod control;
pub mod endpoint_name;
pub mod environment;
pub mod error;
pub mod options;
pub mod retry;
pub mod saga;
pub mod startup;
pub mod transport;

pub use bus::{
    BusRegistrationConfigurator, BusRegistrationContext, BusTopology, Consumer, Envelope,
    HandlerRegistration, RegistrationKind, RequestClientDefinition, SagaRepository,
    SchedulerProvider, consumer_fn,
};
pub use config::Configuration;
pub use control::{BusControl, BusError, BusHealth, BusHealthStatus, TransportRuntime};
pub use endpoint_name::EndpointNameFormatter;
pub use environment::{Environment, HostEnvironment};
pub use error::{BootstrapError, ConfigError, ContributionStage};
pub use options::{PlatformOptions, TransportKind};
pub use retry::RetryPolicy;
pub use saga::{DocumentStoreOptions, RelationalStoreOptions, SagaDbConfigs};
pub use startup::{StartupBusConfigurator, StartupBusFactory};
pub use transport::{BusFactoryConfigurator, BusFactorySettings, ReceiveEndpointDefinition};
