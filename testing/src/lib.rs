//! # Transit Platform Testing
//!
//! Test doubles for the transit platform.
//!
//! This crate provides:
//! - [`MockStartupBusConfigurator`] for driving transport factories in isolation
//! - [`RecordingBusFactory`] and [`RecordingTransportRuntime`] for bootstrap
//!   tests that never touch a broker
//! - [`RecordingPlugin`] and [`CallLog`] for asserting plugin call order
//! - Configuration and HTTP helpers
//!
//! ## Example
//!
//! ```ignore
//! use transit_platform_testing::{CallLog, RecordingPlugin, mediator_configuration};
//!
//! #[tokio::test]
//! async fn test_mediator_boots() {
//!     let log = CallLog::new();
//!     let ready = Bootstrap::new(mediator_configuration())
//!         .plugin(RecordingPlugin::new("orders", log.clone()))
//!         .run()
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(log.entries(), ["orders:bus_topology", "orders:http_pipeline"]);
//! }
//! ```

/// Mock collaborators.
pub mod mocks;

/// Recording plugins.
pub mod plugins;

/// Test helpers.
pub mod helpers;

pub use helpers::{configuration, get, init_test_tracing, mediator_configuration};
pub use mocks::{
    MockStartupBusConfigurator, RecordingBusFactory, RecordingTransportRuntime, StartedTopology,
    StaticBusControl, StaticHealthCheck, TestBusFactoryConfigurator, native_scheduler,
};
pub use plugins::{CallLog, RecordingPlugin};
