//! # Transit Platform Runtime
//!
//! Process-side machinery the bootstrap hands off to once the bus topology
//! is built.
//!
//! ## Core Components
//!
//! - **Health**: named, tagged checks evaluated concurrently into a report
//! - **Mediator**: the in-process bus used when `Platform:Transport` is `Mediator`
//! - **Metrics**: Prometheus recorder and the bootstrap/mediator series
//!
//! ## Example
//!
//! ```ignore
//! use transit_platform_runtime::mediator::MediatorRuntime;
//! use transit_platform_core::control::TransportRuntime;
//!
//! let bus = MediatorRuntime::new().start(topology).await?;
//! bus.send(Envelope::new("SubmitOrder", payload)).await?;
//! ```

/// Health checks and their evaluation
pub mod health;

/// In-process bus for the Mediator transport
pub mod mediator;

/// Prometheus metrics for observability
pub mod metrics;

pub use health::{
    BusHealthCheck, HealthCheck, HealthCheckRegistration, HealthCheckRegistry, HealthCheckResult,
    HealthCheckService, HealthReport, HealthReportEntry, HealthStatus, READY_TAG,
};
pub use mediator::{InProcessBus, MediatorRuntime};
