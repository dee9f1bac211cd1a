//! Running-bus contracts.
//!
//! The bootstrap core never talks to a broker itself. Once the topology is
//! assembled it hands the [`BusTopology`] to a [`TransportRuntime`], which
//! connects, declares endpoints, and returns a [`BusControl`] handle. Broker
//! runtimes live outside this workspace and are supplied by the host; the
//! in-process Mediator runtime ships with `transit-platform-runtime`.
//!
//! # Dyn Compatibility
//!
//! Both traits return `Pin<Box<dyn Future>>` instead of using `async fn`, so
//! the host can hold them as `Arc<dyn TransportRuntime>` and
//! `Arc<dyn BusControl>`.

use crate::bus::{BusTopology, Envelope};
use crate::options::TransportKind;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a transport runtime or a running bus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The broker could not be reached or refused the connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS handshake or authentication failure.
    #[error("Security error: {0}")]
    Security(String),

    /// The bus did not finish starting in time.
    #[error("Bus did not start within {0:?}")]
    StartTimeout(Duration),

    /// The bus is not running.
    #[error("Bus is not started")]
    NotStarted,

    /// No consumer or saga is registered for the message type.
    #[error("No consumer registered for message type '{0}'")]
    NoConsumer(String),

    /// A handler failed to process a message.
    #[error("Dispatch of '{message_type}' failed: {reason}")]
    Dispatch {
        /// Message type being dispatched
        message_type: String,
        /// Handler failure
        reason: String,
    },

    /// Generic error for other failures
    #[error("Bus error: {0}")]
    Other(String),
}

/// Health of a running bus as reported by its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusHealthStatus {
    /// Connected and consuming
    Healthy,
    /// Running with reduced capacity (e.g. some endpoints faulted)
    Degraded,
    /// Not connected or stopped
    Unhealthy,
}

/// Bus health snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusHealth {
    /// Overall bus status
    pub status: BusHealthStatus,
    /// Human-readable detail
    pub description: String,
    /// Receive endpoints the bus is consuming from
    pub endpoints: Vec<String>,
}

impl BusHealth {
    /// Healthy snapshot with the given endpoints.
    #[must_use]
    pub fn healthy(description: impl Into<String>, endpoints: Vec<String>) -> Self {
        Self {
            status: BusHealthStatus::Healthy,
            description: description.into(),
            endpoints,
        }
    }

    /// Unhealthy snapshot.
    #[must_use]
    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: BusHealthStatus::Unhealthy,
            description: description.into(),
            endpoints: Vec::new(),
        }
    }
}

/// Handle to a started bus.
pub trait BusControl: Send + Sync {
    /// Transport this bus runs on.
    fn transport(&self) -> TransportKind;

    /// Current health snapshot.
    fn health(&self) -> BusHealth;

    /// Send a message into the bus.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotStarted`] once the bus is stopped, or a
    /// dispatch/transport error from the runtime.
    fn send(&self, envelope: Envelope) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>>;

    /// Stop consuming and release transport resources.
    ///
    /// # Errors
    ///
    /// Returns a transport error if shutdown fails.
    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>>;
}

/// Starts a bus from an assembled topology.
pub trait TransportRuntime: Send + Sync {
    /// Connect and start consuming.
    ///
    /// The returned future is the only network-bound step of bootstrap; the
    /// orchestrator bounds it with a timeout and never retries it.
    ///
    /// # Errors
    ///
    /// Connection and security failures are returned unmodified.
    #[allow(clippy::type_complexity)]
    fn start(
        &self,
        topology: BusTopology,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BusControl>, BusError>> + Send + '_>>;
}
