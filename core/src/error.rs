//! Error taxonomy for platform bootstrap.
//!
//! Everything here is fail-fast: configuration errors abort before any
//! connection is attempted, bus errors are surfaced from the transport
//! runtime unmodified, and plugin failures abort the fold they occur in.

use crate::control::BusError;
use crate::options::TransportKind;
use std::fmt;
use thiserror::Error;

/// Errors raised while reading or binding configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration source could not be read.
    #[error("Failed to read configuration from '{path}': {reason}")]
    Io {
        /// Path of the source that failed
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// The configuration source is not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A section could not be bound to its typed options record.
    #[error("Failed to bind configuration section '{section}': {reason}")]
    Bind {
        /// Section path (e.g. `RMQ:SSL`)
        section: String,
        /// Deserialization failure
        reason: String,
    },

    /// `Platform:Transport` is missing or blank.
    #[error("Transport is not configured: set Platform:Transport to one of RabbitMq, RMQ, AzureServiceBus, ASB, Mediator")]
    MissingTransport,

    /// `Platform:Transport` names a transport this platform does not know.
    #[error("Unknown transport type: {0}")]
    UnknownTransport(String),

    /// Transport connection options are malformed.
    #[error("Invalid {transport} options: {reason}")]
    InvalidTransportOptions {
        /// Transport whose options failed validation
        transport: TransportKind,
        /// What is wrong with them
        reason: String,
    },

    /// A value outside the transport sections is malformed.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Configuration key
        key: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Stage of a plugin contribution, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionStage {
    /// Registering consumers, sagas, activities, and request clients
    BusTopology,
    /// Bus-level configuration against the transport-native configurator
    BusConfiguration,
    /// HTTP pipeline configuration
    HttpPipeline,
}

impl ContributionStage {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BusTopology => "bus_topology",
            Self::BusConfiguration => "bus_configuration",
            Self::HttpPipeline => "http_pipeline",
        }
    }
}

impl fmt::Display for ContributionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort platform startup.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration could not be bound or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport runtime failed to start the bus.
    #[error("Bus failed to start: {0}")]
    BusStart(#[from] BusError),

    /// A plugin contribution failed.
    #[error("Plugin '{plugin}' failed during {stage}: {source}")]
    Contribution {
        /// Plugin name
        plugin: String,
        /// Which fold it failed in
        stage: ContributionStage,
        /// The plugin's error
        #[source]
        source: anyhow::Error,
    },

    /// A bootstrap step ran out of order.
    #[error("Bootstrap step '{step}' requires phase {expected}, but bootstrap is in phase {actual}")]
    InvalidPhase {
        /// Step that was attempted
        step: &'static str,
        /// Phase the step requires
        expected: String,
        /// Phase the bootstrap was actually in
        actual: String,
    },

    /// A broker transport was selected but the host supplied no runtime for it.
    #[error("No transport runtime registered for {0}")]
    NoTransportRuntime(TransportKind),

    /// A second transport was configured on the same bus.
    #[error("A transport is already configured for this bus ({0})")]
    TransportAlreadyConfigured(TransportKind),

    /// The HTTP listener could not be bound or served.
    #[error("HTTP host error: {0}")]
    Http(String),
}

impl BootstrapError {
    /// Wrap a plugin failure with the plugin name and stage.
    #[must_use]
    pub fn contribution(
        plugin: impl Into<String>,
        stage: ContributionStage,
        source: anyhow::Error,
    ) -> Self {
        Self::Contribution {
            plugin: plugin.into(),
            stage,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_transport_names_value() {
        let err = ConfigError::UnknownTransport("Kafka".to_string());
        assert_eq!(err.to_string(), "Unknown transport type: Kafka");
    }

    #[test]
    fn test_contribution_error_carries_plugin_and_stage() {
        let err = BootstrapError::contribution(
            "orders",
            ContributionStage::HttpPipeline,
            anyhow::anyhow!("route clash"),
        );
        assert_eq!(
            err.to_string(),
            "Plugin 'orders' failed during http_pipeline: route clash"
        );
    }
}
