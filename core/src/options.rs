//! Platform options bound from the `Platform` section.
//!
//! Transport selection is normalized at this boundary: the configured
//! string is lower-cased and mapped onto [`TransportKind`] here, so the
//! orchestrator's dispatch is an exhaustive `match` over the enum and an
//! unmapped value never gets past binding.

use crate::config::{Configuration, de};
use crate::environment::Environment;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configuration section holding [`PlatformOptions`].
pub const PLATFORM_SECTION: &str = "Platform";

/// The wire transport the bus runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// AMQP via RabbitMQ (`RabbitMq`, `RMQ`)
    RabbitMq,
    /// Azure Service Bus (`AzureServiceBus`, `ASB`)
    AzureServiceBus,
    /// No transport; consumers are invoked in-process (`Mediator`)
    Mediator,
}

impl TransportKind {
    /// Long RabbitMQ identifier (lower-cased).
    pub const RABBIT_MQ: &'static str = "rabbitmq";
    /// Short RabbitMQ identifier (lower-cased).
    pub const RMQ: &'static str = "rmq";
    /// Long Service Bus identifier (lower-cased).
    pub const AZURE_SERVICE_BUS: &'static str = "azureservicebus";
    /// Short Service Bus identifier (lower-cased).
    pub const ASB: &'static str = "asb";
    /// Mediator identifier (lower-cased).
    pub const MEDIATOR: &'static str = "mediator";

    /// Every transport, in declaration order.
    pub const ALL: [Self; 3] = [Self::RabbitMq, Self::AzureServiceBus, Self::Mediator];

    /// Canonical display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RabbitMq => "RabbitMq",
            Self::AzureServiceBus => "AzureServiceBus",
            Self::Mediator => "Mediator",
        }
    }

    /// Whether this transport connects to an external broker.
    #[must_use]
    pub const fn is_broker(self) -> bool {
        !matches!(self, Self::Mediator)
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            Self::RABBIT_MQ | Self::RMQ => Ok(Self::RabbitMq),
            Self::AZURE_SERVICE_BUS | Self::ASB => Ok(Self::AzureServiceBus),
            Self::MEDIATOR => Ok(Self::Mediator),
            "" => Err(ConfigError::MissingTransport),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw `Platform.Retry` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RetrySection {
    #[serde(deserialize_with = "de::number")]
    limit: usize,
    #[serde(rename = "initialintervalms", deserialize_with = "de::opt_number")]
    initial_interval_ms: Option<u64>,
    #[serde(rename = "maxintervalms", deserialize_with = "de::opt_number")]
    max_interval_ms: Option<u64>,
    #[serde(deserialize_with = "de::opt_number")]
    multiplier: Option<f64>,
}

impl RetrySection {
    fn into_policy(self) -> Option<RetryPolicy> {
        if self.limit == 0 {
            return None;
        }
        let mut builder = RetryPolicy::builder().max_retries(self.limit);
        if let Some(ms) = self.initial_interval_ms {
            builder = builder.initial_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_interval_ms {
            builder = builder.max_delay(Duration::from_millis(ms));
        }
        if let Some(multiplier) = self.multiplier {
            builder = builder.multiplier(multiplier);
        }
        Some(builder.build())
    }
}

/// Raw `Platform` section, before transport normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PlatformSection {
    #[serde(deserialize_with = "de::opt_string")]
    transport: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    scheduler: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    prometheus: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    environment: Option<String>,
    #[serde(rename = "prefetchcount", deserialize_with = "de::opt_number")]
    prefetch_count: Option<u16>,
    #[serde(rename = "busstarttimeoutseconds", deserialize_with = "de::opt_number")]
    bus_start_timeout_seconds: Option<u64>,
    retry: RetrySection,
}

/// Resolved platform options. Immutable once bound.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformOptions {
    /// Selected transport
    pub transport: TransportKind,
    /// External scheduler queue, if one is configured
    pub scheduler: Option<String>,
    /// Service name for the Prometheus exporter; `None` disables `/metrics`
    pub prometheus: Option<String>,
    /// Host environment handed to HTTP contributions
    pub environment: Environment,
    /// Generic retry policy applied to receive endpoints
    pub retry: Option<RetryPolicy>,
    /// Prefetch count applied to the bus
    pub prefetch_count: Option<u16>,
    /// How long the bus start may take before startup is aborted
    pub bus_start_timeout: Duration,
}

impl PlatformOptions {
    /// Default bus start timeout.
    pub const DEFAULT_BUS_START_TIMEOUT: Duration = Duration::from_secs(60);

    /// Options for the given transport with every other setting defaulted.
    #[must_use]
    pub const fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            scheduler: None,
            prometheus: None,
            environment: Environment::Production,
            retry: None,
            prefetch_count: None,
            bus_start_timeout: Self::DEFAULT_BUS_START_TIMEOUT,
        }
    }

    /// Bind and normalize the `Platform` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTransport`] if no transport is set,
    /// [`ConfigError::UnknownTransport`] if the transport is not recognized,
    /// or a bind/validation error for malformed values.
    pub fn bind(configuration: &Configuration) -> Result<Self, ConfigError> {
        let section: PlatformSection = configuration.bind(PLATFORM_SECTION)?;

        let transport = section
            .transport
            .as_deref()
            .ok_or(ConfigError::MissingTransport)?
            .parse::<TransportKind>()?;

        let environment = section
            .environment
            .as_deref()
            .map(Environment::from_str)
            .transpose()?
            .unwrap_or(Environment::Production);

        let bus_start_timeout = match section.bus_start_timeout_seconds {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "Platform:BusStartTimeoutSeconds".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => Self::DEFAULT_BUS_START_TIMEOUT,
        };

        Ok(Self {
            transport,
            scheduler: section.scheduler,
            prometheus: section.prometheus,
            environment,
            retry: section.retry.into_policy(),
            prefetch_count: section.prefetch_count,
            bus_start_timeout,
        })
    }

    /// Whether an external scheduler endpoint is configured.
    #[must_use]
    pub const fn has_scheduler_endpoint(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Set the external scheduler queue.
    #[must_use]
    pub fn with_scheduler(mut self, queue: impl Into<String>) -> Self {
        self.scheduler = Some(queue.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn platform(pairs: &[(&str, &str)]) -> Result<PlatformOptions, ConfigError> {
        let config = pairs
            .iter()
            .fold(Configuration::new(), |c, (k, v)| c.with_value(k, *v));
        PlatformOptions::bind(&config)
    }

    #[test]
    fn test_recognized_spellings() {
        for (raw, expected) in [
            ("RabbitMq", TransportKind::RabbitMq),
            ("RMQ", TransportKind::RabbitMq),
            ("AzureServiceBus", TransportKind::AzureServiceBus),
            ("ASB", TransportKind::AzureServiceBus),
            ("Mediator", TransportKind::Mediator),
        ] {
            assert_eq!(raw.parse::<TransportKind>().unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn test_unknown_transport_is_rejected_with_value() {
        let err = platform(&[("Platform:Transport", "Kafka")]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownTransport("Kafka".to_string()));
    }

    #[test]
    fn test_missing_transport_is_rejected() {
        assert_eq!(platform(&[]).unwrap_err(), ConfigError::MissingTransport);
        assert_eq!(
            platform(&[("Platform:Transport", "  ")]).unwrap_err(),
            ConfigError::MissingTransport
        );
    }

    #[test]
    fn test_scheduler_endpoint_detection() {
        let without = platform(&[("Platform:Transport", "rmq")]).unwrap();
        assert!(!without.has_scheduler_endpoint());

        let blank = platform(&[("Platform:Transport", "rmq"), ("Platform:Scheduler", " ")]).unwrap();
        assert!(!blank.has_scheduler_endpoint());

        let with = platform(&[("Platform:Transport", "rmq"), ("Platform:Scheduler", "quartz")]).unwrap();
        assert!(with.has_scheduler_endpoint());
        assert_eq!(with.scheduler.as_deref(), Some("quartz"));
    }

    #[test]
    fn test_retry_section_builds_policy() {
        let options = platform(&[
            ("Platform:Transport", "mediator"),
            ("Platform:Retry:Limit", "4"),
            ("Platform:Retry:InitialIntervalMs", "250"),
        ])
        .unwrap();

        let retry = options.retry.unwrap();
        assert_eq!(retry.max_retries, 4);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_retry_limit_disables_policy() {
        let options = platform(&[("Platform:Transport", "asb"), ("Platform:Retry:Limit", "0")]).unwrap();
        assert!(options.retry.is_none());
    }

    #[test]
    fn test_zero_start_timeout_is_invalid() {
        let err = platform(&[
            ("Platform:Transport", "asb"),
            ("Platform:BusStartTimeoutSeconds", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    proptest! {
        #[test]
        fn prop_transport_parsing_ignores_case(
            (raw, expected) in prop::sample::select(vec![
                ("rabbitmq", TransportKind::RabbitMq),
                ("rmq", TransportKind::RabbitMq),
                ("azureservicebus", TransportKind::AzureServiceBus),
                ("asb", TransportKind::AzureServiceBus),
                ("mediator", TransportKind::Mediator),
            ]),
            mask in prop::collection::vec(any::<bool>(), 16),
        ) {
            let mixed: String = raw
                .chars()
                .zip(mask.iter().cycle())
                .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
                .collect();
            prop_assert_eq!(mixed.parse::<TransportKind>().unwrap(), expected);
        }

        #[test]
        fn prop_unrecognized_identifiers_are_rejected(raw in "[a-zA-Z]{1,16}") {
            let known = ["rabbitmq", "rmq", "azureservicebus", "asb", "mediator"];
            prop_assume!(!known.contains(&raw.to_lowercase().as_str()));
            let is_unknown = matches!(
                raw.parse::<TransportKind>(),
                Err(ConfigError::UnknownTransport(_))
            );
            prop_assert!(is_unknown);
        }
    }
}
