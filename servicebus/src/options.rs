//! Typed options for the `ASB` configuration section.

use crate::connection::{ServiceBusConnection, invalid};
use serde::Deserialize;
use std::fmt;
use transit_platform_core::config::{Configuration, de};
use transit_platform_core::error::ConfigError;

/// Section holding [`ServiceBusOptions`].
pub const ASB_SECTION: &str = "ASB";

/// Service Bus namespace options.
///
/// Either `ConnectionString`, or `Namespace` together with
/// `SharedAccessKeyName` and `SharedAccessKey`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceBusOptions {
    /// Namespace connection string
    #[serde(rename = "connectionstring", deserialize_with = "de::opt_string")]
    pub connection_string: Option<String>,
    /// Namespace name or host
    #[serde(deserialize_with = "de::opt_string")]
    pub namespace: Option<String>,
    /// Shared access policy name
    #[serde(rename = "sharedaccesskeyname", deserialize_with = "de::opt_string")]
    pub shared_access_key_name: Option<String>,
    /// Shared access key
    #[serde(rename = "sharedaccesskey", deserialize_with = "de::opt_string")]
    pub shared_access_key: Option<String>,
}

impl fmt::Debug for ServiceBusOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBusOptions")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("namespace", &self.namespace)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field(
                "shared_access_key",
                &self.shared_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ServiceBusOptions {
    /// Options holding a connection string.
    #[must_use]
    pub fn with_connection_string(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
            ..Self::default()
        }
    }

    /// Bind the `ASB` section; an absent section yields empty options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if a value is malformed.
    pub fn bind(configuration: &Configuration) -> Result<Self, ConfigError> {
        configuration.bind(ASB_SECTION)
    }

    /// Resolve the namespace credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTransportOptions`] when neither form is
    /// configured, when both are, or when the configured form is malformed.
    pub fn connection(&self) -> Result<ServiceBusConnection, ConfigError> {
        match (&self.connection_string, &self.namespace) {
            (Some(_), Some(_)) => Err(invalid(
                "set either ASB:ConnectionString or ASB:Namespace, not both",
            )),
            (Some(connection_string), None) => connection_string.parse(),
            (None, Some(namespace)) => {
                let key_name = self.shared_access_key_name.as_deref().ok_or_else(|| {
                    invalid("ASB:Namespace requires ASB:SharedAccessKeyName")
                })?;
                let key = self
                    .shared_access_key
                    .as_deref()
                    .ok_or_else(|| invalid("ASB:Namespace requires ASB:SharedAccessKey"))?;
                ServiceBusConnection::from_parts(namespace, key_name, key)
            }
            (None, None) => Err(invalid(
                "ASB:ConnectionString or ASB:Namespace must be set",
            )),
        }
    }
}
