//! Typed options for the `RMQ` and `RMQ:SSL` configuration sections.

use serde::Deserialize;
use std::fmt;
use transit_platform_core::config::{Configuration, de};
use transit_platform_core::error::ConfigError;
use transit_platform_core::options::TransportKind;

/// Section holding [`RabbitMqOptions`].
pub const RMQ_SECTION: &str = "RMQ";

/// Section holding [`RabbitMqSslOptions`].
pub const RMQ_SSL_SECTION: &str = "RMQ:SSL";

/// Broker connection options.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RabbitMqOptions {
    /// Broker host name
    #[serde(deserialize_with = "de::string")]
    pub host: String,
    /// AMQP port
    #[serde(deserialize_with = "de::number")]
    pub port: u16,
    /// Virtual host
    #[serde(deserialize_with = "de::string")]
    pub vhost: String,
    /// User name
    #[serde(deserialize_with = "de::string")]
    pub user: String,
    /// Password
    #[serde(deserialize_with = "de::string")]
    pub pass: String,
    /// Connect over TLS using [`RabbitMqSslOptions`]
    #[serde(rename = "usessl", deserialize_with = "de::boolean")]
    pub use_ssl: bool,
}

impl Default for RabbitMqOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            vhost: "/".to_string(),
            user: "guest".to_string(),
            pass: "guest".to_string(),
            use_ssl: false,
        }
    }
}

impl fmt::Debug for RabbitMqOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMqOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("vhost", &self.vhost)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

impl RabbitMqOptions {
    /// Bind the `RMQ` section; an absent section yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if a value is malformed.
    pub fn bind(configuration: &Configuration) -> Result<Self, ConfigError> {
        configuration.bind(RMQ_SECTION)
    }

    /// Check the options can describe a connection.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTransportOptions`] naming the first
    /// problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(invalid("RMQ:Host must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("RMQ:Port must be greater than zero"));
        }
        if self.vhost.trim().is_empty() {
            return Err(invalid("RMQ:VHost must not be empty"));
        }
        Ok(())
    }
}

/// TLS options, only consulted when [`RabbitMqOptions::use_ssl`] is set.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RabbitMqSslOptions {
    /// Expected certificate server name; defaults to the broker host
    #[serde(rename = "servername", deserialize_with = "de::opt_string")]
    pub server_name: Option<String>,
    /// Client certificate path
    #[serde(rename = "certpath", deserialize_with = "de::opt_string")]
    pub cert_path: Option<String>,
    /// Client certificate passphrase
    #[serde(rename = "certpassphrase", deserialize_with = "de::opt_string")]
    pub cert_passphrase: Option<String>,
    /// Authenticate with the client certificate instead of user/password
    #[serde(rename = "certidentity", deserialize_with = "de::boolean")]
    pub cert_identity: bool,
    /// Tolerate certificate name mismatch and chain errors
    #[serde(deserialize_with = "de::boolean")]
    pub trust: bool,
}

impl fmt::Debug for RabbitMqSslOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMqSslOptions")
            .field("server_name", &self.server_name)
            .field("cert_path", &self.cert_path)
            .field(
                "cert_passphrase",
                &self.cert_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field("cert_identity", &self.cert_identity)
            .field("trust", &self.trust)
            .finish()
    }
}

impl RabbitMqSslOptions {
    /// Bind the `RMQ:SSL` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if a value is malformed.
    pub fn bind(configuration: &Configuration) -> Result<Self, ConfigError> {
        configuration.bind(RMQ_SSL_SECTION)
    }

    /// Check the TLS options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTransportOptions`] if certificate
    /// identity is requested without a certificate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cert_identity && self.cert_path.is_none() {
            return Err(invalid(
                "RMQ:SSL:CertIdentity requires RMQ:SSL:CertPath",
            ));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::InvalidTransportOptions {
        transport: TransportKind::RabbitMq,
        reason: reason.to_string(),
    }
}
