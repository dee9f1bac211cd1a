//! TLS policy for broker connections.
//!
//! Certificate validation is strict by default. `RMQ:SSL:Trust` is the only
//! switch that relaxes it, and it tolerates exactly two error classes:
//! server name mismatch and chain validation failures. A missing server
//! certificate is never tolerated.

use crate::options::{RabbitMqOptions, RabbitMqSslOptions};
use std::fmt;
use std::ops::BitOr;
use transit_platform_core::control::BusError;

/// Certificate validation failures observed during a TLS handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SslPolicyErrors(u8);

impl SslPolicyErrors {
    /// No failures
    pub const NONE: Self = Self(0);
    /// The server presented no certificate
    pub const REMOTE_CERTIFICATE_NOT_AVAILABLE: Self = Self(0b001);
    /// The certificate does not match the expected server name
    pub const REMOTE_CERTIFICATE_NAME_MISMATCH: Self = Self(0b010);
    /// The certificate chain did not validate
    pub const REMOTE_CERTIFICATE_CHAIN_ERRORS: Self = Self(0b100);

    const NAMED: [(Self, &'static str); 3] = [
        (Self::REMOTE_CERTIFICATE_NOT_AVAILABLE, "RemoteCertificateNotAvailable"),
        (Self::REMOTE_CERTIFICATE_NAME_MISMATCH, "RemoteCertificateNameMismatch"),
        (Self::REMOTE_CERTIFICATE_CHAIN_ERRORS, "RemoteCertificateChainErrors"),
    ];

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether no failure is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every failure in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Failures in `self` that are not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for SslPolicyErrors {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SslPolicyErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(" | "))
    }
}

/// Resolved TLS settings for the broker connection.
#[derive(Clone, PartialEq, Eq)]
pub struct SslSettings {
    /// Expected certificate server name
    pub server_name: String,
    /// Client certificate path
    pub certificate_path: Option<String>,
    /// Client certificate passphrase
    pub certificate_passphrase: Option<String>,
    /// Authenticate with the client certificate
    pub use_certificate_as_authentication_identity: bool,
    allowed_policy_errors: SslPolicyErrors,
}

impl SslSettings {
    /// Resolve TLS settings. A blank server name falls back to the broker
    /// host; `trust` widens the allowed policy errors.
    #[must_use]
    pub fn from_options(options: &RabbitMqOptions, ssl: &RabbitMqSslOptions) -> Self {
        let mut settings = Self {
            server_name: ssl
                .server_name
                .clone()
                .unwrap_or_else(|| options.host.clone()),
            certificate_path: ssl.cert_path.clone(),
            certificate_passphrase: ssl.cert_passphrase.clone(),
            use_certificate_as_authentication_identity: ssl.cert_identity,
            allowed_policy_errors: SslPolicyErrors::NONE,
        };

        if ssl.trust {
            settings.allow_policy_errors(
                SslPolicyErrors::REMOTE_CERTIFICATE_NAME_MISMATCH
                    | SslPolicyErrors::REMOTE_CERTIFICATE_CHAIN_ERRORS,
            );
        }
        settings
    }

    /// Tolerate the given certificate validation failures.
    pub fn allow_policy_errors(&mut self, errors: SslPolicyErrors) {
        self.allowed_policy_errors = self.allowed_policy_errors | errors;
        tracing::warn!(
            server_name = %self.server_name,
            allowed = %self.allowed_policy_errors,
            "TLS certificate validation relaxed for broker connection"
        );
    }

    /// Failures this connection tolerates.
    #[must_use]
    pub const fn allowed_policy_errors(&self) -> SslPolicyErrors {
        self.allowed_policy_errors
    }

    /// Whether a handshake with the observed failures is acceptable.
    #[must_use]
    pub const fn accepts(&self, observed: SslPolicyErrors) -> bool {
        self.allowed_policy_errors.contains(observed)
    }

    /// Validate a handshake outcome.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Security`] naming every failure that is not
    /// tolerated.
    pub fn verify(&self, observed: SslPolicyErrors) -> Result<(), BusError> {
        if self.accepts(observed) {
            return Ok(());
        }
        let rejected = observed.difference(self.allowed_policy_errors);
        Err(BusError::Security(format!(
            "TLS certificate validation failed for '{}': {rejected}",
            self.server_name
        )))
    }
}

impl fmt::Debug for SslSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SslSettings")
            .field("server_name", &self.server_name)
            .field("certificate_path", &self.certificate_path)
            .field(
                "certificate_passphrase",
                &self.certificate_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "use_certificate_as_authentication_identity",
                &self.use_certificate_as_authentication_identity,
            )
            .field("allowed_policy_errors", &self.allowed_policy_errors)
            .finish()
    }
}
