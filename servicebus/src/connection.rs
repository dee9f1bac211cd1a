//! Service Bus connection credentials.
//!
//! Accepts a connection string
//! (`Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=...;SharedAccessKey=...`)
//! with case-insensitive keys, or the three parts separately. `EntityPath`
//! is rejected: the bus declares its own queues and topics, so a
//! connection scoped to one entity cannot serve it.

use std::fmt;
use std::str::FromStr;
use transit_platform_core::error::ConfigError;
use transit_platform_core::options::TransportKind;

const DEFAULT_NAMESPACE_SUFFIX: &str = ".servicebus.windows.net";
const SCHEME: &str = "sb://";

/// Resolved Service Bus credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceBusConnection {
    endpoint: String,
    shared_access_key_name: String,
    shared_access_key: String,
}

impl ServiceBusConnection {
    /// Credentials from a namespace and a shared access key.
    ///
    /// A bare namespace (`orders-prod`) expands to
    /// `sb://orders-prod.servicebus.windows.net/`; a fully qualified host or
    /// an `sb://` address is used as given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTransportOptions`] if any part is blank.
    pub fn from_parts(
        namespace: &str,
        shared_access_key_name: &str,
        shared_access_key: &str,
    ) -> Result<Self, ConfigError> {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return Err(invalid("ASB:Namespace must not be empty"));
        }
        let endpoint = if has_scheme(namespace) {
            namespace.to_string()
        } else if namespace.contains('.') {
            format!("{SCHEME}{namespace}")
        } else {
            format!("{SCHEME}{namespace}{DEFAULT_NAMESPACE_SUFFIX}")
        };
        Self::new(endpoint, shared_access_key_name, shared_access_key)
    }

    fn new(endpoint: String, key_name: &str, key: &str) -> Result<Self, ConfigError> {
        if !has_scheme(&endpoint) || endpoint.len() == SCHEME.len() {
            return Err(invalid(&format!(
                "Endpoint '{endpoint}' must be an sb:// address"
            )));
        }
        if key_name.trim().is_empty() {
            return Err(invalid("SharedAccessKeyName must not be empty"));
        }
        if key.trim().is_empty() {
            return Err(invalid("SharedAccessKey must not be empty"));
        }
        let endpoint = if endpoint.ends_with('/') {
            endpoint
        } else {
            format!("{endpoint}/")
        };
        Ok(Self {
            endpoint,
            shared_access_key_name: key_name.trim().to_string(),
            shared_access_key: key.trim().to_string(),
        })
    }

    /// Namespace address, always ending in `/`.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fully qualified namespace host.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.endpoint
            .get(SCHEME.len()..)
            .unwrap_or_default()
            .trim_end_matches('/')
    }

    /// Shared access policy name.
    #[must_use]
    pub fn shared_access_key_name(&self) -> &str {
        &self.shared_access_key_name
    }

    /// Shared access key.
    #[must_use]
    pub fn shared_access_key(&self) -> &str {
        &self.shared_access_key
    }
}

impl FromStr for ServiceBusConnection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;

        for segment in s.split(';').map(str::trim).filter(|seg| !seg.is_empty()) {
            let (name, value) = segment.split_once('=').ok_or_else(|| {
                invalid(&format!(
                    "connection string segment '{}' is not a key=value pair",
                    redact_segment(segment)
                ))
            })?;
            let value = value.trim().to_string();
            match name.trim().to_lowercase().as_str() {
                "endpoint" => endpoint = Some(value),
                "sharedaccesskeyname" => key_name = Some(value),
                "sharedaccesskey" => key = Some(value),
                "entitypath" => {
                    return Err(invalid(
                        "connection string must not contain EntityPath; use a namespace-level connection string",
                    ));
                }
                other => {
                    return Err(invalid(&format!(
                        "unsupported connection string key '{other}'"
                    )));
                }
            }
        }

        let endpoint = endpoint.ok_or_else(|| invalid("connection string is missing Endpoint"))?;
        let key_name =
            key_name.ok_or_else(|| invalid("connection string is missing SharedAccessKeyName"))?;
        let key = key.ok_or_else(|| invalid("connection string is missing SharedAccessKey"))?;

        Self::new(endpoint, &key_name, &key)
    }
}

impl fmt::Debug for ServiceBusConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBusConnection")
            .field("endpoint", &self.endpoint)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field("shared_access_key", &"<redacted>")
            .finish()
    }
}

fn has_scheme(value: &str) -> bool {
    value
        .get(..SCHEME.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(SCHEME))
}

fn redact_segment(segment: &str) -> &str {
    segment.get(..8.min(segment.len())).unwrap_or("")
}

pub(crate) fn invalid(reason: &str) -> ConfigError {
    ConfigError::InvalidTransportOptions {
        transport: TransportKind::AzureServiceBus,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VALID: &str = "Endpoint=sb://orders.servicebus.windows.net/;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=abc123==";

    #[test]
    fn test_parses_connection_string() {
        let connection: ServiceBusConnection = VALID.parse().unwrap();
        assert_eq!(connection.endpoint(), "sb://orders.servicebus.windows.net/");
        assert_eq!(connection.namespace(), "orders.servicebus.windows.net");
        assert_eq!(connection.shared_access_key_name(), "RootManageSharedAccessKey");
        // Base64 padding survives the split on the first '='.
        assert_eq!(connection.shared_access_key(), "abc123==");
    }

    #[test]
    fn test_keys_are_case_insensitive_and_trailing_semicolon_ok() {
        let connection: ServiceBusConnection =
            "endpoint=sb://orders.servicebus.windows.net;SHAREDACCESSKEYNAME=app;sharedAccessKey=k;"
                .parse()
                .unwrap();
        assert_eq!(connection.endpoint(), "sb://orders.servicebus.windows.net/");
        assert_eq!(connection.shared_access_key_name(), "app");
    }

    #[test]
    fn test_entity_path_is_rejected() {
        let err = format!("{VALID};EntityPath=orders")
            .parse::<ServiceBusConnection>()
            .unwrap_err();
        assert!(err.to_string().contains("EntityPath"));
    }

    #[test]
    fn test_malformed_connection_strings() {
        for (raw, expected) in [
            ("garbage", "key=value"),
            ("SharedAccessKeyName=a;SharedAccessKey=b", "missing Endpoint"),
            ("Endpoint=https://x/;SharedAccessKeyName=a;SharedAccessKey=b", "sb://"),
            ("Endpoint=sb://x/;SharedAccessKey=b", "SharedAccessKeyName"),
            ("Endpoint=sb://x/;SharedAccessKeyName=a;SharedAccessKey=b;Foo=1", "unsupported"),
        ] {
            let err = raw.parse::<ServiceBusConnection>().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidTransportOptions { transport: TransportKind::AzureServiceBus, .. }),
                "{raw}"
            );
            assert!(err.to_string().contains(expected), "{raw}: {err}");
        }
    }

    #[test]
    fn test_namespace_expansion() {
        let bare = ServiceBusConnection::from_parts("orders-prod", "app", "k").unwrap();
        assert_eq!(bare.endpoint(), "sb://orders-prod.servicebus.windows.net/");

        let qualified = ServiceBusConnection::from_parts("orders.servicebus.chinacloudapi.cn", "app", "k").unwrap();
        assert_eq!(qualified.endpoint(), "sb://orders.servicebus.chinacloudapi.cn/");

        let address = ServiceBusConnection::from_parts("sb://orders.example/", "app", "k").unwrap();
        assert_eq!(address.endpoint(), "sb://orders.example/");
    }

    #[test]
    fn test_debug_redacts_key() {
        let connection: ServiceBusConnection = VALID.parse().unwrap();
        assert!(!format!("{connection:?}").contains("abc123"));
    }
}
