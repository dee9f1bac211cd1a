//! Hierarchical key/value configuration.
//!
//! Configuration is assembled once at process start from a TOML file and
//! `TRANSIT_`-prefixed environment variables, then passed by reference to
//! every component that needs it. Keys are case-insensitive: they are
//! lower-cased on the way in, and typed option records bind against the
//! lower-cased names.
//!
//! # Sources
//!
//! | Source | Example |
//! |--------|---------|
//! | TOML file (`platform.toml`, or `TRANSIT_CONFIG`) | `[RMQ.SSL]` / `Trust = true` |
//! | Environment (`__` separates sections) | `TRANSIT_RMQ__SSL__TRUST=true` |
//!
//! Environment values override file values. Numeric path segments address
//! list elements, so `TRANSIT_SAGADBCONFIGS__SAGASQLSERVEROPTIONS__0__NAME`
//! sets the name of the first relational saga store.
//!
//! # Example
//!
//! ```
//! use transit_platform_core::config::Configuration;
//!
//! let config = Configuration::from_toml_str("[Platform]\nTransport = \"RMQ\"")
//!     .unwrap()
//!     .with_value("RMQ:Host", "broker.internal");
//!
//! assert_eq!(config.get_str("platform:transport").as_deref(), Some("RMQ"));
//! assert_eq!(config.get_str("RMQ:HOST").as_deref(), Some("broker.internal"));
//! ```

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "TRANSIT_";

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "TRANSIT_CONFIG";

/// Configuration file read when `TRANSIT_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "platform.toml";

/// Immutable-after-startup configuration tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    root: Map<String, Value>,
}

impl Configuration {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML source text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let table = source
            .parse::<toml::Table>()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        let value = serde_json::to_value(table).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self::from_value(value))
    }

    /// Read configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Build configuration from an already-parsed JSON tree.
    ///
    /// Non-object roots produce an empty configuration.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match lowercase_keys(value) {
            Value::Object(root) => Self { root },
            _ => Self::new(),
        }
    }

    /// Load the process configuration: the TOML file named by
    /// `TRANSIT_CONFIG` (default `platform.toml`), overlaid with
    /// `TRANSIT_`-prefixed environment variables.
    ///
    /// A missing file is not an error; the environment alone may carry
    /// the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);

        let base = if path.exists() {
            tracing::info!(path = %path.display(), "Loading configuration file");
            Self::from_file(&path)?
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using environment only");
            Self::new()
        };

        Ok(base.with_env_overrides(std::env::vars()))
    }

    /// Overlay `TRANSIT_`-prefixed variables from `vars`.
    ///
    /// `TRANSIT_RMQ__SSL__TRUST=true` sets `rmq:ssl:trust`. Variables
    /// without the prefix, and `TRANSIT_CONFIG` itself, are ignored.
    #[must_use]
    pub fn with_env_overrides<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(rest) = strip_prefix_ignore_case(&key, ENV_PREFIX) else {
                continue;
            };
            if key.eq_ignore_ascii_case(CONFIG_PATH_ENV) {
                continue;
            }
            self.set(&rest.replace("__", ":"), value);
        }
        self
    }

    /// Set a single value, returning the updated configuration.
    #[must_use]
    pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a single value at a `:`-separated path.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let segments = split_path(key);
        if segments.is_empty() {
            return;
        }
        insert_path(&mut self.root, &segments, Value::String(value.into()));
    }

    /// Return the subtree at `path`, with index-keyed objects presented as lists.
    ///
    /// An empty path returns the whole tree.
    #[must_use]
    pub fn section(&self, path: &str) -> Option<Value> {
        let segments = split_path(path);
        let Some((first, rest)) = segments.split_first() else {
            return Some(index_maps_to_lists(Value::Object(self.root.clone())));
        };

        let mut node = self.root.get(first)?;
        for segment in rest {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(index_maps_to_lists(node.clone()))
    }

    /// Whether a non-null value exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.section(path).is_some_and(|v| !v.is_null())
    }

    /// Read a scalar at `path` as a string.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<String> {
        match self.section(path)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Bind the section at `path` to a typed options record.
    ///
    /// An absent section binds to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if the section cannot be deserialized.
    pub fn bind<T>(&self, path: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.section(path) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| ConfigError::Bind {
                section: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

fn strip_prefix_ignore_case<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let head = key.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &key[prefix.len()..])
}

fn split_path(path: &str) -> Vec<String> {
    path.replace("__", ":")
        .split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn insert_path(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(head.clone(), value);
        return;
    }
    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    insert_value(child, rest, value);
}

fn insert_value(node: &mut Value, segments: &[String], value: Value) {
    // Lists from the file are re-keyed by index so overrides merge element-wise.
    if let Value::Array(items) = node {
        let indexed = std::mem::take(items)
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect();
        *node = Value::Object(indexed);
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        insert_path(map, segments, value);
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

fn index_maps_to_lists(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let all_indices = !map.is_empty() && map.keys().all(|k| k.parse::<usize>().is_ok());
            if all_indices {
                let mut indexed: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                    .collect();
                indexed.sort_by_key(|(i, _)| *i);
                Value::Array(
                    indexed
                        .into_iter()
                        .map(|(_, v)| index_maps_to_lists(v))
                        .collect(),
                )
            } else {
                Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, index_maps_to_lists(v)))
                        .collect(),
                )
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(index_maps_to_lists).collect()),
        other => other,
    }
}

/// Lenient field deserializers.
///
/// Environment overrides always arrive as strings while the TOML file
/// carries typed scalars; these accept either spelling.
pub mod de {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    fn scalar_to_string(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Accept a string, number, or boolean as a `String`.
    ///
    /// # Errors
    ///
    /// Fails on lists and tables.
    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(String::new()),
            other => scalar_to_string(other)
                .ok_or_else(|| D::Error::custom("expected a string value")),
        }
    }

    /// Like [`string`], mapping null and blank values to `None`.
    ///
    /// # Errors
    ///
    /// Fails on lists and tables.
    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = string(deserializer)?;
        let trimmed = value.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    /// Accept `true`/`false` as booleans or strings (case-insensitive).
    ///
    /// # Errors
    ///
    /// Fails on anything else.
    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" | "" => Ok(false),
                other => Err(D::Error::custom(format!("invalid boolean '{other}'"))),
            },
            Value::Number(n) => Ok(n.as_u64().is_some_and(|v| v != 0)),
            _ => Err(D::Error::custom("expected a boolean value")),
        }
    }

    /// Accept a number as a number or as its string spelling.
    ///
    /// # Errors
    ///
    /// Fails if the value does not parse as `T`.
    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + DeserializeOwned,
        T::Err: std::fmt::Display,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => s.trim().parse::<T>().map_err(D::Error::custom),
            other @ Value::Number(_) => serde_json::from_value(other).map_err(D::Error::custom),
            _ => Err(D::Error::custom("expected a numeric value")),
        }
    }

    /// Like [`number`], mapping null and blank values to `None`.
    ///
    /// # Errors
    ///
    /// Fails if a present value does not parse as `T`.
    pub fn opt_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + DeserializeOwned,
        T::Err: std::fmt::Display,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s.trim().parse::<T>().map(Some).map_err(D::Error::custom),
            other @ Value::Number(_) => serde_json::from_value(other)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Err(D::Error::custom("expected a numeric value")),
        }
    }
}
