//! Saga persistence configuration.
//!
//! Binds the `SagaDbConfigs` section into two ordered lists of backend
//! connection descriptors. Saga repositories (outside this crate) select a
//! descriptor by name or index; this layer neither deduplicates nor
//! validates names.
//!
//! ```toml
//! [[SagaDbConfigs.SagaMongoDbOptions]]
//! Name = "orders"
//! ConnectionString = "mongodb://mongo:27017"
//! DatabaseName = "orders"
//!
//! [[SagaDbConfigs.SagaSqlServerOptions]]
//! Name = "billing"
//! ConnectionString = "Server=sql;Database=billing"
//! ```

use crate::config::{Configuration, de};
use crate::error::ConfigError;
use serde::Deserialize;

/// Configuration section holding [`SagaDbConfigs`].
pub const SAGA_DB_CONFIGS_SECTION: &str = "SagaDbConfigs";

/// Connection descriptor for a document-store saga repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentStoreOptions {
    /// Logical name repositories select by
    #[serde(deserialize_with = "de::string")]
    pub name: String,
    /// Store connection string
    #[serde(rename = "connectionstring", deserialize_with = "de::string")]
    pub connection_string: String,
    /// Database holding saga collections
    #[serde(rename = "databasename", deserialize_with = "de::opt_string")]
    pub database_name: Option<String>,
    /// Collection override; repositories default to the saga type name
    #[serde(rename = "collectionname", deserialize_with = "de::opt_string")]
    pub collection_name: Option<String>,
}

/// Connection descriptor for a relational saga repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelationalStoreOptions {
    /// Logical name repositories select by
    #[serde(deserialize_with = "de::string")]
    pub name: String,
    /// Database connection string
    #[serde(rename = "connectionstring", deserialize_with = "de::string")]
    pub connection_string: String,
    /// Schema holding saga tables
    #[serde(deserialize_with = "de::opt_string")]
    pub schema: Option<String>,
}

/// Saga persistence configuration, constructed once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SagaDbConfigs {
    /// Document-store descriptors, in source order
    #[serde(rename = "sagamongodboptions")]
    pub document_store_options: Vec<DocumentStoreOptions>,
    /// Relational-store descriptors, in source order
    #[serde(rename = "sagasqlserveroptions")]
    pub relational_store_options: Vec<RelationalStoreOptions>,
}

impl SagaDbConfigs {
    /// Bind the `SagaDbConfigs` section. An absent section yields two empty lists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if the section is malformed.
    pub fn bind(configuration: &Configuration) -> Result<Self, ConfigError> {
        let configs: Self = configuration.bind(SAGA_DB_CONFIGS_SECTION)?;
        tracing::debug!(
            document_stores = configs.document_store_options.len(),
            relational_stores = configs.relational_store_options.len(),
            "Saga persistence configuration bound"
        );
        Ok(configs)
    }

    /// First document-store descriptor with the given name.
    #[must_use]
    pub fn document_store(&self, name: &str) -> Option<&DocumentStoreOptions> {
        self.document_store_options.iter().find(|o| o.name == name)
    }

    /// First relational-store descriptor with the given name.
    #[must_use]
    pub fn relational_store(&self, name: &str) -> Option<&RelationalStoreOptions> {
        self.relational_store_options.iter().find(|o| o.name == name)
    }
}
