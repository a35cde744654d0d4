//! Store configuration.
//!
//! Services describe their document store with three values: the connection URI, the database
//! name and the collection name. They are read from the service's YAML or JSON configuration
//! file using the `dburi`, `dbname` and `dbcoll` keys:
//!
//! ```yaml
//! dburi: mongodb://localhost:8230
//! dbname: chess
//! dbcoll: datasets
//! ```
//!
//! Any of the values can be overridden through the `RECORDLAYER_DBURI`, `RECORDLAYER_DBNAME`
//! and `RECORDLAYER_DBCOLL` environment variables.

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use crate::{
    backend::StoreConnector,
    collection::Collection,
    connection::ConnectionManager,
    error::{RecordStoreError, RecordStoreResult},
};

pub const URI_ENV: &str = "RECORDLAYER_DBURI";
pub const DATABASE_ENV: &str = "RECORDLAYER_DBNAME";
pub const COLLECTION_ENV: &str = "RECORDLAYER_DBCOLL";

/// Connection URI and namespace of a document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store connection URI, including host and credentials.
    #[serde(rename = "dburi")]
    pub uri: String,
    /// Database name.
    #[serde(rename = "dbname")]
    pub database: String,
    /// Collection name.
    #[serde(rename = "dbcoll", default)]
    pub collection: String,
}

impl StoreConfig {
    /// Parses a YAML document. Since YAML is a superset of JSON, JSON input is accepted too.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the input cannot be parsed, or an initialization error
    /// if the URI or database name is empty.
    pub fn from_yaml_str(input: &str) -> RecordStoreResult<Self> {
        let config: StoreConfig = serde_yaml::from_str(input)?;
        config.validate()
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Same as [`StoreConfig::from_yaml_str`].
    pub fn from_json_str(input: &str) -> RecordStoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(input)?;
        config.validate()
    }

    /// Reads a configuration file, choosing the parser from its extension (`.json` or YAML
    /// otherwise), then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if the file cannot be read, and the errors of
    /// [`StoreConfig::from_yaml_str`] otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> RecordStoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RecordStoreError::Initialization(format!("fail to read {}: {}", path.display(), e))
        })?;

        let mut config: StoreConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        config.apply_overrides(|key| env::var(key).ok());

        config.validate()
    }

    /// Replaces values for which `lookup` returns a non-empty override.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets = [
            (URI_ENV, &mut self.uri),
            (DATABASE_ENV, &mut self.database),
            (COLLECTION_ENV, &mut self.collection),
        ];

        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        }
    }

    /// Returns a handle on the configured collection.
    pub fn collection<'a, C: StoreConnector>(
        &self,
        manager: &'a ConnectionManager<C>,
    ) -> Collection<'a, C> {
        manager.collection(&self.database, &self.collection)
    }

    fn validate(self) -> RecordStoreResult<Self> {
        if self.uri.is_empty() {
            return Err(RecordStoreError::Initialization("empty store URI".into()));
        }
        if self.database.is_empty() {
            return Err(RecordStoreError::Initialization("empty database name".into()));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_keys() {
        let config = StoreConfig::from_yaml_str(
            "dburi: mongodb://localhost:8230\ndbname: chess\ndbcoll: datasets\n",
        )
        .unwrap();

        assert_eq!(config.uri, "mongodb://localhost:8230");
        assert_eq!(config.database, "chess");
        assert_eq!(config.collection, "datasets");
    }

    #[test]
    fn parses_json_and_defaults_collection() {
        let config =
            StoreConfig::from_json_str(r#"{"dburi": "mongodb://db:27017", "dbname": "meta"}"#)
                .unwrap();

        assert_eq!(config.database, "meta");
        assert_eq!(config.collection, "");
    }

    #[test]
    fn rejects_missing_uri() {
        assert!(matches!(
            StoreConfig::from_json_str(r#"{"dburi": "", "dbname": "meta"}"#),
            Err(RecordStoreError::Initialization(_))
        ));
        assert!(matches!(
            StoreConfig::from_yaml_str("dbname: [unterminated"),
            Err(RecordStoreError::Serialization(_))
        ));
    }

    #[test]
    fn overrides_replace_non_empty_values() {
        let mut config = StoreConfig {
            uri: "mongodb://localhost".into(),
            database: "chess".into(),
            collection: "datasets".into(),
        };

        config.apply_overrides(|key| match key {
            URI_ENV => Some("mongodb://replica:27017".to_string()),
            COLLECTION_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.uri, "mongodb://replica:27017");
        assert_eq!(config.database, "chess");
        assert_eq!(config.collection, "datasets");
    }
}
