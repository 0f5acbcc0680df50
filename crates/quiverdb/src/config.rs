//! Configuration for `QuiverDB`.
//!
//! A [`Config`] can be built in code with [`Config::builder`] or loaded from
//! JSON. Every field has a default, so a config file only names what differs.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "name": "social",
//!   "id": { "strategy": { "type": "snowflake", "worker_id": 1, "datacenter_id": 0 } },
//!   "backend": { "type": "redb", "path": "social.redb" },
//!   "auto_commit": true
//! }
//! ```

use std::path::{Path, PathBuf};

use quiverdb_core::id::{IdConfig, IdStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::Graph;

/// Where schema and graph records are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Ordered maps in process memory.
    #[default]
    Memory,
    /// A redb database file.
    Redb {
        /// Path of the database file, created if missing.
        path: PathBuf,
    },
    /// A redb database held in memory.
    RedbInMemory,
}

/// Graph configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the graph, used in log events.
    pub name: String,
    /// Id generation strategy and representation.
    pub id: IdConfig,
    /// Storage backend.
    pub backend: BackendConfig,
    /// Whether transactions commit after every write.
    pub auto_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "graph".to_owned(),
            id: IdConfig::default(),
            backend: BackendConfig::default(),
            auto_commit: false,
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed or the settings are
    /// invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file can't be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty graph name, an invalid id
    /// configuration, or a redb backend without a path.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("graph name can't be empty"));
        }
        self.id.validate().map_err(|e| Error::config(e.to_string()))?;
        if let BackendConfig::Redb { path } = &self.backend {
            if path.as_os_str().is_empty() {
                return Err(Error::config("redb backend needs a path"));
            }
        }
        Ok(())
    }

    /// Returns true if ids are derived from business keys.
    #[must_use]
    pub const fn is_splicing(&self) -> bool {
        matches!(self.id.strategy, IdStrategy::Splicing)
    }
}

/// Builder for [`Config`] values.
///
/// # Example
///
/// ```
/// use quiverdb::{BackendConfig, Config};
/// use quiverdb_core::id::IdConfig;
///
/// let config = Config::builder()
///     .name("social")
///     .id(IdConfig::snowflake(1, 0))
///     .backend(BackendConfig::RedbInMemory)
///     .auto_commit(true)
///     .build();
///
/// assert!(config.validate().is_ok());
/// assert!(!config.is_splicing());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a builder holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the graph name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the id configuration.
    #[must_use]
    pub const fn id(mut self, id: IdConfig) -> Self {
        self.config.id = id;
        self
    }

    /// Set the storage backend.
    #[must_use]
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.config.backend = backend;
        self
    }

    /// Store records in a redb file at `path`.
    #[must_use]
    pub fn path(self, path: impl AsRef<Path>) -> Self {
        self.backend(BackendConfig::Redb { path: path.as_ref().to_path_buf() })
    }

    /// Set whether transactions commit after every write.
    #[must_use]
    pub const fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.config.auto_commit = auto_commit;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }

    /// Opens a graph with the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the backend can't
    /// be opened.
    pub fn open(self) -> Result<Graph> {
        Graph::open(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quiverdb_core::IdKind;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.name, "graph");
        assert_eq!(config.id, IdConfig::splicing());
        assert_eq!(config.id.kind, IdKind::Text);
        assert_eq!(config.backend, BackendConfig::Memory);
        assert!(!config.auto_commit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_fills_missing_fields_with_defaults() {
        let config = Config::from_json_str(r#"{ "auto_commit": true }"#).unwrap();
        assert!(config.auto_commit);
        assert_eq!(config.backend, BackendConfig::Memory);

        let config = Config::from_json_str(
            r#"{
                "name": "social",
                "id": { "strategy": { "type": "snowflake", "worker_id": 3, "datacenter_id": 1 },
                        "kind": "numeric" },
                "backend": { "type": "redb", "path": "social.redb" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.id, IdConfig::snowflake(3, 1));
        assert_eq!(config.backend, BackendConfig::Redb { path: PathBuf::from("social.redb") });
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let err = Config::from_json_str(r#"{ "backend": { "type": "cassandra" } }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let config = Config::builder().id(IdConfig::snowflake(32, 0)).build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config::builder().id(IdConfig::splicing().kind(IdKind::Numeric)).build();
        assert!(config.validate().is_err());

        let config = Config::builder().name("  ").build();
        assert!(config.validate().is_err());

        let config = Config::builder().path("").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiver.json");
        std::fs::write(&path, r#"{ "name": "files", "backend": { "type": "redb_in_memory" } }"#)
            .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.name, "files");
        assert_eq!(config.backend, BackendConfig::RedbInMemory);

        assert!(Config::from_file(dir.path().join("missing.json")).is_err());
    }
}
