//! The graph handle.

use std::path::Path;
use std::sync::Arc;

use quiverdb_core::id::IdGeneratorFactory;
use quiverdb_core::IdGenerator;
use quiverdb_storage::backends::{InMemoryStore, RedbStore};
use quiverdb_storage::{BackendStore, BinarySerializer, Serializer};
use tracing::info;

use crate::config::{BackendConfig, Config, ConfigBuilder};
use crate::error::Result;
use crate::transaction::{
    AbstractTransaction, GraphTransaction, SchemaTransaction, TransactionCore,
};

/// Store name of the schema records.
pub const SCHEMA_STORE: &str = "schema";
/// Store name of the vertex and edge records.
pub const GRAPH_STORE: &str = "graph";

/// An open graph.
///
/// `Graph` owns the id generator, the serializer and two backend stores: one
/// for schema elements and one for vertices and edges. Transactions are
/// cheap handles onto them; each one belongs to a single unit of work.
///
/// # Examples
///
/// ```
/// use quiverdb::Graph;
/// use quiverdb_core::schema::PropertyKey;
///
/// let graph = Graph::in_memory().unwrap();
/// let mut schema = graph.schema();
/// schema.add_property_key(PropertyKey::builder("name").build()).unwrap();
/// assert!(schema.get_property_key("name").unwrap().is_some());
/// ```
#[derive(Debug)]
pub struct Graph {
    config: Config,
    ids: Arc<dyn IdGenerator>,
    serializer: Arc<dyn Serializer>,
    schema_store: Arc<dyn BackendStore>,
    graph_store: Arc<dyn BackendStore>,
}

impl Graph {
    /// Open or create a graph stored in a redb file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database file can't be opened or created.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        ConfigBuilder::new().path(path).open()
    }

    /// Open a graph held in memory with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the id generator can't be built.
    pub fn in_memory() -> Result<Self> {
        Self::open(Config::default())
    }

    /// Open a graph with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// is invalid, and a storage error if the backend can't be opened.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let ids = IdGeneratorFactory::build(&config.id)?;

        let (schema_store, graph_store): (Arc<dyn BackendStore>, Arc<dyn BackendStore>) =
            match &config.backend {
                BackendConfig::Memory => (
                    Arc::new(InMemoryStore::new(SCHEMA_STORE)),
                    Arc::new(InMemoryStore::new(GRAPH_STORE)),
                ),
                BackendConfig::Redb { path } => {
                    let db = RedbStore::create_database(path)?;
                    (
                        Arc::new(RedbStore::with_database(Arc::clone(&db), SCHEMA_STORE)),
                        Arc::new(RedbStore::with_database(db, GRAPH_STORE)),
                    )
                }
                BackendConfig::RedbInMemory => {
                    let db = RedbStore::create_in_memory_database()?;
                    (
                        Arc::new(RedbStore::with_database(Arc::clone(&db), SCHEMA_STORE)),
                        Arc::new(RedbStore::with_database(db, GRAPH_STORE)),
                    )
                }
            };

        info!(graph = %config.name, backend = ?config.backend, id = ?config.id, "graph opened");
        Ok(Self::from_parts(config, ids, schema_store, graph_store))
    }

    /// Assembles a graph from already built components.
    ///
    /// The backend and id settings of `config` are not used; only the name
    /// and auto-commit flag are.
    #[must_use]
    pub fn from_parts(
        config: Config,
        ids: Arc<dyn IdGenerator>,
        schema_store: Arc<dyn BackendStore>,
        graph_store: Arc<dyn BackendStore>,
    ) -> Self {
        Self { config, ids, serializer: Arc::new(BinarySerializer::new()), schema_store, graph_store }
    }

    /// Returns a builder for configuring a graph.
    ///
    /// # Examples
    ///
    /// ```
    /// use quiverdb::{BackendConfig, Graph};
    ///
    /// let graph = Graph::builder()
    ///     .name("social")
    ///     .backend(BackendConfig::RedbInMemory)
    ///     .auto_commit(true)
    ///     .open()
    ///     .unwrap();
    /// assert_eq!(graph.config().name, "social");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Get the configuration used to open this graph.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the id generator.
    #[must_use]
    pub fn id_generator(&self) -> &Arc<dyn IdGenerator> {
        &self.ids
    }

    /// Starts a schema transaction.
    #[must_use]
    pub fn schema(&self) -> SchemaTransaction {
        let mut tx = SchemaTransaction::new(self.core(&self.schema_store));
        tx.set_auto_commit(self.config.auto_commit);
        tx
    }

    /// Starts a graph transaction.
    #[must_use]
    pub fn transaction(&self) -> GraphTransaction {
        let mut tx = GraphTransaction::new(self.core(&self.graph_store));
        tx.set_auto_commit(self.config.auto_commit);
        tx
    }

    /// Removes every schema element, vertex and edge.
    ///
    /// # Errors
    ///
    /// Returns an error if a store can't be cleared.
    pub fn clear(&self) -> Result<()> {
        self.graph_store.clear()?;
        self.schema_store.clear()?;
        info!(graph = %self.config.name, "graph cleared");
        Ok(())
    }

    fn core(&self, store: &Arc<dyn BackendStore>) -> TransactionCore {
        TransactionCore::new(Arc::clone(store), Arc::clone(&self.serializer), Arc::clone(&self.ids))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quiverdb_core::id::IdConfig;
    use quiverdb_core::schema::PropertyKey;
    use quiverdb_core::IdKind;

    use super::*;
    use crate::Error;

    #[test]
    fn test_transactions_follow_auto_commit() {
        let graph = Graph::builder().auto_commit(true).open().unwrap();
        assert!(graph.schema().auto_commit());
        assert!(graph.transaction().auto_commit());

        let graph = Graph::in_memory().unwrap();
        assert!(!graph.transaction().auto_commit());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = Graph::builder().id(IdConfig::snowflake(99, 0)).open().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_snowflake_schema_ids_are_numeric() {
        let graph = Graph::builder().id(IdConfig::snowflake(1, 1)).open().unwrap();
        assert_eq!(graph.id_generator().kind(), IdKind::Numeric);

        let mut schema = graph.schema();
        let age = schema.add_property_key(PropertyKey::builder("age").build()).unwrap();
        assert!(age.id.as_ref().unwrap().is_numeric());

        let again = schema.add_property_key(PropertyKey::builder("age").build()).unwrap();
        assert_eq!(again.id, age.id);
    }

    #[test]
    fn test_clear_empties_both_stores() {
        let graph = Graph::builder().backend(BackendConfig::RedbInMemory).open().unwrap();
        let mut schema = graph.schema();
        schema.add_property_key(PropertyKey::builder("age").build()).unwrap();
        schema.commit().unwrap();

        graph.clear().unwrap();
        assert!(graph.schema().get_property_key("age").unwrap().is_none());
    }
}
