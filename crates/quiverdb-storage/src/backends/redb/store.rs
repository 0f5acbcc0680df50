//! Redb backend store implementation.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use quiverdb_core::query::BackendQuery;
use quiverdb_core::{ElementType, Id};
use redb::{Database, ReadableTable};
use tracing::{debug, warn};

use super::tables::{record_key, store_end_key, store_start_key, type_range, DATA_TABLE};
use crate::engine::{apply_item, execute, BackendStore, EntrySource, StorageError, StorageResult};
use crate::entry::{decode, encode, BackendEntry};
use crate::mutation::{BackendMutation, MutateItem};

fn internal(e: impl fmt::Display) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// A logical store inside a redb database.
///
/// Several stores may share one [`Database`]; each one only sees the keys
/// prefixed with its name. Records are bincode-encoded [`BackendEntry`]
/// values. Mutations inside a backend transaction are buffered and written
/// in a single redb write transaction at commit.
pub struct RedbStore {
    name: String,
    db: Arc<Database>,
    pending: Mutex<Option<Vec<MutateItem>>>,
}

impl RedbStore {
    /// Opens or creates a database file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database can't be opened.
    pub fn create_database(path: impl AsRef<Path>) -> StorageResult<Arc<Database>> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Arc::new(db))
    }

    /// Creates a database that lives in memory only.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database can't be created.
    pub fn create_in_memory_database() -> StorageResult<Arc<Database>> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Arc::new(db))
    }

    /// Creates a store named `name` inside a shared database.
    #[must_use]
    pub fn with_database(db: Arc<Database>, name: impl Into<String>) -> Self {
        Self { name: name.into(), db, pending: Mutex::new(None) }
    }

    /// Creates a store in its own in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database can't be created.
    pub fn in_memory(name: impl Into<String>) -> StorageResult<Self> {
        Ok(Self::with_database(Self::create_in_memory_database()?, name))
    }

    /// Returns the underlying database.
    #[must_use]
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    fn pending(&self) -> StorageResult<MutexGuard<'_, Option<Vec<MutateItem>>>> {
        self.pending.lock().map_err(internal)
    }

    fn write(&self, items: &[MutateItem]) -> StorageResult<()> {
        let tx = self.db.begin_write().map_err(|e| StorageError::Transaction(e.to_string()))?;
        if let Err(e) = self.apply(&tx, items) {
            if let Err(abort) = tx.abort() {
                warn!(store = %self.name, error = %abort, "abort failed");
            }
            return Err(e);
        }
        tx.commit().map_err(|e| StorageError::Transaction(e.to_string()))
    }

    fn apply(&self, tx: &redb::WriteTransaction, items: &[MutateItem]) -> StorageResult<()> {
        let mut table = tx.open_table(DATA_TABLE).map_err(internal)?;
        for item in items {
            let key = record_key(&self.name, item.entry.element_type(), item.entry.id());
            let current = if item.action.is_whole_entry() {
                None
            } else {
                let bytes = table.get(key.as_slice()).map_err(internal)?.map(|v| v.value().to_vec());
                bytes.map(|b| decode::<BackendEntry>(&b)).transpose()?
            };
            match apply_item(current, item)? {
                Some(entry) => {
                    table.insert(key.as_slice(), encode(&entry)?.as_slice()).map_err(internal)?;
                }
                None => {
                    table.remove(key.as_slice()).map_err(internal)?;
                }
            }
        }
        Ok(())
    }

    fn read_range(&self, start: &[u8], end: &[u8]) -> StorageResult<Vec<BackendEntry>> {
        let tx = self.db.begin_read().map_err(|e| StorageError::Transaction(e.to_string()))?;
        let table = match tx.open_table(DATA_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(internal(e)),
        };
        let mut entries = Vec::new();
        for result in table.range(start..end).map_err(internal)? {
            let (_, v) = result.map_err(internal)?;
            entries.push(decode(v.value())?);
        }
        Ok(entries)
    }
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore").field("name", &self.name).finish_non_exhaustive()
    }
}

impl EntrySource for RedbStore {
    fn get(&self, element_type: ElementType, id: &Id) -> StorageResult<Option<BackendEntry>> {
        let key = record_key(&self.name, element_type, id);
        let tx = self.db.begin_read().map_err(|e| StorageError::Transaction(e.to_string()))?;
        let table = match tx.open_table(DATA_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(internal(e)),
        };
        let value = table.get(key.as_slice()).map_err(internal)?;
        value.map(|v| decode(v.value())).transpose()
    }

    fn scan(&self, element_type: ElementType) -> StorageResult<Vec<BackendEntry>> {
        let (start, end) = type_range(&self.name, element_type);
        self.read_range(&start, &end)
    }
}

impl BackendStore for RedbStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, query: &BackendQuery) -> StorageResult<Vec<BackendEntry>> {
        execute(self, query)
    }

    fn mutate(&self, mutation: &BackendMutation) -> StorageResult<()> {
        let items: Vec<MutateItem> = mutation.items().cloned().collect();
        {
            let mut pending = self.pending()?;
            if let Some(buffer) = pending.as_mut() {
                buffer.extend(items);
                return Ok(());
            }
        }
        self.write(&items)
    }

    fn begin_tx(&self) -> StorageResult<()> {
        let mut pending = self.pending()?;
        if pending.is_some() {
            return Err(StorageError::Transaction(format!(
                "store '{}' already has an open transaction",
                self.name
            )));
        }
        *pending = Some(Vec::new());
        Ok(())
    }

    fn commit_tx(&self) -> StorageResult<()> {
        let items = self.pending()?.take().ok_or_else(|| {
            StorageError::Transaction(format!("store '{}' has no open transaction", self.name))
        })?;
        self.write(&items)?;
        debug!(store = %self.name, items = items.len(), "committed");
        Ok(())
    }

    fn rollback_tx(&self) -> StorageResult<()> {
        if let Some(items) = self.pending()?.take() {
            debug!(store = %self.name, discarded = items.len(), "rolled back");
        }
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.pending()?.take();
        let start = store_start_key(&self.name);
        let end = store_end_key(&self.name);

        let tx = self.db.begin_write().map_err(|e| StorageError::Transaction(e.to_string()))?;
        {
            let mut table = tx.open_table(DATA_TABLE).map_err(internal)?;
            let mut keys = Vec::new();
            for result in table.range(start.as_slice()..end.as_slice()).map_err(internal)? {
                let (k, _) = result.map_err(internal)?;
                keys.push(k.value().to_vec());
            }
            for key in &keys {
                table.remove(key.as_slice()).map_err(internal)?;
            }
        }
        tx.commit().map_err(|e| StorageError::Transaction(e.to_string()))
    }
}
