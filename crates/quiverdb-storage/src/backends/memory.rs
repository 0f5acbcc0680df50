//! In-memory backend store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use quiverdb_core::query::BackendQuery;
use quiverdb_core::{ElementType, Id};
use tracing::debug;

use crate::engine::{apply_item, execute, BackendStore, EntrySource, StorageError, StorageResult};
use crate::entry::BackendEntry;
use crate::mutation::{BackendMutation, MutateItem};

type Records = BTreeMap<(ElementType, Vec<u8>), BackendEntry>;

#[derive(Debug, Default)]
struct State {
    records: Records,
    pending: Option<Vec<MutateItem>>,
}

/// A store keeping every record in an ordered map.
///
/// Records are keyed by element type and id bytes, so scans return them in
/// id order. Mutations inside a backend transaction are buffered and applied
/// all at once by [`BackendStore::commit_tx`].
///
/// # Example
///
/// ```
/// use quiverdb_core::query::Query;
/// use quiverdb_core::{ElementType, Id};
/// use quiverdb_storage::backends::InMemoryStore;
/// use quiverdb_storage::{BackendEntry, BackendMutation, BackendStore, MutateAction};
///
/// let store = InMemoryStore::new("graph");
/// let mut mutation = BackendMutation::new();
/// mutation.add(BackendEntry::new(ElementType::Vertex, Id::from("marko")), MutateAction::Insert).unwrap();
///
/// store.begin_tx().unwrap();
/// store.mutate(&mutation).unwrap();
/// store.commit_tx().unwrap();
///
/// let found = store.query(&Query::new(ElementType::Vertex).into()).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    name: String,
    state: Mutex<State>,
    fail_next_mutate: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), state: Mutex::default(), fail_next_mutate: AtomicBool::new(false) }
    }

    /// Makes the next call to [`BackendStore::mutate`] fail.
    ///
    /// Used to exercise commit failure handling.
    pub fn fail_next_mutate(&self) {
        self.fail_next_mutate.store(true, Ordering::SeqCst);
    }

    /// Returns the number of committed records.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.records.len())
    }

    /// Returns true if no record is committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.lock()?.records.is_empty())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| StorageError::Internal(e.to_string()))
    }

    fn key(element_type: ElementType, id: &Id) -> (ElementType, Vec<u8>) {
        (element_type, id.as_bytes())
    }

    fn apply(records: &mut Records, items: &[MutateItem]) -> StorageResult<()> {
        for item in items {
            let key = Self::key(item.entry.element_type(), item.entry.id());
            if let Some(entry) = apply_item(records.remove(&key), item)? {
                records.insert(key, entry);
            }
        }
        Ok(())
    }
}

struct Snapshot<'a>(&'a Records);

impl EntrySource for Snapshot<'_> {
    fn get(&self, element_type: ElementType, id: &Id) -> StorageResult<Option<BackendEntry>> {
        Ok(self.0.get(&InMemoryStore::key(element_type, id)).cloned())
    }

    fn scan(&self, element_type: ElementType) -> StorageResult<Vec<BackendEntry>> {
        Ok(self
            .0
            .range((element_type, Vec::new())..)
            .take_while(|((t, _), _)| *t == element_type)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

impl BackendStore for InMemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, query: &BackendQuery) -> StorageResult<Vec<BackendEntry>> {
        let state = self.lock()?;
        execute(&Snapshot(&state.records), query)
    }

    fn mutate(&self, mutation: &BackendMutation) -> StorageResult<()> {
        if self.fail_next_mutate.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Internal(format!("injected failure in store '{}'", self.name)));
        }

        let items: Vec<MutateItem> = mutation.items().cloned().collect();
        let mut state = self.lock()?;
        if let Some(pending) = state.pending.as_mut() {
            pending.extend(items);
            return Ok(());
        }

        let mut records = state.records.clone();
        Self::apply(&mut records, &items)?;
        state.records = records;
        Ok(())
    }

    fn begin_tx(&self) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.pending.is_some() {
            return Err(StorageError::Transaction(format!(
                "store '{}' already has an open transaction",
                self.name
            )));
        }
        state.pending = Some(Vec::new());
        Ok(())
    }

    fn commit_tx(&self) -> StorageResult<()> {
        let mut state = self.lock()?;
        let items = state.pending.take().ok_or_else(|| {
            StorageError::Transaction(format!("store '{}' has no open transaction", self.name))
        })?;

        let mut records = state.records.clone();
        Self::apply(&mut records, &items)?;
        state.records = records;
        debug!(store = %self.name, items = items.len(), "committed");
        Ok(())
    }

    fn rollback_tx(&self) -> StorageResult<()> {
        if let Some(items) = self.lock()?.pending.take() {
            debug!(store = %self.name, discarded = items.len(), "rolled back");
        }
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.records.clear();
        state.pending = None;
        Ok(())
    }
}
