//! Transactions over a backend store.
//!
//! Every transaction buffers its writes in memory and hands them to the
//! store as one conflict-resolved [`BackendMutation`] at commit. The
//! protocol lives in the default methods of [`AbstractTransaction`];
//! [`GraphTransaction`] and [`SchemaTransaction`] supply the state and
//! hooks for their element kinds.
//!
//! # Read your own writes
//!
//! A read on a transaction with pending writes commits them first, so the
//! read observes them. With auto-commit on, every typed write commits
//! immediately as well.
//!
//! # Failure
//!
//! A failed commit always rolls back: the pending writes are dropped, the
//! store's bracket is closed, and the original error is returned inside
//! [`Error::CommitFailed`]. A rollback failure is logged and never replaces
//! the original error.
//!
//! # Example
//!
//! ```
//! use quiverdb::transaction::AbstractTransaction;
//! use quiverdb::Graph;
//! use quiverdb_core::query::IdQuery;
//! use quiverdb_core::{ElementType, Id};
//! use quiverdb_storage::BackendEntry;
//!
//! let graph = Graph::in_memory().unwrap();
//! let mut tx = graph.transaction();
//!
//! tx.add_entry(BackendEntry::new(ElementType::Vertex, Id::from("v1"))).unwrap();
//! assert!(tx.has_updates());
//!
//! // Reading commits the pending write first.
//! let found = tx.query(IdQuery::single(ElementType::Vertex, Id::from("v1")).into()).unwrap();
//! assert_eq!(found.len(), 1);
//! assert!(!tx.has_updates());
//! ```

mod graph;
mod schema;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use quiverdb_core::query::{BackendQuery, IdQuery};
use quiverdb_core::{ElementType, Id, IdGenerator};
use quiverdb_storage::{
    BackendEntry, BackendMutation, BackendStore, MutateAction, MutationKey, Serializer,
    StorageResult,
};
use tracing::{debug, error};

pub use graph::GraphTransaction;
pub use schema::SchemaTransaction;

use crate::error::{Error, Result};

/// Entries keyed by identity, iterated in the order they were first added.
#[derive(Debug, Default)]
struct PendingSet {
    next: u64,
    order: BTreeMap<u64, BackendEntry>,
    index: HashMap<MutationKey, u64>,
}

impl PendingSet {
    /// Inserts `entry`, replacing an entry of the same identity in place.
    fn insert(&mut self, entry: BackendEntry) {
        let key = MutationKey::of(&entry);
        if let Some(seq) = self.index.get(&key) {
            self.order.insert(*seq, entry);
            return;
        }
        self.order.insert(self.next, entry);
        self.index.insert(key, self.next);
        self.next += 1;
    }

    fn remove(&mut self, key: &MutationKey) -> Option<BackendEntry> {
        let seq = self.index.remove(key)?;
        self.order.remove(&seq)
    }

    fn get(&self, key: &MutationKey) -> Option<&BackendEntry> {
        self.index.get(key).and_then(|seq| self.order.get(seq))
    }

    fn iter(&self) -> impl Iterator<Item = &BackendEntry> {
        self.order.values()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

/// State shared by every transaction: collaborators and pending writes.
pub struct TransactionCore {
    store: Arc<dyn BackendStore>,
    serializer: Arc<dyn Serializer>,
    ids: Arc<dyn IdGenerator>,
    auto_commit: bool,
    additions: PendingSet,
    deletions: PendingSet,
    updates: Vec<(BackendEntry, MutateAction)>,
}

impl TransactionCore {
    /// Creates a core with no pending writes and auto-commit off.
    #[must_use]
    pub fn new(
        store: Arc<dyn BackendStore>,
        serializer: Arc<dyn Serializer>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            serializer,
            ids,
            auto_commit: false,
            additions: PendingSet::default(),
            deletions: PendingSet::default(),
            updates: Vec::new(),
        }
    }

    /// Returns the backend store.
    #[must_use]
    pub fn store(&self) -> &dyn BackendStore {
        self.store.as_ref()
    }

    /// Returns the serializer.
    #[must_use]
    pub fn serializer(&self) -> &dyn Serializer {
        self.serializer.as_ref()
    }

    /// Returns the id generator.
    #[must_use]
    pub fn id_generator(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Returns true if any addition, deletion or partial update is pending.
    #[must_use]
    pub fn has_updates(&self) -> bool {
        !self.additions.is_empty() || !self.deletions.is_empty() || !self.updates.is_empty()
    }

    /// Returns the number of pending writes.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.additions.len() + self.deletions.len() + self.updates.len()
    }

    /// Returns the pending addition with the given identity.
    #[must_use]
    pub fn pending_addition(&self, element_type: ElementType, id: &Id) -> Option<&BackendEntry> {
        self.additions.get(&MutationKey::new(element_type, id.clone()))
    }

    /// Returns true if the record with the given identity is pending removal.
    #[must_use]
    pub fn pending_deletion(&self, element_type: ElementType, id: &Id) -> bool {
        self.deletions.get(&MutationKey::new(element_type, id.clone())).is_some()
    }

    /// Builds the conflict-resolved mutation of the pending writes.
    ///
    /// Deletions come first, then additions, then partial updates, each in
    /// call order.
    ///
    /// # Errors
    ///
    /// Returns the first conflict between pending writes.
    pub fn mutation(&self) -> StorageResult<BackendMutation> {
        let mut mutation = BackendMutation::new();
        for entry in self.deletions.iter() {
            mutation.add(entry.clone(), MutateAction::Delete)?;
        }
        for entry in self.additions.iter() {
            mutation.add(entry.clone(), MutateAction::Insert)?;
        }
        for (entry, action) in &self.updates {
            mutation.add(entry.clone(), *action)?;
        }
        Ok(mutation)
    }

    fn clear(&mut self) {
        self.additions.clear();
        self.deletions.clear();
        self.updates.clear();
    }
}

impl fmt::Debug for TransactionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionCore")
            .field("store", &self.store.name())
            .field("auto_commit", &self.auto_commit)
            .field("additions", &self.additions.len())
            .field("deletions", &self.deletions.len())
            .field("updates", &self.updates.len())
            .finish_non_exhaustive()
    }
}

fn check_id(entry: &BackendEntry) -> Result<()> {
    match entry.id() {
        Id::Text(text) if text.is_empty() => Err(Error::invalid(format!(
            "{} entry needs a non-empty id",
            entry.element_type()
        ))),
        _ => Ok(()),
    }
}

/// The commit/rollback protocol shared by all transactions.
///
/// Implementors expose their [`TransactionCore`] and may override the
/// hooks [`prepare_commit`](Self::prepare_commit), [`reset`](Self::reset),
/// [`has_updates`](Self::has_updates) and [`after_read`](Self::after_read).
/// The generic write methods only buffer; typed writes of the
/// implementors call [`after_write`](Self::after_write) when they finish.
///
/// A transaction is owned by one unit of work and is not shared between
/// threads while in use.
pub trait AbstractTransaction {
    /// Returns the shared state.
    fn core(&self) -> &TransactionCore;

    /// Returns the shared state for modification.
    fn core_mut(&mut self) -> &mut TransactionCore;

    /// Turns implementor state into pending writes before a commit.
    ///
    /// # Errors
    ///
    /// Fails if that state can't be serialized.
    fn prepare_commit(&mut self) -> Result<()> {
        Ok(())
    }

    /// Drops implementor state not held in the core.
    fn reset(&mut self) {}

    /// Returns true if a commit would write anything.
    fn has_updates(&self) -> bool {
        self.core().has_updates()
    }

    /// Returns true if typed writes commit immediately.
    fn auto_commit(&self) -> bool {
        self.core().auto_commit
    }

    /// Sets whether typed writes commit immediately.
    fn set_auto_commit(&mut self, auto_commit: bool) {
        self.core_mut().auto_commit = auto_commit;
    }

    /// Runs a query against the store.
    ///
    /// Pending writes are committed first. Looked-up ids are converted to the
    /// graph's id representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQuery`] for an id or condition query naming
    /// neither, without touching the store. Fails if the pending writes
    /// can't be committed or the store fails.
    fn query(&mut self, query: BackendQuery) -> Result<Vec<BackendEntry>> {
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let kind = self.core().id_generator().kind();
        let query = self.core().serializer().write_query(query.with_id_kind(kind));
        self.before_read()?;

        let store = self.core().store();
        debug!(store = store.name(), %query, "query");
        let entries = store.query(&query)?;
        self.after_read(&entries)?;
        Ok(entries)
    }

    /// Looks up one record by id.
    ///
    /// # Errors
    ///
    /// Fails if the query fails.
    fn query_by_id(&mut self, element_type: ElementType, id: &Id) -> Result<Option<BackendEntry>> {
        let entries = self.query(IdQuery::single(element_type, id.clone()).into())?;
        Ok(entries.into_iter().next())
    }

    /// Looks up one record by id, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has the id.
    fn get(&mut self, element_type: ElementType, id: &Id) -> Result<BackendEntry> {
        self.query_by_id(element_type, id)?
            .ok_or_else(|| Error::not_found(element_type, id.as_string()))
    }

    /// Buffers a whole-record write.
    ///
    /// A pending addition of the same record is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the entry has an empty id.
    fn add_entry(&mut self, entry: BackendEntry) -> Result<()> {
        check_id(&entry)?;
        self.core_mut().additions.insert(entry);
        Ok(())
    }

    /// Buffers a whole-record removal.
    ///
    /// Pending additions and partial updates of the same record are
    /// dropped, so the net effect is the removal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the entry has an empty id.
    fn remove_entry(&mut self, entry: BackendEntry) -> Result<()> {
        check_id(&entry)?;
        let key = MutationKey::of(&entry);
        let core = self.core_mut();
        core.additions.remove(&key);
        core.updates.retain(|(pending, _)| MutationKey::of(pending) != key);
        core.deletions.insert(entry);
        Ok(())
    }

    /// Buffers the removal of the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the id is empty.
    fn remove_by_id(&mut self, element_type: ElementType, id: &Id) -> Result<()> {
        let entry = self.core().serializer().write_id(element_type, id);
        self.remove_entry(entry)
    }

    /// Buffers adding the entry's columns to an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the entry has an empty id.
    fn append_entry(&mut self, entry: BackendEntry) -> Result<()> {
        check_id(&entry)?;
        self.core_mut().updates.push((entry, MutateAction::Append));
        Ok(())
    }

    /// Buffers removing the entry's columns from an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the entry has an empty id.
    fn eliminate_entry(&mut self, entry: BackendEntry) -> Result<()> {
        check_id(&entry)?;
        self.core_mut().updates.push((entry, MutateAction::Eliminate));
        Ok(())
    }

    /// Writes the pending writes to the store in one backend transaction.
    ///
    /// Does nothing if nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommitFailed`] carrying the original error. The
    /// transaction has been rolled back by then.
    fn commit(&mut self) -> Result<()> {
        let result = commit_pending(self);
        result.map_err(|e| {
            error!(store = self.core().store().name(), error = %e, "commit failed, rolling back");
            if let Err(rollback) = self.rollback() {
                error!(store = self.core().store().name(), error = %rollback, "rollback failed");
            }
            Error::commit_failed(e)
        })
    }

    /// Drops the pending writes and closes the store's bracket.
    ///
    /// # Errors
    ///
    /// Fails if the store can't roll back. The pending writes are dropped
    /// either way.
    fn rollback(&mut self) -> Result<()> {
        self.reset();
        let core = self.core_mut();
        let discarded = core.pending_len();
        core.clear();
        debug!(store = core.store().name(), discarded, "rollback");
        core.store().rollback_tx()?;
        Ok(())
    }

    /// Commits, rolling back on failure.
    ///
    /// This is the driver used for auto-commit and for reads over pending
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommitFailed`] if the commit failed.
    fn commit_or_rollback(&mut self) -> Result<()> {
        debug!(store = self.core().store().name(), "commit or rollback");
        self.commit()
    }

    /// Commits pending writes so a read observes them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommitFailed`] if the commit failed.
    fn before_read(&mut self) -> Result<()> {
        if self.has_updates() {
            self.commit_or_rollback()?;
        }
        Ok(())
    }

    /// Called with the records a query returned.
    ///
    /// # Errors
    ///
    /// Implementors may reject the records.
    fn after_read(&mut self, _entries: &[BackendEntry]) -> Result<()> {
        Ok(())
    }

    /// Commits if auto-commit is on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommitFailed`] if the commit failed.
    fn after_write(&mut self) -> Result<()> {
        if self.auto_commit() {
            self.commit_or_rollback()?;
        }
        Ok(())
    }
}

fn commit_pending<T: AbstractTransaction + ?Sized>(tx: &mut T) -> Result<()> {
    tx.prepare_commit()?;
    let mutation = tx.core().mutation()?;
    if mutation.is_empty() {
        tx.core_mut().clear();
        return Ok(());
    }

    let store = Arc::clone(&tx.core().store);
    debug!(store = store.name(), records = mutation.len(), "commit");
    store.begin_tx()?;
    store.mutate(&mutation)?;
    tx.reset();
    tx.core_mut().clear();
    store.commit_tx()?;
    Ok(())
}
