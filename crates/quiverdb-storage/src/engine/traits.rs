//! Core backend store trait.

use std::fmt::Debug;

use quiverdb_core::query::BackendQuery;

use super::StorageResult;
use crate::entry::BackendEntry;
use crate::mutation::BackendMutation;

/// A store that executes backend queries and applies mutations.
///
/// Stores are shared between transactions, so every method takes `&self`
/// and implementations must be thread-safe (`Send + Sync`).
///
/// Mutations applied between [`BackendStore::begin_tx`] and
/// [`BackendStore::commit_tx`] become visible together at commit, or not at
/// all after [`BackendStore::rollback_tx`]. Mutations applied outside a
/// backend transaction take effect immediately.
///
/// # Example
///
/// ```ignore
/// use quiverdb_storage::{BackendMutation, BackendStore, MutateAction};
///
/// fn write(store: &dyn BackendStore, mutation: &BackendMutation) -> StorageResult<()> {
///     store.begin_tx()?;
///     if let Err(e) = store.mutate(mutation) {
///         store.rollback_tx()?;
///         return Err(e);
///     }
///     store.commit_tx()
/// }
/// ```
pub trait BackendStore: Send + Sync + Debug {
    /// Returns the store name.
    fn name(&self) -> &str;

    /// Returns the records matching `query`.
    ///
    /// Reads see committed records only.
    ///
    /// # Errors
    ///
    /// Returns an error if the records can't be read or decoded.
    fn query(&self, query: &BackendQuery) -> StorageResult<Vec<BackendEntry>>;

    /// Applies every pending item of `mutation`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`](super::StorageError::NotFound) for a
    /// partial update of a missing record. Inside a backend transaction,
    /// errors may also surface at commit.
    fn mutate(&self, mutation: &BackendMutation) -> StorageResult<()>;

    /// Begins a backend transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`](super::StorageError::Transaction)
    /// if one is already open.
    fn begin_tx(&self) -> StorageResult<()>;

    /// Makes the mutations of the open backend transaction durable.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open or the write fails. The
    /// transaction is closed either way and nothing is written on failure.
    fn commit_tx(&self) -> StorageResult<()>;

    /// Discards the mutations of the open backend transaction.
    ///
    /// Rolling back with no open transaction is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to discard the changes.
    fn rollback_tx(&self) -> StorageResult<()>;

    /// Removes every record of this store.
    ///
    /// # Errors
    ///
    /// Returns an error if the records can't be removed.
    fn clear(&self) -> StorageResult<()>;
}
