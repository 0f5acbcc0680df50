//! Pending writes and their conflict resolution.
//!
//! A [`BackendMutation`] collects `(entry, action)` pairs per element. Every
//! new pair is checked against the pairs already pending for the same
//! element, so only the net effect reaches the backend:
//!
//! | new | pending | result |
//! |---|---|---|
//! | INSERT | INSERT, DELETE | pending dropped |
//! | INSERT | APPEND, ELIMINATE | incompatible |
//! | DELETE | INSERT | incompatible |
//! | DELETE | DELETE | new ignored |
//! | DELETE | APPEND, ELIMINATE | pending dropped |
//! | APPEND | INSERT, DELETE | incompatible |
//! | APPEND | same APPEND | new ignored |
//! | APPEND | same ELIMINATE | pending dropped |
//! | ELIMINATE | INSERT, DELETE | incompatible |
//! | ELIMINATE | same APPEND | pending dropped |
//! | ELIMINATE | same ELIMINATE | new ignored |
//!
//! Whole-record actions never mix with partial ones on the same element.

use std::collections::HashMap;
use std::fmt;

use quiverdb_core::{ElementType, Id};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::{StorageError, StorageResult};
use crate::entry::BackendEntry;

/// The verb applied to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutateAction {
    /// Write the whole record.
    Insert,
    /// Remove the whole record.
    Delete,
    /// Add columns to an existing record.
    Append,
    /// Remove columns from an existing record.
    Eliminate,
}

impl MutateAction {
    /// Returns true for actions on the whole record.
    #[must_use]
    pub const fn is_whole_entry(self) -> bool {
        matches!(self, Self::Insert | Self::Delete)
    }

    /// Returns the uppercase name of this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
            Self::Append => "APPEND",
            Self::Eliminate => "ELIMINATE",
        }
    }
}

impl fmt::Display for MutateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry paired with the action to apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateItem {
    /// The entry.
    pub entry: BackendEntry,
    /// The action.
    pub action: MutateAction,
}

impl MutateItem {
    /// Creates an item.
    #[must_use]
    pub const fn new(entry: BackendEntry, action: MutateAction) -> Self {
        Self { entry, action }
    }
}

/// Identity of a mutated record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MutationKey {
    /// The element category.
    pub element_type: ElementType,
    /// The record id.
    pub id: Id,
}

impl MutationKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(element_type: ElementType, id: Id) -> Self {
        Self { element_type, id }
    }

    /// Returns the key of an entry.
    #[must_use]
    pub fn of(entry: &BackendEntry) -> Self {
        Self::new(entry.element_type(), entry.id().clone())
    }
}

enum Resolution {
    Keep,
    DropPending,
    IgnoreNew,
}

/// Conflict-resolved pending writes, grouped per record.
///
/// Records are kept in the order they were first touched.
#[derive(Debug, Default, Clone)]
pub struct BackendMutation {
    updates: Vec<(MutationKey, Vec<MutateItem>)>,
    index: HashMap<MutationKey, usize>,
}

impl BackendMutation {
    /// Creates an empty mutation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action, resolving it against the actions pending for the same record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IncompatibleAction`] if a whole-record action
    /// meets a pending partial one or the reverse. The mutation is left
    /// unchanged in that case.
    pub fn add(&mut self, entry: BackendEntry, action: MutateAction) -> StorageResult<()> {
        let key = MutationKey::of(&entry);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.updates.push((key.clone(), Vec::new()));
                self.index.insert(key, self.updates.len() - 1);
                self.updates.len() - 1
            }
        };
        let items = &mut self.updates[slot].1;

        let mut ignore = false;
        let mut dropped = Vec::new();
        for (i, pending) in items.iter().enumerate() {
            match Self::resolve(&entry, action, pending)? {
                Resolution::Keep => {}
                Resolution::DropPending => dropped.push(i),
                Resolution::IgnoreNew => ignore = true,
            }
        }

        for i in dropped.into_iter().rev() {
            let removed = items.remove(i);
            trace!(id = %removed.entry.id().as_string().escape_debug(), dropped = %removed.action, by = %action, "pending action dropped");
        }
        if !ignore {
            items.push(MutateItem::new(entry, action));
        }
        Ok(())
    }

    fn resolve(
        entry: &BackendEntry,
        action: MutateAction,
        pending: &MutateItem,
    ) -> StorageResult<Resolution> {
        use MutateAction::{Append, Delete, Eliminate, Insert};

        let same = || pending.entry == *entry;
        let incompatible =
            || Err(StorageError::IncompatibleAction { new: action, existing: pending.action });

        match (action, pending.action) {
            (Insert, Insert | Delete) | (Delete, Append | Eliminate) => Ok(Resolution::DropPending),
            (Delete, Delete) => Ok(Resolution::IgnoreNew),
            (Insert, Append | Eliminate)
            | (Delete | Append | Eliminate, Insert)
            | (Append | Eliminate, Delete) => incompatible(),
            (Append, Append) | (Eliminate, Eliminate) if same() => Ok(Resolution::IgnoreNew),
            (Append, Eliminate) | (Eliminate, Append) if same() => Ok(Resolution::DropPending),
            (Append | Eliminate, Append | Eliminate) => Ok(Resolution::Keep),
        }
    }

    /// Replays every item of `other` through [`BackendMutation::add`].
    ///
    /// # Errors
    ///
    /// Returns the first conflict met. Items replayed before it stay applied.
    pub fn merge(&mut self, other: &Self) -> StorageResult<()> {
        for (_, items) in &other.updates {
            for item in items {
                self.add(item.entry.clone(), item.action)?;
            }
        }
        Ok(())
    }

    /// Iterates over the pending items per record, in first-touch order.
    pub fn mutation(&self) -> impl Iterator<Item = (&MutationKey, &[MutateItem])> {
        self.updates.iter().map(|(key, items)| (key, items.as_slice()))
    }

    /// Iterates over every pending item, in record then action order.
    pub fn items(&self) -> impl Iterator<Item = &MutateItem> {
        self.updates.iter().flat_map(|(_, items)| items.iter())
    }

    /// Returns the pending items of one record.
    #[must_use]
    pub fn get(&self, key: &MutationKey) -> &[MutateItem] {
        self.index.get(key).map_or(&[], |&slot| self.updates[slot].1.as_slice())
    }

    /// Returns true if no item is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.iter().all(|(_, items)| items.is_empty())
    }

    /// Returns the number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.iter().map(|(_, items)| items.len()).sum()
    }

    /// Discards the pending items of one record.
    pub fn reset(&mut self, key: &MutationKey) {
        if let Some(&slot) = self.index.get(key) {
            self.updates[slot].1.clear();
        }
    }

    /// Discards every pending item.
    pub fn clear(&mut self) {
        self.updates.clear();
        self.index.clear();
    }
}
