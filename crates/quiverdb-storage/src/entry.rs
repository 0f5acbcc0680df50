//! Backend-ready records.
//!
//! A [`BackendEntry`] is one stored record: an element category, an id and a
//! sorted list of named columns holding encoded bytes. Entries compare equal
//! when their contents are equal.
//!
//! Multi-valued fields are stored one column per member, named
//! `<field>:<member>`, so members can be appended or eliminated without
//! rewriting the record.

use quiverdb_core::query::{RelationKey, SysKey};
use quiverdb_core::{ElementType, Id, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::engine::StorageResult;

/// Separator between a multi-valued field and one of its members.
pub const MEMBER_SEPARATOR: char = ':';

/// Encodes a serde value with the standard bincode configuration.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`](crate::StorageError::Serialization) on failure.
pub fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?)
}

/// Decodes a serde value encoded by [`encode`].
///
/// # Errors
///
/// Returns [`StorageError::Serialization`](crate::StorageError::Serialization) on failure.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}

/// One named column of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendColumn {
    /// The column name.
    pub name: String,
    /// The encoded column value.
    pub value: Vec<u8>,
}

/// A record addressed by `(element_type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEntry {
    element_type: ElementType,
    id: Id,
    columns: Vec<BackendColumn>,
}

impl BackendEntry {
    /// Creates an entry with no columns.
    #[must_use]
    pub const fn new(element_type: ElementType, id: Id) -> Self {
        Self { element_type, id, columns: Vec::new() }
    }

    /// Returns the element category.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Returns the record id.
    #[must_use]
    pub const fn id(&self) -> &Id {
        &self.id
    }

    /// Returns the columns sorted by name.
    #[must_use]
    pub fn columns(&self) -> &[BackendColumn] {
        &self.columns
    }

    /// Returns true if the entry has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column named `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&BackendColumn> {
        self.position(name).ok().map(|i| &self.columns[i])
    }

    /// Sets a column, replacing any column with the same name.
    pub fn set_column(&mut self, name: impl Into<String>, value: Vec<u8>) {
        let name = name.into();
        match self.position(&name) {
            Ok(i) => self.columns[i].value = value,
            Err(i) => self.columns.insert(i, BackendColumn { name, value }),
        }
    }

    /// Removes a column. Returns true if it was present.
    pub fn remove_column(&mut self, name: &str) -> bool {
        match self.position(name) {
            Ok(i) => {
                self.columns.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Iterates over the columns whose names start with `prefix`.
    pub fn columns_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a BackendColumn> + 'a {
        let start = self.columns.partition_point(|c| c.name.as_str() < prefix);
        self.columns[start..].iter().take_while(move |c| c.name.starts_with(prefix))
    }

    /// Stores a [`Value`] column.
    ///
    /// # Errors
    ///
    /// Fails if the value can't be encoded.
    pub fn put_value(&mut self, name: impl Into<String>, value: &Value) -> StorageResult<()> {
        self.set_column(name, encode(value)?);
        Ok(())
    }

    /// Reads a [`Value`] column.
    ///
    /// # Errors
    ///
    /// Fails if the column holds bytes that are not an encoded value.
    pub fn value(&self, name: &str) -> StorageResult<Option<Value>> {
        self.column(name).map(|c| decode(&c.value)).transpose()
    }

    /// Stores a column holding any serde value.
    ///
    /// # Errors
    ///
    /// Fails if the value can't be encoded.
    pub fn put_typed<T: Serialize>(&mut self, name: impl Into<String>, value: &T) -> StorageResult<()> {
        self.set_column(name, encode(value)?);
        Ok(())
    }

    /// Reads a column written by [`BackendEntry::put_typed`].
    ///
    /// # Errors
    ///
    /// Fails if the column can't be decoded as `T`.
    pub fn typed<T: DeserializeOwned>(&self, name: &str) -> StorageResult<Option<T>> {
        self.column(name).map(|c| decode(&c.value)).transpose()
    }

    /// Adds one column per member of the multi-valued `field`.
    pub fn put_members<S: AsRef<str>>(&mut self, field: &str, members: &[S]) {
        for member in members {
            self.set_column(member_column(field, member.as_ref()), Vec::new());
        }
    }

    /// Returns the members of the multi-valued `field`, sorted.
    #[must_use]
    pub fn members(&self, field: &str) -> Vec<String> {
        let prefix = format!("{field}{MEMBER_SEPARATOR}");
        self.columns_with_prefix(&prefix).map(|c| c.name[prefix.len()..].to_owned()).collect()
    }

    /// Upserts every column of `other` into this entry.
    pub fn merge(&mut self, other: &Self) {
        for column in &other.columns {
            self.set_column(column.name.clone(), column.value.clone());
        }
    }

    /// Removes every column named in `other` from this entry.
    pub fn eliminate(&mut self, other: &Self) {
        for column in &other.columns {
            self.remove_column(&column.name);
        }
    }

    /// Returns the stored value of `key` for condition evaluation.
    ///
    /// Multi-valued fields are returned as an array of their members.
    /// Columns that can't be decoded are treated as missing.
    #[must_use]
    pub fn lookup(&self, key: &RelationKey) -> Option<Value> {
        match key {
            RelationKey::Sys(SysKey::Id) => Some(match &self.id {
                Id::Numeric(n) => Value::Int(*n),
                Id::Text(s) => Value::String(s.clone()),
            }),
            RelationKey::Sys(sys) => {
                let name = sys.column();
                if let Ok(Some(value)) = self.value(name) {
                    return Some(value);
                }
                let members = self.members(name);
                (!members.is_empty())
                    .then(|| Value::Array(members.into_iter().map(Value::String).collect()))
            }
            RelationKey::User(name) => self.value(name).ok().flatten(),
        }
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.columns.binary_search_by(|c| c.name.as_str().cmp(name))
    }
}

/// Returns the column name of one member of a multi-valued field.
#[must_use]
pub fn member_column(field: &str, member: &str) -> String {
    format!("{field}{MEMBER_SEPARATOR}{member}")
}
