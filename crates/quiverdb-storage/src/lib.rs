//! `QuiverDB` Storage
//!
//! This crate turns graph elements into backend records, resolves pending
//! writes into their net effect, and provides the backend stores that hold
//! the records.
//!
//! # Overview
//!
//! - [`BackendEntry`] - One stored record: element type, id and named columns
//! - [`BackendMutation`] - Pending `(entry, action)` pairs with conflict resolution
//! - [`BackendStore`] - Executes queries and applies mutations transactionally
//! - [`Serializer`] - Converts vertices, edges and schema elements to entries
//!
//! # Error Handling
//!
//! All storage operations return [`StorageResult<T>`], which is an alias for
//! `Result<T, StorageError>`.
//!
//! # Example
//!
//! ```
//! use quiverdb_core::query::IdQuery;
//! use quiverdb_core::{ElementType, Id, Vertex};
//! use quiverdb_storage::backends::InMemoryStore;
//! use quiverdb_storage::{BackendMutation, BackendStore, BinarySerializer, MutateAction, Serializer};
//!
//! let serializer = BinarySerializer::new();
//! let store = InMemoryStore::new("graph");
//!
//! let marko = Vertex::new(Id::from("person\u{2}marko"), "person", "marko").with_property("age", 29);
//! let mut mutation = BackendMutation::new();
//! mutation.add(serializer.write_vertex(&marko).unwrap(), MutateAction::Insert).unwrap();
//!
//! store.begin_tx().unwrap();
//! store.mutate(&mutation).unwrap();
//! store.commit_tx().unwrap();
//!
//! let query = IdQuery::single(ElementType::Vertex, marko.id.clone());
//! let entries = store.query(&query.into()).unwrap();
//! assert_eq!(serializer.read_vertex(&entries[0]).unwrap(), marko);
//! ```
//!
//! # Modules
//!
//! - [`entry`] - Backend records and column encoding
//! - [`mutation`] - Mutate actions and conflict resolution
//! - [`engine`] - Backend store traits and shared query evaluation
//! - [`serializer`] - Domain object conversion
//! - [`backends`] - In-memory and Redb stores

#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod engine;
pub mod entry;
pub mod mutation;
pub mod serializer;

pub use engine::{BackendStore, StorageError, StorageResult};
pub use entry::{BackendColumn, BackendEntry};
pub use mutation::{BackendMutation, MutateAction, MutateItem, MutationKey};
pub use serializer::{BinarySerializer, Serializer};
