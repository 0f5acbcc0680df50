//! Redb storage backend.
//!
//! This module provides a backend store using Redb, a pure-Rust embedded
//! database with ACID transactions.
//!
//! # Example
//!
//! ```
//! use quiverdb_storage::backends::RedbStore;
//!
//! // Two logical stores in one in-memory database
//! let db = RedbStore::create_in_memory_database().unwrap();
//! let schema = RedbStore::with_database(db.clone(), "schema");
//! let graph = RedbStore::with_database(db, "graph");
//! ```
//!
//! Use [`RedbStore::create_database`] to open a database file instead.

mod store;
pub mod tables;

pub use store::RedbStore;
