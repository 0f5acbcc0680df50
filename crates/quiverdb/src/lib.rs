//! `QuiverDB` - Transactional Property-Graph Storage
//!
//! QuiverDB stores a property graph and its schema in pluggable key/value
//! backends. Every write goes through a transaction that buffers it in memory
//! and hands the store one conflict-resolved mutation at commit.
//!
//! # Features
//!
//! - **Schema**: Property keys, vertex labels, edge labels and index labels
//! - **Graph**: Vertices with primary-key ids, edges stored with both endpoints
//! - **Ids**: Deterministic spliced ids or Snowflake ids, chosen per graph
//! - **Backends**: In-memory maps or redb, on disk or in memory
//!
//! # Quick Start
//!
//! ## Opening a Graph
//!
//! ```no_run
//! use quiverdb::Graph;
//!
//! // Open or create a graph file
//! let graph = Graph::open_path("social.redb")?;
//!
//! // Or keep everything in memory
//! let graph = Graph::in_memory()?;
//! # Ok::<(), quiverdb::Error>(())
//! ```
//!
//! ## Defining a Schema
//!
//! ```
//! use quiverdb::transaction::AbstractTransaction;
//! use quiverdb::Graph;
//! use quiverdb_core::schema::{IndexLabel, PropertyKey, VertexLabel};
//! use quiverdb_core::ElementType;
//!
//! let graph = Graph::in_memory()?;
//! let mut schema = graph.schema();
//!
//! schema.add_property_key(PropertyKey::builder("name").build())?;
//! schema.add_property_key(PropertyKey::builder("age").build())?;
//! schema.add_vertex_label(
//!     VertexLabel::builder("person").properties(["name", "age"]).primary_keys(["name"]).build(),
//! )?;
//! schema.create_index_label(
//!     IndexLabel::builder("personByAge").on(ElementType::VertexLabel, "person").by(["age"]).build(),
//! )?;
//! schema.commit()?;
//!
//! let person = schema.get_vertex_label("person")?.expect("person label");
//! assert_eq!(person.index_names, vec!["personByAge".to_owned()]);
//! # Ok::<(), quiverdb::Error>(())
//! ```
//!
//! ## Writing Vertices and Edges
//!
//! ```
//! use quiverdb::transaction::AbstractTransaction;
//! use quiverdb::Graph;
//! use quiverdb_core::schema::{EdgeLabel, PropertyKey, VertexLabel};
//! use quiverdb_core::{Id, Value};
//!
//! let graph = Graph::in_memory()?;
//! let mut schema = graph.schema();
//! schema.add_property_key(PropertyKey::builder("name").build())?;
//! let person = schema.add_vertex_label(
//!     VertexLabel::builder("person").properties(["name"]).primary_keys(["name"]).build(),
//! )?;
//! let knows = schema.add_edge_label(EdgeLabel::builder("knows").link("person", "person").build())?;
//! schema.commit()?;
//!
//! let mut tx = graph.transaction();
//! let marko = tx.add_vertex(&person, [("name", Value::from("marko"))])?;
//! let josh = tx.add_vertex(&person, [("name", Value::from("josh"))])?;
//! tx.add_edge(&knows, &marko.id, &josh.id, Vec::<(String, Value)>::new())?;
//! tx.commit()?;
//!
//! assert_eq!(marko.id, Id::from("person\u{2}marko"));
//! assert_eq!(tx.get_vertex(&josh.id)?.edges.len(), 1);
//! # Ok::<(), quiverdb::Error>(())
//! ```
//!
//! # Crate Structure
//!
//! - [`quiverdb_core`] - Ids, graph elements, schema elements and queries
//! - [`quiverdb_storage`] - Backend records, mutations, serializers and stores
//! - `quiverdb` (this crate) - Transactions, configuration and the graph handle

#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod graph;
pub mod transaction;

pub use config::{BackendConfig, Config, ConfigBuilder};
pub use error::{Error, Result};
pub use graph::Graph;
pub use transaction::{AbstractTransaction, GraphTransaction, SchemaTransaction, TransactionCore};

pub use quiverdb_core;
pub use quiverdb_storage;
