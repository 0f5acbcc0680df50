//! `QuiverDB` Core
//!
//! This crate provides the storage-independent building blocks of `QuiverDB`,
//! a property-graph store over pluggable key/value backends.
//!
//! # Overview
//!
//! - **Identifiers**: [`Id`], numeric or textual, with sort-preserving bytes
//! - **Graph elements**: [`Vertex`] and [`Edge`], edges referencing vertices by id
//! - **Values**: [`Value`] for properties and condition operands
//! - **Schema**: property keys, vertex/edge labels and index labels in [`schema`]
//! - **Id generation**: Snowflake and splicing strategies in [`id`]
//! - **Queries**: [`query::ConditionQuery`] and friends in [`query`]
//!
//! # Example
//!
//! ```
//! use quiverdb_core::id::{concat_values, IdConfig, IdGeneratorFactory};
//! use quiverdb_core::{Id, Value, Vertex};
//!
//! let ids = IdGeneratorFactory::build(&IdConfig::splicing()).unwrap();
//!
//! let name = concat_values(&[Value::from("marko")]).unwrap();
//! let id = ids.vertex_id("person", &name).unwrap();
//! let marko = Vertex::new(id, "person", name).with_property("age", 29i64);
//!
//! assert_eq!(marko.id, Id::from("person\u{2}marko"));
//! assert_eq!(marko.property("age"), Some(&Value::Int(29)));
//! ```

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod id;
pub mod query;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use id::IdGenerator;
pub use types::{Direction, Edge, ElementType, Id, IdKind, Value, Vertex};
