//! Conversion between domain objects and backend entries.
//!
//! A [`Serializer`] turns vertices, edges and schema elements into
//! [`BackendEntry`] records and back, and rewrites queries into the form the
//! backends execute. [`BinarySerializer`] is the only implementation.

mod binary;

use std::fmt::Debug;

use quiverdb_core::query::BackendQuery;
use quiverdb_core::schema::{EdgeLabel, IndexLabel, PropertyKey, VertexLabel};
use quiverdb_core::{Edge, ElementType, Id, Vertex};

pub use binary::{columns, BinarySerializer};

use crate::engine::StorageResult;
use crate::entry::BackendEntry;

/// Converts domain objects to backend entries and back.
pub trait Serializer: Send + Sync + Debug {
    /// Rewrites a query into the form backends execute.
    fn write_query(&self, query: BackendQuery) -> BackendQuery;

    /// Returns an entry carrying only an identity, for deletions by id.
    fn write_id(&self, element_type: ElementType, id: &Id) -> BackendEntry;

    /// Serializes a vertex together with its incident edges.
    ///
    /// # Errors
    ///
    /// Fails if a property value can't be encoded.
    fn write_vertex(&self, vertex: &Vertex) -> StorageResult<BackendEntry>;

    /// Deserializes a vertex written by [`Serializer::write_vertex`].
    ///
    /// # Errors
    ///
    /// Fails if the entry is not a well-formed vertex record.
    fn read_vertex(&self, entry: &BackendEntry) -> StorageResult<Vertex>;

    /// Serializes one edge.
    ///
    /// # Errors
    ///
    /// Fails if a property value can't be encoded.
    fn write_edge(&self, edge: &Edge) -> StorageResult<BackendEntry>;

    /// Deserializes an edge written by [`Serializer::write_edge`].
    ///
    /// # Errors
    ///
    /// Fails if the entry is not a well-formed edge record.
    fn read_edge(&self, entry: &BackendEntry) -> StorageResult<Edge>;

    /// Serializes a property key.
    ///
    /// # Errors
    ///
    /// Fails if the property key has no id yet.
    fn write_property_key(&self, key: &PropertyKey) -> StorageResult<BackendEntry>;

    /// Deserializes a property key.
    ///
    /// # Errors
    ///
    /// Fails if the entry is not a well-formed property key record.
    fn read_property_key(&self, entry: &BackendEntry) -> StorageResult<PropertyKey>;

    /// Serializes a vertex label.
    ///
    /// # Errors
    ///
    /// Fails if the label has no id yet.
    fn write_vertex_label(&self, label: &VertexLabel) -> StorageResult<BackendEntry>;

    /// Deserializes a vertex label.
    ///
    /// # Errors
    ///
    /// Fails if the entry is not a well-formed vertex label record.
    fn read_vertex_label(&self, entry: &BackendEntry) -> StorageResult<VertexLabel>;

    /// Serializes an edge label.
    ///
    /// # Errors
    ///
    /// Fails if the label has no id yet.
    fn write_edge_label(&self, label: &EdgeLabel) -> StorageResult<BackendEntry>;

    /// Deserializes an edge label.
    ///
    /// # Errors
    ///
    /// Fails if the entry is not a well-formed edge label record.
    fn read_edge_label(&self, entry: &BackendEntry) -> StorageResult<EdgeLabel>;

    /// Serializes an index label.
    ///
    /// # Errors
    ///
    /// Fails if the index label has no id yet.
    fn write_index_label(&self, label: &IndexLabel) -> StorageResult<BackendEntry>;

    /// Deserializes an index label.
    ///
    /// # Errors
    ///
    /// Fails if the entry is not a well-formed index label record.
    fn read_index_label(&self, entry: &BackendEntry) -> StorageResult<IndexLabel>;

    /// Returns a partial entry carrying only index-name columns.
    ///
    /// Used with APPEND and ELIMINATE to change the index names of a label
    /// without rewriting it.
    fn write_index_names(&self, element_type: ElementType, id: &Id, names: &[String]) -> BackendEntry;
}
