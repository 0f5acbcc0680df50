//! Vertex and edge writes.

use std::collections::{BTreeMap, BTreeSet};

use quiverdb_core::id::concat_values;
use quiverdb_core::query::{BackendQuery, ConditionQuery, IdQuery, Query, SysKey};
use quiverdb_core::schema::{EdgeLabel, VertexLabel};
use quiverdb_core::{CoreError, Direction, Edge, ElementType, Id, Value, Vertex};
use tracing::debug;

use super::{AbstractTransaction, TransactionCore};
use crate::error::{Error, Result};

/// A transaction over vertices and the edges between them.
///
/// Vertices touched by this transaction live in an arena keyed by id; edges
/// refer to their endpoints by id and are stored with both of them. Written
/// vertices are staged and serialized only when the transaction commits.
///
/// # Example
///
/// ```
/// use quiverdb::transaction::AbstractTransaction;
/// use quiverdb::Graph;
/// use quiverdb_core::schema::{EdgeLabel, PropertyKey, VertexLabel};
/// use quiverdb_core::{Direction, Value};
///
/// let graph = Graph::in_memory().unwrap();
/// let mut schema = graph.schema();
/// schema.add_property_key(PropertyKey::builder("name").build()).unwrap();
/// let person = schema
///     .add_vertex_label(VertexLabel::builder("person").properties(["name"]).primary_keys(["name"]).build())
///     .unwrap();
/// let knows = schema
///     .add_edge_label(EdgeLabel::builder("knows").link("person", "person").build())
///     .unwrap();
/// schema.commit().unwrap();
///
/// let mut tx = graph.transaction();
/// let marko = tx.add_vertex(&person, [("name", Value::from("marko"))]).unwrap();
/// let vadas = tx.add_vertex(&person, [("name", Value::from("vadas"))]).unwrap();
/// tx.add_edge(&knows, &marko.id, &vadas.id, Vec::<(String, Value)>::new()).unwrap();
/// tx.commit().unwrap();
///
/// let edges = tx.edges_of(&vadas.id, Direction::In, Some("knows")).unwrap();
/// assert_eq!(edges[0].source, marko.id);
/// ```
#[derive(Debug)]
pub struct GraphTransaction {
    core: TransactionCore,
    vertices: BTreeMap<Id, Vertex>,
    staged: BTreeSet<Id>,
}

impl GraphTransaction {
    /// Creates a transaction with an empty write set.
    #[must_use]
    pub fn new(core: TransactionCore) -> Self {
        Self { core, vertices: BTreeMap::new(), staged: BTreeSet::new() }
    }

    /// Returns the number of vertices staged for the next commit.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Adds a vertex of `label`.
    ///
    /// The vertex name is built from the primary-key values in the order the
    /// label declares them, and the id from label and name. Adding a vertex
    /// that already exists, in this transaction or in the store, replaces its
    /// properties and keeps its edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a property sets the id, is not
    /// defined on the label, or a primary key has no value.
    pub fn add_vertex<I, K, V>(&mut self, label: &VertexLabel, properties: I) -> Result<Vertex>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let properties = collect_properties(properties, |key| label.has_property(key), &label.name)?;

        let mut primary_values = Vec::with_capacity(label.primary_keys.len());
        for key in &label.primary_keys {
            let value = properties.get(key).ok_or_else(|| {
                Error::invalid(format!(
                    "vertex label '{}' needs a value for primary key '{key}'",
                    label.name
                ))
            })?;
            primary_values.push(value.clone());
        }
        let ids = self.core.id_generator();
        let deterministic = ids.is_deterministic();
        if deterministic && primary_values.is_empty() {
            return Err(Error::invalid(format!(
                "vertex label '{}' has no primary keys to derive ids from",
                label.name
            )));
        }

        let name = concat_values(&primary_values)?;
        let id = ids.vertex_id(&label.name, &name)?;
        let mut vertex = Vertex::new(id.clone(), label.name.clone(), name);
        vertex.properties = properties;
        // Fresh ids from a non-deterministic generator can't be stored yet.
        if deterministic || self.vertices.contains_key(&id) {
            match self.load_vertex(&id) {
                Ok(existing) => vertex.edges = std::mem::take(&mut existing.edges),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        debug!(vertex = %id.as_string().escape_debug(), label = %label.name, "vertex added");
        self.vertices.insert(id.clone(), vertex.clone());
        self.staged.insert(id);
        self.after_write()?;
        Ok(vertex)
    }

    /// Adds an edge of `label` from `source` to `target`.
    ///
    /// Endpoints not yet in this transaction are loaded from the store. The
    /// edge is recorded outgoing on the source and incoming on the target;
    /// the source is staged and the target follows it at commit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if an endpoint does not exist, and
    /// [`Error::InvalidArgument`] if the endpoint labels don't match the
    /// edge label, a property is not defined on it, or a sort key has no
    /// value.
    pub fn add_edge<I, K, V>(
        &mut self,
        label: &EdgeLabel,
        source: &Id,
        target: &Id,
        properties: I,
    ) -> Result<Edge>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let properties = collect_properties(properties, |key| label.has_property(key), &label.name)?;

        let mut sort_values = Vec::with_capacity(label.sort_keys.len());
        for key in &label.sort_keys {
            let value = properties.get(key).ok_or_else(|| {
                Error::invalid(format!(
                    "edge label '{}' needs a value for sort key '{key}'",
                    label.name
                ))
            })?;
            sort_values.push(value.clone());
        }

        let source_label = self.load_vertex(source)?.label.clone();
        let target_label = self.load_vertex(target)?.label.clone();
        if !label.links(&source_label, &target_label) {
            return Err(Error::invalid(format!(
                "edge label '{}' links '{}' to '{}', not '{source_label}' to '{target_label}'",
                label.name, label.source_label, label.target_label
            )));
        }

        let name = concat_values(&sort_values)?;
        let id = self.core.id_generator().edge_id(source, &label.name, &name, target)?;
        let mut edge = Edge::new(id, label.name.clone(), name, source.clone(), target.clone());
        edge.properties = properties;

        for endpoint in [source, target] {
            if let Some(vertex) = self.vertices.get_mut(endpoint) {
                vertex.add_edge(edge.clone());
            }
        }
        debug!(edge = %edge.id.as_string().escape_debug(), label = %label.name, "edge added");
        self.staged.insert(source.clone());
        self.after_write()?;
        Ok(edge)
    }

    /// Removes a vertex and every edge incident to it.
    ///
    /// The other endpoints of those edges are rewritten without them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the vertex does not exist.
    pub fn remove_vertex(&mut self, id: &Id) -> Result<()> {
        let edges = self.load_vertex(id)?.edges.clone();
        for edge in &edges {
            let other = edge.other_end(id);
            if other == id {
                continue;
            }
            match self.load_vertex(other) {
                Ok(vertex) => {
                    vertex.remove_edge(&edge.id);
                    self.staged.insert(other.clone());
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        self.vertices.remove(id);
        self.staged.remove(id);
        self.remove_by_id(ElementType::Vertex, id)?;
        debug!(vertex = %id.as_string().escape_debug(), edges = edges.len(), "vertex removed");
        self.after_write()
    }

    /// Returns the vertices with the given ids, skipping missing ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQuery`] if `ids` is empty.
    pub fn query_vertices(&mut self, ids: &[Id]) -> Result<Vec<Vertex>> {
        let mut query = IdQuery::new(ElementType::Vertex);
        for id in ids {
            query.query(id.clone());
        }
        self.read_vertices(query.into())
    }

    /// Returns the vertex with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the vertex does not exist.
    pub fn get_vertex(&mut self, id: &Id) -> Result<Vertex> {
        self.query_vertices(std::slice::from_ref(id))?
            .pop()
            .ok_or_else(|| Error::not_found(ElementType::Vertex, id.as_string()))
    }

    /// Returns the vertices matching a condition query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the query is not over vertices,
    /// and [`Error::EmptyQuery`] if it names neither an id nor a condition.
    pub fn query_vertices_by(&mut self, query: ConditionQuery) -> Result<Vec<Vertex>> {
        if query.base.result_type != ElementType::Vertex {
            return Err(Error::invalid(format!(
                "expected a vertex query, got a {} query",
                query.base.result_type
            )));
        }
        self.read_vertices(query.into())
    }

    /// Returns the edges with the given ids, skipping missing ones.
    ///
    /// Each edge is read from its source vertex, found by splitting the edge
    /// id. Without splittable ids every vertex is scanned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQuery`] if `ids` is empty.
    pub fn query_edges(&mut self, ids: &[Id]) -> Result<Vec<Edge>> {
        if ids.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let mut owners = ConditionQuery::new(ElementType::Vertex);
        let mut scan = false;
        for id in ids {
            match self.core.id_generator().split(id) {
                Ok(parts) => match parts.into_iter().next() {
                    Some(owner) => {
                        owners.query_id(owner);
                    }
                    None => scan = true,
                },
                Err(CoreError::Unsupported(_)) => scan = true,
                Err(e) => return Err(e.into()),
            }
        }
        let query = if scan {
            BackendQuery::from(Query::new(ElementType::Vertex))
        } else {
            owners.into()
        };

        let mut found = BTreeMap::new();
        for vertex in self.read_vertices(query)? {
            for edge in vertex.edges {
                if ids.contains(&edge.id) {
                    found.entry(edge.id.clone()).or_insert(edge);
                }
            }
        }
        let mut edges = Vec::with_capacity(found.len());
        for id in ids {
            if let Some(edge) = found.remove(id) {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    /// Returns the edges of a vertex in `direction`, optionally of one label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the vertex does not exist.
    pub fn edges_of(
        &mut self,
        vertex: &Id,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<Edge>> {
        let vertex = self.get_vertex(vertex)?;
        Ok(vertex
            .edges(direction)
            .filter(|e| label.map_or(true, |l| e.label == l))
            .cloned()
            .collect())
    }

    fn read_vertices(&mut self, query: BackendQuery) -> Result<Vec<Vertex>> {
        let entries = self.query(query)?;
        let serializer = self.core.serializer();
        let mut vertices = Vec::with_capacity(entries.len());
        for entry in &entries {
            vertices.push(serializer.read_vertex(entry)?);
        }
        Ok(vertices)
    }

    /// Returns the arena copy of a vertex, loading it from the store first if
    /// needed.
    ///
    /// The store is read directly so pending writes stay pending.
    fn load_vertex(&mut self, id: &Id) -> Result<&mut Vertex> {
        if !self.vertices.contains_key(id) {
            if self.core.pending_deletion(ElementType::Vertex, id) {
                return Err(Error::not_found(ElementType::Vertex, id.as_string()));
            }
            let query = self
                .core
                .serializer()
                .write_query(IdQuery::single(ElementType::Vertex, id.clone()).into());
            let entry = self
                .core
                .store()
                .query(&query)?
                .into_iter()
                .next()
                .ok_or_else(|| Error::not_found(ElementType::Vertex, id.as_string()))?;
            let vertex = self.core.serializer().read_vertex(&entry)?;
            self.vertices.insert(id.clone(), vertex);
        }
        self.vertices
            .get_mut(id)
            .ok_or_else(|| Error::not_found(ElementType::Vertex, id.as_string()))
    }
}

/// Validates user properties against a label's definition.
fn collect_properties<I, K, V>(
    properties: I,
    defined: impl Fn(&str) -> bool,
    label: &str,
) -> Result<BTreeMap<String, Value>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let mut collected = BTreeMap::new();
    for (key, value) in properties {
        let key = key.into();
        if key == SysKey::Id.column() {
            return Err(Error::invalid(format!(
                "can't set '{key}' on an element of label '{label}', ids are generated"
            )));
        }
        if !defined(&key) {
            return Err(Error::invalid(format!("label '{label}' has no property '{key}'")));
        }
        collected.insert(key, value.into());
    }
    Ok(collected)
}

impl AbstractTransaction for GraphTransaction {
    fn core(&self) -> &TransactionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransactionCore {
        &mut self.core
    }

    /// Stages every vertex reachable from a staged one over outgoing edges
    /// and turns the staged vertices into additions.
    fn prepare_commit(&mut self) -> Result<()> {
        let mut pending: Vec<Id> = self.staged.iter().cloned().collect();
        let mut closed = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if !closed.insert(id.clone()) {
                continue;
            }
            if let Some(vertex) = self.vertices.get(&id) {
                pending.extend(vertex.out_neighbors().into_iter().filter(|t| !closed.contains(t)));
            }
        }

        let serializer = self.core.serializer();
        let mut entries = Vec::with_capacity(closed.len());
        for id in &closed {
            if let Some(vertex) = self.vertices.get(id) {
                entries.push(serializer.write_vertex(vertex)?);
            }
        }
        if !entries.is_empty() {
            debug!(staged = self.staged.len(), written = entries.len(), "vertices prepared");
        }
        for entry in entries {
            self.add_entry(entry)?;
        }
        self.staged.clear();
        Ok(())
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.staged.clear();
    }

    fn has_updates(&self) -> bool {
        !self.staged.is_empty() || self.core.has_updates()
    }
}
