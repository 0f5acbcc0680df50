//! Graph elements: vertices and the edges between them.
//!
//! Edges refer to their endpoints by [`Id`], never by a live reference, so a
//! set of vertices can be held in a plain map keyed by id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Direction, Id, Value};

/// A vertex with its properties and incident edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// The vertex id.
    pub id: Id,
    /// The vertex label name.
    pub label: String,
    /// The business key built from the label's primary-key values.
    pub name: String,
    /// Property values by property key name.
    pub properties: BTreeMap<String, Value>,
    /// Incident edges, each stored once.
    pub edges: Vec<Edge>,
}

impl Vertex {
    /// Creates a vertex without properties or edges.
    #[must_use]
    pub fn new(id: Id, label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            name: name.into(),
            properties: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a property (builder pattern).
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns a property value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Attaches an edge, replacing any edge with the same id.
    pub fn add_edge(&mut self, edge: Edge) {
        match self.edges.iter_mut().find(|e| e.id == edge.id) {
            Some(existing) => *existing = edge,
            None => self.edges.push(edge),
        }
    }

    /// Detaches the edge with the given id.
    pub fn remove_edge(&mut self, id: &Id) -> Option<Edge> {
        let pos = self.edges.iter().position(|e| &e.id == id)?;
        Some(self.edges.remove(pos))
    }

    /// Returns the direction of `edge` as seen from this vertex.
    #[must_use]
    pub fn direction_of(&self, edge: &Edge) -> Direction {
        match (edge.source == self.id, edge.target == self.id) {
            (true, true) => Direction::Both,
            (true, false) => Direction::Out,
            _ => Direction::In,
        }
    }

    /// Iterates over incident edges in the given direction.
    pub fn edges(&self, direction: Direction) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| direction.matches(self.direction_of(e)))
    }

    /// Returns the ids of the vertices reached by outgoing edges.
    #[must_use]
    pub fn out_neighbors(&self) -> Vec<Id> {
        self.edges(Direction::Out).map(|e| e.target.clone()).collect()
    }
}

/// A directed edge between two vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// The edge id.
    pub id: Id,
    /// The edge label name.
    pub label: String,
    /// The sort key built from the label's sort-key values.
    pub name: String,
    /// The source vertex id.
    pub source: Id,
    /// The target vertex id.
    pub target: Id,
    /// Property values by property key name.
    pub properties: BTreeMap<String, Value>,
}

impl Edge {
    /// Creates an edge without properties.
    #[must_use]
    pub fn new(
        id: Id,
        label: impl Into<String>,
        name: impl Into<String>,
        source: Id,
        target: Id,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            name: name.into(),
            source,
            target,
            properties: BTreeMap::new(),
        }
    }

    /// Adds a property (builder pattern).
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the endpoint opposite to `vertex`.
    #[must_use]
    pub fn other_end(&self, vertex: &Id) -> &Id {
        if &self.source == vertex {
            &self.target
        } else {
            &self.source
        }
    }
}
