//! Vertex and edge label definitions.

use serde::{Deserialize, Serialize};

use super::SchemaElement;
use crate::types::{ElementType, Id};

/// Definition of a vertex label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexLabel {
    /// The assigned id.
    pub id: Option<Id>,
    /// The label name.
    pub name: String,
    /// Property keys a vertex of this label may carry.
    pub properties: Vec<String>,
    /// Property keys whose values form the vertex's business key, in order.
    pub primary_keys: Vec<String>,
    /// Names of indexes built on this label.
    pub index_names: Vec<String>,
}

impl VertexLabel {
    /// Creates a new vertex label builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> VertexLabelBuilder {
        VertexLabelBuilder { name: name.into(), properties: Vec::new(), primary_keys: Vec::new() }
    }

    /// Returns true if vertices of this label may carry `property`.
    #[must_use]
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

impl SchemaElement for VertexLabel {
    fn element_type(&self) -> ElementType {
        ElementType::VertexLabel
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn index_names(&self) -> &[String] {
        &self.index_names
    }

    fn index_names_mut(&mut self) -> Option<&mut Vec<String>> {
        Some(&mut self.index_names)
    }
}

/// Builder for constructing [`VertexLabel`] instances.
#[derive(Debug)]
pub struct VertexLabelBuilder {
    name: String,
    properties: Vec<String>,
    primary_keys: Vec<String>,
}

impl VertexLabelBuilder {
    /// Add the property keys vertices of this label may carry.
    #[must_use]
    pub fn properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.extend(properties.into_iter().map(Into::into));
        self
    }

    /// Set the primary keys, in order.
    #[must_use]
    pub fn primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Build the vertex label. The id is assigned when it is added to a schema.
    #[must_use]
    pub fn build(self) -> VertexLabel {
        VertexLabel {
            id: None,
            name: self.name,
            properties: self.properties,
            primary_keys: self.primary_keys,
            index_names: Vec::new(),
        }
    }
}

/// How many edges of one label may join the same pair of vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Frequency {
    /// At most one edge per vertex pair.
    #[default]
    Single,
    /// Several edges per vertex pair, told apart by their sort keys.
    Multiple,
}

/// Definition of an edge label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLabel {
    /// The assigned id.
    pub id: Option<Id>,
    /// The label name.
    pub name: String,
    /// Label of the source vertices.
    pub source_label: String,
    /// Label of the target vertices.
    pub target_label: String,
    /// Edge multiplicity between one vertex pair.
    pub frequency: Frequency,
    /// Property keys an edge of this label may carry.
    pub properties: Vec<String>,
    /// Property keys whose values distinguish parallel edges, in order.
    pub sort_keys: Vec<String>,
    /// Names of indexes built on this label.
    pub index_names: Vec<String>,
}

impl EdgeLabel {
    /// Creates a new edge label builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EdgeLabelBuilder {
        EdgeLabelBuilder {
            name: name.into(),
            source_label: String::new(),
            target_label: String::new(),
            frequency: Frequency::default(),
            properties: Vec::new(),
            sort_keys: Vec::new(),
        }
    }

    /// Returns true if edges of this label may carry `property`.
    #[must_use]
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// Returns true if this label may join a `source` vertex label to a `target` one.
    #[must_use]
    pub fn links(&self, source: &str, target: &str) -> bool {
        self.source_label == source && self.target_label == target
    }
}

impl SchemaElement for EdgeLabel {
    fn element_type(&self) -> ElementType {
        ElementType::EdgeLabel
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn index_names(&self) -> &[String] {
        &self.index_names
    }

    fn index_names_mut(&mut self) -> Option<&mut Vec<String>> {
        Some(&mut self.index_names)
    }
}

/// Builder for constructing [`EdgeLabel`] instances.
#[derive(Debug)]
pub struct EdgeLabelBuilder {
    name: String,
    source_label: String,
    target_label: String,
    frequency: Frequency,
    properties: Vec<String>,
    sort_keys: Vec<String>,
}

impl EdgeLabelBuilder {
    /// Set the source and target vertex labels.
    #[must_use]
    pub fn link(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_label = source.into();
        self.target_label = target.into();
        self
    }

    /// Set the frequency.
    #[must_use]
    pub const fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Add the property keys edges of this label may carry.
    #[must_use]
    pub fn properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.extend(properties.into_iter().map(Into::into));
        self
    }

    /// Set the sort keys, in order.
    #[must_use]
    pub fn sort_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Build the edge label. The id is assigned when it is added to a schema.
    #[must_use]
    pub fn build(self) -> EdgeLabel {
        EdgeLabel {
            id: None,
            name: self.name,
            source_label: self.source_label,
            target_label: self.target_label,
            frequency: self.frequency,
            properties: self.properties,
            sort_keys: self.sort_keys,
            index_names: Vec::new(),
        }
    }
}
