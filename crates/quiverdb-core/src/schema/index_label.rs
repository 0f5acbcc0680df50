//! Index label definitions.

use serde::{Deserialize, Serialize};

use super::SchemaElement;
use crate::types::{ElementType, Id};

/// Type of index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexType {
    /// Exact-match index keyed by an ordered tuple of fields.
    #[default]
    Secondary,
    /// Range and full-text capable index over a single field.
    Search,
}

impl IndexType {
    /// Get a string representation of the index type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Secondary => "secondary",
            Self::Search => "search",
        }
    }

    /// Parses the name returned by [`IndexType::as_str`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Secondary, Self::Search].into_iter().find(|t| t.as_str() == name)
    }
}

/// Definition of an index over the fields of a vertex or edge label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexLabel {
    /// The assigned id.
    pub id: Option<Id>,
    /// The index name.
    pub name: String,
    /// Category of the indexed label.
    pub base_type: ElementType,
    /// Name of the indexed label.
    pub base_value: String,
    /// Type of index.
    pub index_type: IndexType,
    /// Indexed property keys, in order.
    pub fields: Vec<String>,
}

impl IndexLabel {
    /// Creates a new index label builder.
    ///
    /// # Example
    ///
    /// ```
    /// use quiverdb_core::schema::{IndexLabel, IndexType};
    /// use quiverdb_core::ElementType;
    ///
    /// let index = IndexLabel::builder("personByAgeAndCity")
    ///     .on(ElementType::VertexLabel, "person")
    ///     .by(["age", "city"])
    ///     .build();
    ///
    /// assert_eq!(index.index_type, IndexType::Secondary);
    /// assert!(index.is_composite());
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> IndexLabelBuilder {
        IndexLabelBuilder {
            name: name.into(),
            base_type: ElementType::VertexLabel,
            base_value: String::new(),
            index_type: IndexType::default(),
            fields: Vec::new(),
        }
    }

    /// Check if this index covers a specific field.
    #[must_use]
    pub fn covers_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Check if this is a composite (multi-field) index.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    /// Returns true if both indexes have the same type and the same fields in order.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.index_type == other.index_type && self.fields == other.fields
    }

    /// Returns true if this index's fields are a leading prefix of `other`'s.
    ///
    /// Equal field lists count as a prefix.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.fields.starts_with(&self.fields)
    }
}

impl SchemaElement for IndexLabel {
    fn element_type(&self) -> ElementType {
        ElementType::IndexLabel
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
}

/// Builder for constructing [`IndexLabel`] instances.
#[derive(Debug)]
pub struct IndexLabelBuilder {
    name: String,
    base_type: ElementType,
    base_value: String,
    index_type: IndexType,
    fields: Vec<String>,
}

impl IndexLabelBuilder {
    /// Set the indexed label.
    #[must_use]
    pub fn on(mut self, base_type: ElementType, base_value: impl Into<String>) -> Self {
        self.base_type = base_type;
        self.base_value = base_value.into();
        self
    }

    /// Add indexed fields, in order.
    #[must_use]
    pub fn by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Set the index type.
    #[must_use]
    pub const fn index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Shorthand for a search index.
    #[must_use]
    pub const fn search(self) -> Self {
        self.index_type(IndexType::Search)
    }

    /// Shorthand for a secondary index.
    #[must_use]
    pub const fn secondary(self) -> Self {
        self.index_type(IndexType::Secondary)
    }

    /// Build the index label. The id is assigned when it is added to a schema.
    #[must_use]
    pub fn build(self) -> IndexLabel {
        IndexLabel {
            id: None,
            name: self.name,
            base_type: self.base_type,
            base_value: self.base_value,
            index_type: self.index_type,
            fields: self.fields,
        }
    }
}
