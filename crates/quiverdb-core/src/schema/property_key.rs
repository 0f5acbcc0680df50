//! Property key definitions.

use serde::{Deserialize, Serialize};

use super::SchemaElement;
use crate::types::{ElementType, Id, Value};

/// The data type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataType {
    /// Booleans.
    Bool,
    /// 64-bit integers.
    Int,
    /// 64-bit floats.
    Float,
    /// UTF-8 text.
    #[default]
    Text,
    /// Raw bytes.
    Blob,
}

impl DataType {
    /// Returns true if `value` is a valid value of this type.
    ///
    /// Integers are accepted where floats are expected.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::Float, Value::Float(_) | Value::Int(_))
                | (Self::Text, Value::String(_))
                | (Self::Blob, Value::Bytes(_))
        )
    }
}

/// How many values a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    /// Exactly one value.
    #[default]
    Single,
    /// An ordered list that allows duplicates.
    List,
    /// A set of distinct values.
    Set,
}

/// Definition of a property key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyKey {
    /// The assigned id.
    pub id: Option<Id>,
    /// The key name.
    pub name: String,
    /// The value type.
    pub data_type: DataType,
    /// The value cardinality.
    pub cardinality: Cardinality,
    /// Names of indexes built on this key.
    pub index_names: Vec<String>,
}

impl PropertyKey {
    /// Creates a new property key builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PropertyKeyBuilder {
        PropertyKeyBuilder {
            name: name.into(),
            data_type: DataType::default(),
            cardinality: Cardinality::default(),
        }
    }

    /// Returns true if `value` is valid for this key.
    ///
    /// Multi-valued keys accept arrays whose members are all valid.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self.cardinality, value) {
            (Cardinality::Single, v) => self.data_type.accepts(v),
            (_, Value::Array(values)) => values.iter().all(|v| self.data_type.accepts(v)),
            (_, v) => self.data_type.accepts(v),
        }
    }
}

impl SchemaElement for PropertyKey {
    fn element_type(&self) -> ElementType {
        ElementType::PropertyKey
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

/// Builder for constructing [`PropertyKey`] instances.
#[derive(Debug)]
pub struct PropertyKeyBuilder {
    name: String,
    data_type: DataType,
    cardinality: Cardinality,
}

impl PropertyKeyBuilder {
    /// Set the data type.
    #[must_use]
    pub const fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Set the cardinality.
    #[must_use]
    pub const fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Build the property key. The id is assigned when it is added to a schema.
    #[must_use]
    pub fn build(self) -> PropertyKey {
        PropertyKey {
            id: None,
            name: self.name,
            data_type: self.data_type,
            cardinality: self.cardinality,
            index_names: Vec::new(),
        }
    }
}
