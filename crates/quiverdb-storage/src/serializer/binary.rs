//! Binary serializer: one bincode-encoded column per field.

use std::collections::BTreeMap;

use quiverdb_core::query::{BackendQuery, IdQuery, SysKey};
use quiverdb_core::schema::{
    EdgeLabel, IndexLabel, IndexType, PropertyKey, SchemaElement, VertexLabel, SYSTEM_PREFIX,
};
use quiverdb_core::{Direction, Edge, ElementType, Id, Value, Vertex};
use serde::de::DeserializeOwned;

use super::Serializer;
use crate::engine::{StorageError, StorageResult};
use crate::entry::{decode, encode, BackendEntry};

/// Names of the columns that have no [`SysKey`].
pub mod columns {
    /// Prefix of the incident-edge columns of a vertex row.
    pub const EDGE: &str = "~edge";
    /// Data type of a property key.
    pub const DATA_TYPE: &str = "~data_type";
    /// Cardinality of a property key.
    pub const CARDINALITY: &str = "~cardinality";
    /// Property names of a label.
    pub const PROPERTIES: &str = "~properties";
    /// Primary keys of a vertex label.
    pub const PRIMARY_KEYS: &str = "~primary_keys";
    /// Source vertex label of an edge label.
    pub const SOURCE_LABEL: &str = "~source_label";
    /// Target vertex label of an edge label.
    pub const TARGET_LABEL: &str = "~target_label";
    /// Frequency of an edge label.
    pub const FREQUENCY: &str = "~frequency";
    /// Sort keys of an edge label.
    pub const SORT_KEYS: &str = "~sort_keys";
}

/// Serializer storing each field in its own bincode-encoded column.
///
/// User properties keep their names as column names; system fields use
/// `~`-prefixed names. A vertex row also carries its incident edges as
/// `~edge:<out|in>:<edge id>` columns, so a vertex and its edges are written
/// and read as one record.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinarySerializer;

impl BinarySerializer {
    /// Creates a binary serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn edge_column(direction: Direction, id: &Id) -> String {
        let side = match direction {
            Direction::In => Direction::In.as_str(),
            Direction::Out | Direction::Both => Direction::Out.as_str(),
        };
        format!("{}:{side}:{}", columns::EDGE, id.as_string())
    }

    fn schema_entry(element: &dyn SchemaElement) -> StorageResult<BackendEntry> {
        let id = element.id().ok_or_else(|| {
            StorageError::serialization(format!(
                "{} '{}' has no id",
                element.element_type(),
                element.name()
            ))
        })?;
        let mut entry = BackendEntry::new(element.element_type(), id.clone());
        entry.put_value(SysKey::Name.column(), &Value::from(element.name()))?;
        entry.put_members(SysKey::IndexNames.column(), element.index_names());
        Ok(entry)
    }

    fn put_properties<'a>(
        entry: &mut BackendEntry,
        properties: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> StorageResult<()> {
        for (name, value) in properties {
            entry.put_value(name.as_str(), value)?;
        }
        Ok(())
    }

    fn user_properties(entry: &BackendEntry) -> StorageResult<BTreeMap<String, Value>> {
        let mut properties = BTreeMap::new();
        for column in entry.columns().iter().filter(|c| !c.name.starts_with(SYSTEM_PREFIX)) {
            properties.insert(column.name.clone(), decode(&column.value)?);
        }
        Ok(properties)
    }
}

fn expect_type(entry: &BackendEntry, expected: ElementType) -> StorageResult<()> {
    if entry.element_type() == expected {
        Ok(())
    } else {
        Err(StorageError::serialization(format!(
            "expected a {expected} record, got a {} record",
            entry.element_type()
        )))
    }
}

fn required_value(entry: &BackendEntry, column: &str) -> StorageResult<Value> {
    entry.value(column)?.ok_or_else(|| missing(entry, column))
}

fn required_string(entry: &BackendEntry, column: &str) -> StorageResult<String> {
    match required_value(entry, column)? {
        Value::String(s) => Ok(s),
        other => Err(StorageError::serialization(format!(
            "column '{column}' holds {}, expected string",
            other.type_name()
        ))),
    }
}

fn required_typed<T: DeserializeOwned>(entry: &BackendEntry, column: &str) -> StorageResult<T> {
    entry.typed(column)?.ok_or_else(|| missing(entry, column))
}

fn missing(entry: &BackendEntry, column: &str) -> StorageError {
    StorageError::serialization(format!(
        "{} record '{}' has no '{column}' column",
        entry.element_type(),
        entry.id().as_string().escape_debug()
    ))
}

fn id_value(id: &Id) -> Value {
    match id {
        Id::Numeric(n) => Value::Int(*n),
        Id::Text(s) => Value::String(s.clone()),
    }
}

fn value_id(value: Value) -> StorageResult<Id> {
    match value {
        Value::Int(n) => Ok(Id::Numeric(n)),
        Value::String(s) => Ok(Id::Text(s)),
        other => Err(StorageError::serialization(format!(
            "{} can't be used as an id",
            other.type_name()
        ))),
    }
}

impl Serializer for BinarySerializer {
    fn write_query(&self, query: BackendQuery) -> BackendQuery {
        match query {
            BackendQuery::Condition(q) if q.conditions().is_empty() && !q.ids().is_empty() => {
                let mut ids = IdQuery::new(q.base.result_type);
                ids.base = q.base.clone();
                for id in q.ids() {
                    ids.query(id.clone());
                }
                BackendQuery::Ids(ids)
            }
            other => other,
        }
    }

    fn write_id(&self, element_type: ElementType, id: &Id) -> BackendEntry {
        BackendEntry::new(element_type, id.clone())
    }

    fn write_vertex(&self, vertex: &Vertex) -> StorageResult<BackendEntry> {
        let mut entry = BackendEntry::new(ElementType::Vertex, vertex.id.clone());
        entry.put_value(SysKey::Label.column(), &Value::from(vertex.label.as_str()))?;
        entry.put_value(SysKey::PrimaryValues.column(), &Value::from(vertex.name.as_str()))?;
        Self::put_properties(&mut entry, &vertex.properties)?;
        for edge in &vertex.edges {
            let column = Self::edge_column(vertex.direction_of(edge), &edge.id);
            entry.set_column(column, encode(&self.write_edge(edge)?)?);
        }
        Ok(entry)
    }

    fn read_vertex(&self, entry: &BackendEntry) -> StorageResult<Vertex> {
        expect_type(entry, ElementType::Vertex)?;
        let mut vertex = Vertex::new(
            entry.id().clone(),
            required_string(entry, SysKey::Label.column())?,
            required_string(entry, SysKey::PrimaryValues.column())?,
        );
        vertex.properties = Self::user_properties(entry)?;

        let prefix = format!("{}:", columns::EDGE);
        for column in entry.columns_with_prefix(&prefix) {
            let edge_entry: BackendEntry = decode(&column.value)?;
            vertex.add_edge(self.read_edge(&edge_entry)?);
        }
        Ok(vertex)
    }

    fn write_edge(&self, edge: &Edge) -> StorageResult<BackendEntry> {
        let mut entry = BackendEntry::new(ElementType::Edge, edge.id.clone());
        entry.put_value(SysKey::Label.column(), &Value::from(edge.label.as_str()))?;
        entry.put_value(SysKey::SortValues.column(), &Value::from(edge.name.as_str()))?;
        entry.put_value(SysKey::SourceVertex.column(), &id_value(&edge.source))?;
        entry.put_value(SysKey::TargetVertex.column(), &id_value(&edge.target))?;
        Self::put_properties(&mut entry, &edge.properties)?;
        Ok(entry)
    }

    fn read_edge(&self, entry: &BackendEntry) -> StorageResult<Edge> {
        expect_type(entry, ElementType::Edge)?;
        let mut edge = Edge::new(
            entry.id().clone(),
            required_string(entry, SysKey::Label.column())?,
            required_string(entry, SysKey::SortValues.column())?,
            value_id(required_value(entry, SysKey::SourceVertex.column())?)?,
            value_id(required_value(entry, SysKey::TargetVertex.column())?)?,
        );
        edge.properties = Self::user_properties(entry)?;
        Ok(edge)
    }

    fn write_property_key(&self, key: &PropertyKey) -> StorageResult<BackendEntry> {
        let mut entry = Self::schema_entry(key)?;
        entry.put_typed(columns::DATA_TYPE, &key.data_type)?;
        entry.put_typed(columns::CARDINALITY, &key.cardinality)?;
        Ok(entry)
    }

    fn read_property_key(&self, entry: &BackendEntry) -> StorageResult<PropertyKey> {
        expect_type(entry, ElementType::PropertyKey)?;
        Ok(PropertyKey {
            id: Some(entry.id().clone()),
            name: required_string(entry, SysKey::Name.column())?,
            data_type: required_typed(entry, columns::DATA_TYPE)?,
            cardinality: required_typed(entry, columns::CARDINALITY)?,
            index_names: entry.members(SysKey::IndexNames.column()),
        })
    }

    fn write_vertex_label(&self, label: &VertexLabel) -> StorageResult<BackendEntry> {
        let mut entry = Self::schema_entry(label)?;
        entry.put_typed(columns::PROPERTIES, &label.properties)?;
        entry.put_typed(columns::PRIMARY_KEYS, &label.primary_keys)?;
        Ok(entry)
    }

    fn read_vertex_label(&self, entry: &BackendEntry) -> StorageResult<VertexLabel> {
        expect_type(entry, ElementType::VertexLabel)?;
        Ok(VertexLabel {
            id: Some(entry.id().clone()),
            name: required_string(entry, SysKey::Name.column())?,
            properties: required_typed(entry, columns::PROPERTIES)?,
            primary_keys: required_typed(entry, columns::PRIMARY_KEYS)?,
            index_names: entry.members(SysKey::IndexNames.column()),
        })
    }

    fn write_edge_label(&self, label: &EdgeLabel) -> StorageResult<BackendEntry> {
        let mut entry = Self::schema_entry(label)?;
        entry.put_value(columns::SOURCE_LABEL, &Value::from(label.source_label.as_str()))?;
        entry.put_value(columns::TARGET_LABEL, &Value::from(label.target_label.as_str()))?;
        entry.put_typed(columns::FREQUENCY, &label.frequency)?;
        entry.put_typed(columns::PROPERTIES, &label.properties)?;
        entry.put_typed(columns::SORT_KEYS, &label.sort_keys)?;
        Ok(entry)
    }

    fn read_edge_label(&self, entry: &BackendEntry) -> StorageResult<EdgeLabel> {
        expect_type(entry, ElementType::EdgeLabel)?;
        Ok(EdgeLabel {
            id: Some(entry.id().clone()),
            name: required_string(entry, SysKey::Name.column())?,
            source_label: required_string(entry, columns::SOURCE_LABEL)?,
            target_label: required_string(entry, columns::TARGET_LABEL)?,
            frequency: required_typed(entry, columns::FREQUENCY)?,
            properties: required_typed(entry, columns::PROPERTIES)?,
            sort_keys: required_typed(entry, columns::SORT_KEYS)?,
            index_names: entry.members(SysKey::IndexNames.column()),
        })
    }

    fn write_index_label(&self, label: &IndexLabel) -> StorageResult<BackendEntry> {
        let mut entry = Self::schema_entry(label)?;
        entry.put_value(SysKey::BaseType.column(), &Value::from(label.base_type.as_str()))?;
        entry.put_value(SysKey::BaseValue.column(), &Value::from(label.base_value.as_str()))?;
        entry.put_value(SysKey::IndexType.column(), &Value::from(label.index_type.as_str()))?;
        entry.put_typed(SysKey::Fields.column(), &label.fields)?;
        Ok(entry)
    }

    fn read_index_label(&self, entry: &BackendEntry) -> StorageResult<IndexLabel> {
        expect_type(entry, ElementType::IndexLabel)?;
        let base_type = required_string(entry, SysKey::BaseType.column())?;
        let index_type = required_string(entry, SysKey::IndexType.column())?;
        Ok(IndexLabel {
            id: Some(entry.id().clone()),
            name: required_string(entry, SysKey::Name.column())?,
            base_type: ElementType::from_name(&base_type).ok_or_else(|| {
                StorageError::serialization(format!("unknown element type '{base_type}'"))
            })?,
            base_value: required_string(entry, SysKey::BaseValue.column())?,
            index_type: IndexType::from_name(&index_type).ok_or_else(|| {
                StorageError::serialization(format!("unknown index type '{index_type}'"))
            })?,
            fields: required_typed(entry, SysKey::Fields.column())?,
        })
    }

    fn write_index_names(&self, element_type: ElementType, id: &Id, names: &[String]) -> BackendEntry {
        let mut entry = BackendEntry::new(element_type, id.clone());
        entry.put_members(SysKey::IndexNames.column(), names);
        entry
    }
}
