//! Schema element writes and index label lifecycle.

use quiverdb_core::query::{BackendQuery, Condition, ConditionQuery, Query, SysKey};
use quiverdb_core::schema::{
    validate_schema_name, EdgeLabel, Frequency, IndexLabel, IndexType, PropertyKey,
    SchemaElement, VertexLabel,
};
use quiverdb_core::{ElementType, Id};
use quiverdb_storage::{BackendEntry, Serializer, StorageResult};
use tracing::{debug, info};

use super::{AbstractTransaction, TransactionCore};
use crate::error::{Error, Result};

/// A schema element with a record layout.
trait Stored: SchemaElement + Sized {
    const TYPE: ElementType;

    fn write(serializer: &dyn Serializer, element: &Self) -> StorageResult<BackendEntry>;

    fn read(serializer: &dyn Serializer, entry: &BackendEntry) -> StorageResult<Self>;
}

impl Stored for PropertyKey {
    const TYPE: ElementType = ElementType::PropertyKey;

    fn write(serializer: &dyn Serializer, element: &Self) -> StorageResult<BackendEntry> {
        serializer.write_property_key(element)
    }

    fn read(serializer: &dyn Serializer, entry: &BackendEntry) -> StorageResult<Self> {
        serializer.read_property_key(entry)
    }
}

impl Stored for VertexLabel {
    const TYPE: ElementType = ElementType::VertexLabel;

    fn write(serializer: &dyn Serializer, element: &Self) -> StorageResult<BackendEntry> {
        serializer.write_vertex_label(element)
    }

    fn read(serializer: &dyn Serializer, entry: &BackendEntry) -> StorageResult<Self> {
        serializer.read_vertex_label(entry)
    }
}

impl Stored for EdgeLabel {
    const TYPE: ElementType = ElementType::EdgeLabel;

    fn write(serializer: &dyn Serializer, element: &Self) -> StorageResult<BackendEntry> {
        serializer.write_edge_label(element)
    }

    fn read(serializer: &dyn Serializer, entry: &BackendEntry) -> StorageResult<Self> {
        serializer.read_edge_label(entry)
    }
}

impl Stored for IndexLabel {
    const TYPE: ElementType = ElementType::IndexLabel;

    fn write(serializer: &dyn Serializer, element: &Self) -> StorageResult<BackendEntry> {
        serializer.write_index_label(element)
    }

    fn read(serializer: &dyn Serializer, entry: &BackendEntry) -> StorageResult<Self> {
        serializer.read_index_label(entry)
    }
}

fn stored_id(element: &dyn SchemaElement) -> Result<Id> {
    element.id().cloned().ok_or_else(|| {
        Error::invalid(format!("{} '{}' has no id", element.element_type(), element.name()))
    })
}

/// A transaction over schema elements.
///
/// Elements are found by name. With a deterministic id generator the id is
/// derived from the name; otherwise the name is looked up with a `~name`
/// condition. Lookups commit pending writes first, like every read.
///
/// # Example
///
/// ```
/// use quiverdb::Graph;
/// use quiverdb_core::schema::{IndexLabel, PropertyKey, VertexLabel};
/// use quiverdb_core::ElementType;
///
/// let graph = Graph::in_memory().unwrap();
/// let mut schema = graph.schema();
/// for name in ["name", "age", "city"] {
///     schema.add_property_key(PropertyKey::builder(name).build()).unwrap();
/// }
/// schema
///     .add_vertex_label(
///         VertexLabel::builder("person").properties(["name", "age", "city"]).primary_keys(["name"]).build(),
///     )
///     .unwrap();
///
/// let by_age = IndexLabel::builder("personByAge").on(ElementType::VertexLabel, "person").by(["age"]).build();
/// schema.create_index_label(by_age).unwrap();
/// let by_age_city = IndexLabel::builder("personByAgeAndCity")
///     .on(ElementType::VertexLabel, "person")
///     .by(["age", "city"])
///     .build();
/// schema.create_index_label(by_age_city).unwrap();
///
/// // The narrower index was retired.
/// assert!(schema.get_index_label("personByAge").unwrap().is_none());
/// let person = schema.get_vertex_label("person").unwrap().unwrap();
/// assert_eq!(person.index_names, ["personByAgeAndCity"]);
/// ```
#[derive(Debug)]
pub struct SchemaTransaction {
    core: TransactionCore,
}

impl SchemaTransaction {
    /// Creates a transaction with no pending writes.
    #[must_use]
    pub fn new(core: TransactionCore) -> Self {
        Self { core }
    }

    /// Adds or replaces a property key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the name is not usable.
    pub fn add_property_key(&mut self, key: PropertyKey) -> Result<PropertyKey> {
        self.add_element(key)
    }

    /// Returns the property key with the given name.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub fn get_property_key(&mut self, name: &str) -> Result<Option<PropertyKey>> {
        self.find_element(name)
    }

    /// Returns the property keys with the given names, skipping missing ones.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub fn get_property_keys(&mut self, names: &[String]) -> Result<Vec<PropertyKey>> {
        let Some(condition) =
            names.iter().map(|n| Condition::eq(SysKey::Name, n.as_str())).reduce(Condition::or)
        else {
            return Ok(Vec::new());
        };
        let mut query = ConditionQuery::new(ElementType::PropertyKey);
        query.query(condition);
        self.read_elements(query.into())
    }

    /// Returns every property key.
    ///
    /// # Errors
    ///
    /// Fails if the scan fails.
    pub fn property_keys(&mut self) -> Result<Vec<PropertyKey>> {
        self.read_elements(Query::new(ElementType::PropertyKey).into())
    }

    /// Removes a property key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if it does not exist and
    /// [`Error::InvalidArgument`] if a vertex or edge label uses it.
    pub fn remove_property_key(&mut self, name: &str) -> Result<()> {
        let key: PropertyKey = self.require_element(name)?;
        if let Some(label) = self.vertex_labels()?.into_iter().find(|l| l.has_property(name)) {
            return Err(Error::invalid(format!(
                "property key '{name}' is used by vertex label '{}'",
                label.name
            )));
        }
        if let Some(label) = self.edge_labels()?.into_iter().find(|l| l.has_property(name)) {
            return Err(Error::invalid(format!(
                "property key '{name}' is used by edge label '{}'",
                label.name
            )));
        }
        self.remove_by_id(ElementType::PropertyKey, &stored_id(&key)?)?;
        debug!(name, "property key removed");
        self.after_write()
    }

    /// Adds or replaces a vertex label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the name is not usable, a
    /// property is not a defined property key, or a primary key is not one
    /// of the label's properties.
    pub fn add_vertex_label(&mut self, label: VertexLabel) -> Result<VertexLabel> {
        self.check_property_keys(&label.name, &label.properties)?;
        if let Some(key) = label.primary_keys.iter().find(|k| !label.has_property(k)) {
            return Err(Error::invalid(format!(
                "primary key '{key}' of vertex label '{}' is not one of its properties",
                label.name
            )));
        }
        self.add_element(label)
    }

    /// Returns the vertex label with the given name.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub fn get_vertex_label(&mut self, name: &str) -> Result<Option<VertexLabel>> {
        self.find_element(name)
    }

    /// Returns every vertex label.
    ///
    /// # Errors
    ///
    /// Fails if the scan fails.
    pub fn vertex_labels(&mut self) -> Result<Vec<VertexLabel>> {
        self.read_elements(Query::new(ElementType::VertexLabel).into())
    }

    /// Removes a vertex label and the index labels built on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if it does not exist and
    /// [`Error::InvalidArgument`] if an edge label links it.
    pub fn remove_vertex_label(&mut self, name: &str) -> Result<()> {
        let label: VertexLabel = self.require_element(name)?;
        let linked = self
            .edge_labels()?
            .into_iter()
            .find(|l| l.source_label == name || l.target_label == name);
        if let Some(edge_label) = linked {
            return Err(Error::invalid(format!(
                "vertex label '{name}' is linked by edge label '{}'",
                edge_label.name
            )));
        }
        self.remove_label(ElementType::VertexLabel, name, &stored_id(&label)?)
    }

    /// Adds or replaces an edge label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if a linked vertex label does not exist,
    /// and [`Error::InvalidArgument`] if the name is not usable, a property
    /// is not defined, or the sort keys don't fit the frequency.
    pub fn add_edge_label(&mut self, label: EdgeLabel) -> Result<EdgeLabel> {
        for vertex_label in [&label.source_label, &label.target_label] {
            self.require_element::<VertexLabel>(vertex_label)?;
        }
        self.check_property_keys(&label.name, &label.properties)?;
        if let Some(key) = label.sort_keys.iter().find(|k| !label.has_property(k)) {
            return Err(Error::invalid(format!(
                "sort key '{key}' of edge label '{}' is not one of its properties",
                label.name
            )));
        }
        match (label.frequency, label.sort_keys.is_empty()) {
            (Frequency::Single, false) => {
                return Err(Error::invalid(format!(
                    "edge label '{}' has single frequency and can't have sort keys",
                    label.name
                )));
            }
            (Frequency::Multiple, true) => {
                return Err(Error::invalid(format!(
                    "edge label '{}' has multiple frequency and needs sort keys",
                    label.name
                )));
            }
            _ => {}
        }
        self.add_element(label)
    }

    /// Returns the edge label with the given name.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub fn get_edge_label(&mut self, name: &str) -> Result<Option<EdgeLabel>> {
        self.find_element(name)
    }

    /// Returns every edge label.
    ///
    /// # Errors
    ///
    /// Fails if the scan fails.
    pub fn edge_labels(&mut self) -> Result<Vec<EdgeLabel>> {
        self.read_elements(Query::new(ElementType::EdgeLabel).into())
    }

    /// Removes an edge label and the index labels built on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if it does not exist.
    pub fn remove_edge_label(&mut self, name: &str) -> Result<()> {
        let label: EdgeLabel = self.require_element(name)?;
        self.remove_label(ElementType::EdgeLabel, name, &stored_id(&label)?)
    }

    /// Stores an index label as given.
    ///
    /// Unlike [`create_index_label`](Self::create_index_label) this neither
    /// validates the index nor updates the owning label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the name is not usable.
    pub fn add_index_label(&mut self, index: IndexLabel) -> Result<IndexLabel> {
        self.add_element(index)
    }

    /// Returns the index label with the given name.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub fn get_index_label(&mut self, name: &str) -> Result<Option<IndexLabel>> {
        self.find_element(name)
    }

    /// Returns the index labels built on one vertex or edge label.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub fn index_labels_of(
        &mut self,
        base_type: ElementType,
        base_value: &str,
    ) -> Result<Vec<IndexLabel>> {
        let mut query = ConditionQuery::new(ElementType::IndexLabel);
        query.eq(SysKey::BaseType, base_type.as_str()).eq(SysKey::BaseValue, base_value);
        self.read_elements(query.into())
    }

    /// Creates an index label and registers it with its owning label.
    ///
    /// Existing secondary indexes on the same label whose fields are a strict
    /// prefix of the new fields are retired. Search indexes neither retire
    /// nor get retired by secondary ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the owning label does not exist, and
    /// [`Error::InvalidArgument`] if:
    ///
    /// - the name is not usable or already taken
    /// - the owner is not a vertex or edge label
    /// - a field is missing, repeated, undefined or not a property of the owner
    /// - a search index has more than one field
    /// - an index of the same type and fields exists
    /// - the new secondary index is a prefix of an existing one
    pub fn create_index_label(&mut self, mut index: IndexLabel) -> Result<IndexLabel> {
        validate_schema_name(ElementType::IndexLabel, &index.name)?;
        let (owner_id, owner_properties) = match index.base_type {
            ElementType::VertexLabel => {
                let owner: VertexLabel = self.require_element(&index.base_value)?;
                (stored_id(&owner)?, owner.properties)
            }
            ElementType::EdgeLabel => {
                let owner: EdgeLabel = self.require_element(&index.base_value)?;
                (stored_id(&owner)?, owner.properties)
            }
            other => {
                return Err(Error::invalid(format!(
                    "index label '{}' can't be built on a {other}",
                    index.name
                )));
            }
        };

        if index.fields.is_empty() {
            return Err(Error::invalid(format!("index label '{}' needs fields", index.name)));
        }
        for (i, field) in index.fields.iter().enumerate() {
            if index.fields[..i].contains(field) {
                return Err(Error::invalid(format!(
                    "index label '{}' repeats field '{field}'",
                    index.name
                )));
            }
            if !owner_properties.contains(field) {
                return Err(Error::invalid(format!(
                    "field '{field}' of index label '{}' is not a property of '{}'",
                    index.name, index.base_value
                )));
            }
        }
        self.check_property_keys(&index.name, &index.fields)?;
        if index.index_type == IndexType::Search && index.fields.len() != 1 {
            return Err(Error::invalid(format!(
                "search index '{}' must have exactly one field, got {}",
                index.name,
                index.fields.len()
            )));
        }

        if self.find_entry(ElementType::IndexLabel, &index.name)?.is_some() {
            return Err(Error::invalid(format!("index label '{}' already exists", index.name)));
        }
        let mut retired = Vec::new();
        for existing in self.index_labels_of(index.base_type, &index.base_value)? {
            if existing.same_definition(&index) {
                return Err(Error::invalid(format!(
                    "index label '{}' duplicates '{}'",
                    index.name, existing.name
                )));
            }
            if existing.index_type != IndexType::Secondary || index.index_type != IndexType::Secondary
            {
                continue;
            }
            if index.is_prefix_of(&existing) {
                return Err(Error::invalid(format!(
                    "index label '{}' is a prefix of existing index '{}'",
                    index.name, existing.name
                )));
            }
            if existing.is_prefix_of(&index) {
                retired.push(existing);
            }
        }

        // Nothing is queued until the new index is fully built.
        let id = self.core.id_generator().schema_id(&index)?;
        index.set_id(id);
        let entry = self.core.serializer().write_index_label(&index)?;
        let retired_ids =
            retired.iter().map(|old| stored_id(old)).collect::<Result<Vec<_>>>()?;

        for (old, old_id) in retired.iter().zip(&retired_ids) {
            self.remove_by_id(ElementType::IndexLabel, old_id)?;
            self.eliminate_index_name(index.base_type, &owner_id, &old.name)?;
            info!(index = %old.name, by = %index.name, "index label retired");
        }
        self.add_entry(entry)?;
        self.append_index_name(index.base_type, &owner_id, &index.name)?;
        debug!(index = %index.name, base = %index.base_value, "index label created");
        self.after_write()?;
        Ok(index)
    }

    /// Removes an index label and unregisters it from its owning label.
    ///
    /// Does nothing if no index label has the name.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub fn remove_index_label(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.find_element::<IndexLabel>(name)? else {
            return Ok(());
        };
        let owner = self.find_entry(index.base_type, &index.base_value)?;
        self.remove_by_id(ElementType::IndexLabel, &stored_id(&index)?)?;
        if let Some(owner) = owner {
            self.eliminate_index_name(index.base_type, owner.id(), name)?;
        }
        debug!(index = name, "index label removed");
        self.after_write()
    }

    /// Registers `index_name` with the label an index is built on.
    ///
    /// The change is written as an APPEND of the index-name column, so the
    /// rest of the label record is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the owning label does not exist.
    pub fn update_schema_element(
        &mut self,
        base_type: ElementType,
        base_value: &str,
        index_name: &str,
    ) -> Result<()> {
        if !matches!(
            base_type,
            ElementType::VertexLabel | ElementType::EdgeLabel | ElementType::PropertyKey
        ) {
            return Err(Error::invalid(format!("a {base_type} carries no index names")));
        }
        let owner = self
            .find_entry(base_type, base_value)?
            .ok_or_else(|| Error::not_found(base_type, base_value))?;
        self.append_index_name(base_type, owner.id(), index_name)?;
        self.after_write()
    }

    fn append_index_name(&mut self, base_type: ElementType, owner: &Id, name: &str) -> Result<()> {
        let entry = self.core.serializer().write_index_names(base_type, owner, &[name.to_owned()]);
        self.append_entry(entry)
    }

    fn eliminate_index_name(&mut self, base_type: ElementType, owner: &Id, name: &str) -> Result<()> {
        let entry = self.core.serializer().write_index_names(base_type, owner, &[name.to_owned()]);
        self.eliminate_entry(entry)
    }

    fn remove_label(&mut self, element_type: ElementType, name: &str, id: &Id) -> Result<()> {
        for index in self.index_labels_of(element_type, name)? {
            self.remove_by_id(ElementType::IndexLabel, &stored_id(&index)?)?;
        }
        self.remove_by_id(element_type, id)?;
        debug!(label = name, %element_type, "label removed");
        self.after_write()
    }

    fn check_property_keys(&mut self, owner: &str, names: &[String]) -> Result<()> {
        let defined = self.get_property_keys(names)?;
        match names.iter().find(|n| !defined.iter().any(|k| &k.name == *n)) {
            Some(missing) => Err(Error::invalid(format!(
                "'{owner}' uses undefined property key '{missing}'"
            ))),
            None => Ok(()),
        }
    }

    fn add_element<E: Stored>(&mut self, mut element: E) -> Result<E> {
        validate_schema_name(E::TYPE, element.name())?;
        match self.find_entry(E::TYPE, element.name())? {
            Some(entry) => {
                let stored = E::read(self.core.serializer(), &entry)?;
                for name in stored.index_names() {
                    element.add_index_name(name);
                }
                element.set_id(entry.id().clone());
            }
            None if element.id().is_none() => {
                let id = self.core.id_generator().schema_id(&element)?;
                element.set_id(id);
            }
            None => {}
        }

        let entry = E::write(self.core.serializer(), &element)?;
        self.add_entry(entry)?;
        debug!(name = element.name(), element_type = %E::TYPE, "schema element added");
        self.after_write()?;
        Ok(element)
    }

    fn find_entry(&mut self, element_type: ElementType, name: &str) -> Result<Option<BackendEntry>> {
        let ids = self.core.id_generator();
        if ids.is_deterministic() {
            let id = ids.from_name(name)?;
            return self.query_by_id(element_type, &id);
        }
        let mut query = ConditionQuery::new(element_type);
        query.eq(SysKey::Name, name);
        Ok(self.query(query.into())?.into_iter().next())
    }

    fn find_element<E: Stored>(&mut self, name: &str) -> Result<Option<E>> {
        match self.find_entry(E::TYPE, name)? {
            Some(entry) => Ok(Some(E::read(self.core.serializer(), &entry)?)),
            None => Ok(None),
        }
    }

    fn require_element<E: Stored>(&mut self, name: &str) -> Result<E> {
        self.find_element(name)?.ok_or_else(|| Error::not_found(E::TYPE, name))
    }

    fn read_elements<E: Stored>(&mut self, query: BackendQuery) -> Result<Vec<E>> {
        let entries = self.query(query)?;
        let mut elements = Vec::with_capacity(entries.len());
        for entry in &entries {
            elements.push(E::read(self.core.serializer(), entry)?);
        }
        Ok(elements)
    }
}

impl AbstractTransaction for SchemaTransaction {
    fn core(&self) -> &TransactionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransactionCore {
        &mut self.core
    }
}
