//! Queries filtered by conditions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Condition, Query, Relation, RelationKey, RelationType, SysKey};
use crate::error::{CoreError, CoreResult};
use crate::id::concat_values;
use crate::types::{ElementType, Id, IdKind, Value};

/// A query matching elements by ids and conditions.
///
/// Conditions are AND-combined and deduplicated by structural equality. An
/// equality relation on [`SysKey::Id`] is turned into an id lookup as soon as
/// it is added.
///
/// # Example
///
/// ```
/// use quiverdb_core::query::{ConditionQuery, SysKey};
/// use quiverdb_core::{ElementType, Id};
///
/// let mut query = ConditionQuery::new(ElementType::Vertex);
/// query.eq(SysKey::Label, "person").gt("age", 20).eq(SysKey::Id, "person\u{2}marko");
///
/// assert_eq!(query.ids(), [Id::from("person\u{2}marko")]);
/// assert_eq!(query.conditions().len(), 2);
/// assert_eq!(query.userprop_keys(), ["age"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionQuery {
    /// Category and paging.
    pub base: Query,
    ids: Vec<Id>,
    conditions: Vec<Condition>,
}

impl ConditionQuery {
    /// Creates a query over `result_type` with no ids or conditions.
    #[must_use]
    pub const fn new(result_type: ElementType) -> Self {
        Self { base: Query::new(result_type), ids: Vec::new(), conditions: Vec::new() }
    }

    /// Returns the ids to look up.
    #[must_use]
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Adds an id to look up; duplicates are ignored.
    pub fn query_id(&mut self, id: Id) -> &mut Self {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        self
    }

    /// Converts every id to `kind`, merging ids that become equal.
    pub fn convert_ids(&mut self, kind: IdKind) {
        for id in std::mem::take(&mut self.ids) {
            self.query_id(id.to_kind(kind));
        }
    }

    /// Adds a condition.
    ///
    /// `~id == value` becomes an id lookup; other conditions are kept unless
    /// an equal one is already present.
    pub fn query(&mut self, condition: Condition) -> &mut Self {
        if let Condition::Relation(Relation {
            key: RelationKey::Sys(SysKey::Id),
            relation: RelationType::Eq,
            value,
        }) = &condition
        {
            if let Some(id) = Self::value_to_id(value) {
                return self.query_id(id);
            }
        }
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
        self
    }

    fn value_to_id(value: &Value) -> Option<Id> {
        match value {
            Value::Int(n) => Some(Id::Numeric(*n)),
            Value::String(s) => Some(Id::Text(s.clone())),
            _ => None,
        }
    }

    /// Adds `key == value`.
    pub fn eq(&mut self, key: impl Into<RelationKey>, value: impl Into<Value>) -> &mut Self {
        self.query(Condition::eq(key, value))
    }

    /// Adds `key > value`.
    pub fn gt(&mut self, key: impl Into<RelationKey>, value: impl Into<Value>) -> &mut Self {
        self.query(Condition::gt(key, value))
    }

    /// Adds `key >= value`.
    pub fn gte(&mut self, key: impl Into<RelationKey>, value: impl Into<Value>) -> &mut Self {
        self.query(Condition::gte(key, value))
    }

    /// Adds `key < value`.
    pub fn lt(&mut self, key: impl Into<RelationKey>, value: impl Into<Value>) -> &mut Self {
        self.query(Condition::lt(key, value))
    }

    /// Adds `key <= value`.
    pub fn lte(&mut self, key: impl Into<RelationKey>, value: impl Into<Value>) -> &mut Self {
        self.query(Condition::lte(key, value))
    }

    /// Adds `key != value`.
    pub fn neq(&mut self, key: impl Into<RelationKey>, value: impl Into<Value>) -> &mut Self {
        self.query(Condition::neq(key, value))
    }

    /// Adds a membership test on a multi-valued key.
    pub fn key(&mut self, key: impl Into<RelationKey>, member: impl Into<Value>) -> &mut Self {
        self.query(Condition::contains_key(key, member))
    }

    /// Restricts the query to ids in `[start, end)`.
    pub fn scan(&mut self, start: impl Into<Value>, end: impl Into<Value>) -> &mut Self {
        self.query(Condition::scan(start, end))
    }

    /// Returns the conditions in insertion order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Removes every condition.
    pub fn reset_conditions(&mut self) {
        self.conditions.clear();
    }

    /// Replaces every condition.
    pub fn reset_conditions_with(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        self.conditions.clear();
        for condition in conditions {
            self.query(condition);
        }
    }

    /// Returns true if every condition only touches system keys.
    #[must_use]
    pub fn all_sysprop(&self) -> bool {
        self.conditions.iter().all(Condition::is_sysprop)
    }

    /// Returns every relation of every condition.
    #[must_use]
    pub fn relations(&self) -> Vec<&Relation> {
        self.conditions.iter().flat_map(Condition::relations).collect()
    }

    /// Returns the operand of the first top-level relation on `key`.
    #[must_use]
    pub fn condition(&self, key: &RelationKey) -> Option<&Value> {
        self.top_relations().find(|r| &r.key == key).map(|r| &r.value)
    }

    /// Removes every top-level relation on `key`.
    pub fn unset_condition(&mut self, key: &RelationKey) {
        self.conditions.retain(|c| !matches!(c.as_relation(), Some(r) if &r.key == key));
    }

    /// Returns true if a top-level relation is on `key`.
    #[must_use]
    pub fn contains_condition(&self, key: &RelationKey) -> bool {
        self.top_relations().any(|r| &r.key == key)
    }

    /// Returns true if any relation has the given type.
    #[must_use]
    pub fn contains_relation_type(&self, relation: RelationType) -> bool {
        self.relations().iter().any(|r| r.relation == relation)
    }

    /// Returns true if the query carries an id range.
    #[must_use]
    pub fn contains_scan_condition(&self) -> bool {
        self.contains_relation_type(RelationType::Scan)
    }

    /// Returns the conditions touching user-defined keys.
    #[must_use]
    pub fn userprop_conditions(&self) -> Vec<&Condition> {
        self.conditions.iter().filter(|c| !c.is_sysprop()).collect()
    }

    /// Removes the conditions touching user-defined keys.
    pub fn reset_userprop_conditions(&mut self) {
        self.conditions.retain(Condition::is_sysprop);
    }

    /// Returns the distinct user-defined keys in insertion order.
    #[must_use]
    pub fn userprop_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        for relation in self.relations() {
            if let Some(name) = relation.key.as_user() {
                if !keys.contains(&name) {
                    keys.push(name);
                }
            }
        }
        keys
    }

    /// Returns the operands bound to `fields`, in field order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unsupported`] if a user-key condition is a
    /// composite, and [`CoreError::InvalidArgument`] if a field has no relation.
    pub fn userprop_values(&self, fields: &[String]) -> CoreResult<Vec<Value>> {
        let mut relations = Vec::new();
        for condition in self.userprop_conditions() {
            match condition.as_relation() {
                Some(relation) => relations.push(relation),
                None => {
                    return Err(CoreError::unsupported(format!(
                        "can't read user property values from composite condition {condition}"
                    )))
                }
            }
        }

        fields
            .iter()
            .map(|field| {
                relations
                    .iter()
                    .find(|r| r.key.as_user() == Some(field.as_str()))
                    .map(|r| r.value.clone())
                    .ok_or_else(|| {
                        CoreError::invalid(format!("no user property named '{field}' in the query"))
                    })
            })
            .collect()
    }

    /// Returns the operands bound to `fields` spliced into one key.
    ///
    /// # Errors
    ///
    /// Fails like [`ConditionQuery::userprop_values`], or if an operand
    /// contains a key separator.
    pub fn userprop_values_string(&self, fields: &[String]) -> CoreResult<String> {
        concat_values(&self.userprop_values(fields)?)
    }

    /// Returns true if some relation can only be answered by a search index.
    #[must_use]
    pub fn has_search_condition(&self) -> bool {
        self.relations().iter().any(|r| r.relation.is_search_type())
    }

    /// Returns true if the user-defined keys are exactly `keys`, in any order.
    #[must_use]
    pub fn match_userprop_keys(&self, keys: &[String]) -> bool {
        let own = self.userprop_keys();
        own.len() == keys.len() && keys.iter().all(|k| own.contains(&k.as_str()))
    }

    fn top_relations(&self) -> impl Iterator<Item = &Relation> {
        self.conditions.iter().filter_map(Condition::as_relation)
    }
}

impl fmt::Display for ConditionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} where ", self.base.result_type)?;
        let mut first = true;
        for id in &self.ids {
            if !first {
                f.write_str(" AND ")?;
            }
            write!(f, "~id == {}", id.as_string().escape_debug())?;
            first = false;
        }
        for condition in &self.conditions {
            if !first {
                f.write_str(" AND ")?;
            }
            write!(f, "{condition}")?;
            first = false;
        }
        Ok(())
    }
}
