//! Predicates over stored elements.
//!
//! A [`Condition`] is either a single [`Relation`] comparing one key with a
//! value, or an AND/OR of two conditions. Keys are either system keys with a
//! fixed meaning ([`SysKey`]) or user-defined property keys.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// System keys every stored element may be matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SysKey {
    /// The element id.
    Id,
    /// The schema element name.
    Name,
    /// The label of a vertex or edge.
    Label,
    /// The direction of an edge relative to a vertex.
    Direction,
    /// The source vertex of an edge.
    SourceVertex,
    /// The target vertex of an edge.
    TargetVertex,
    /// The business key of a vertex.
    PrimaryValues,
    /// The sort key of an edge.
    SortValues,
    /// The category of the label an index is built on.
    BaseType,
    /// The name of the label an index is built on.
    BaseValue,
    /// The type of an index.
    IndexType,
    /// The fields of an index.
    Fields,
    /// The index names of a label.
    IndexNames,
}

impl SysKey {
    /// Returns the storage column name for this key.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Id => "~id",
            Self::Name => "~name",
            Self::Label => "~label",
            Self::Direction => "~direction",
            Self::SourceVertex => "~source",
            Self::TargetVertex => "~target",
            Self::PrimaryValues => "~primary_values",
            Self::SortValues => "~sort_values",
            Self::BaseType => "~base_type",
            Self::BaseValue => "~base_value",
            Self::IndexType => "~index_type",
            Self::Fields => "~fields",
            Self::IndexNames => "~index_names",
        }
    }
}

/// The key a relation compares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKey {
    /// A system key.
    Sys(SysKey),
    /// A user-defined property key.
    User(String),
}

impl RelationKey {
    /// Returns true for system keys.
    #[must_use]
    pub const fn is_sysprop(&self) -> bool {
        matches!(self, Self::Sys(_))
    }

    /// Returns the user property name, if this is a user key.
    #[must_use]
    pub fn as_user(&self) -> Option<&str> {
        match self {
            Self::User(name) => Some(name),
            Self::Sys(_) => None,
        }
    }
}

impl From<SysKey> for RelationKey {
    fn from(key: SysKey) -> Self {
        Self::Sys(key)
    }
}

impl From<&str> for RelationKey {
    fn from(name: &str) -> Self {
        Self::User(name.to_owned())
    }
}

impl From<String> for RelationKey {
    fn from(name: String) -> Self {
        Self::User(name)
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sys(key) => f.write_str(key.column()),
            Self::User(name) => f.write_str(name),
        }
    }
}

/// How a relation compares its key with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// Equal.
    Eq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Not equal.
    Neq,
    /// A multi-valued field holds the value as a member.
    ContainsKey,
    /// A text field contains the value, or a multi-valued field holds it.
    Contains,
    /// The key falls in `[start, end)`; the value is a two-element array.
    Scan,
}

impl RelationType {
    /// Returns the operator symbol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Neq => "!=",
            Self::ContainsKey => "containsk",
            Self::Contains => "contains",
            Self::Scan => "scan",
        }
    }

    /// Returns true for ordered comparisons.
    #[must_use]
    pub const fn is_range_type(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    /// Returns true if answering this relation from an index needs a search index.
    #[must_use]
    pub const fn is_search_type(self) -> bool {
        self.is_range_type() || matches!(self, Self::Contains)
    }
}

/// A comparison between one key and a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// The compared key.
    pub key: RelationKey,
    /// The comparison.
    pub relation: RelationType,
    /// The operand.
    pub value: Value,
}

impl Relation {
    /// Creates a relation.
    #[must_use]
    pub fn new(key: impl Into<RelationKey>, relation: RelationType, value: impl Into<Value>) -> Self {
        Self { key: key.into(), relation, value: value.into() }
    }

    /// Returns true for relations on system keys.
    #[must_use]
    pub const fn is_sysprop(&self) -> bool {
        self.key.is_sysprop()
    }

    /// Evaluates this relation against the stored value of its key.
    ///
    /// A missing value never matches.
    #[must_use]
    pub fn test(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let ordering = || actual.compare(&self.value);
        match self.relation {
            RelationType::Eq => ordering() == Some(Ordering::Equal),
            RelationType::Neq => ordering() != Some(Ordering::Equal),
            RelationType::Gt => ordering() == Some(Ordering::Greater),
            RelationType::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            RelationType::Lt => ordering() == Some(Ordering::Less),
            RelationType::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            RelationType::ContainsKey => Self::holds(actual, &self.value),
            RelationType::Contains => match (actual, &self.value) {
                (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
                _ => Self::holds(actual, &self.value),
            },
            RelationType::Scan => match self.value.as_array() {
                Some([start, end]) => {
                    matches!(actual.compare(start), Some(Ordering::Greater | Ordering::Equal))
                        && actual.compare(end) == Some(Ordering::Less)
                }
                _ => false,
            },
        }
    }

    fn holds(actual: &Value, member: &Value) -> bool {
        actual
            .as_array()
            .is_some_and(|values| values.iter().any(|v| v.compare(member) == Some(Ordering::Equal)))
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.relation.as_str(), self.value)
    }
}

/// A predicate: a relation, or an AND/OR of two predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// A single comparison.
    Relation(Relation),
    /// Both sides hold.
    And(Box<Condition>, Box<Condition>),
    /// Either side holds.
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// `key == value`
    #[must_use]
    pub fn eq(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::Eq, value))
    }

    /// `key > value`
    #[must_use]
    pub fn gt(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::Gt, value))
    }

    /// `key >= value`
    #[must_use]
    pub fn gte(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::Gte, value))
    }

    /// `key < value`
    #[must_use]
    pub fn lt(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::Lt, value))
    }

    /// `key <= value`
    #[must_use]
    pub fn lte(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::Lte, value))
    }

    /// `key != value`
    #[must_use]
    pub fn neq(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::Neq, value))
    }

    /// The multi-valued `key` holds `value`.
    #[must_use]
    pub fn contains_key(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::ContainsKey, value))
    }

    /// `key` contains `value`.
    #[must_use]
    pub fn contains(key: impl Into<RelationKey>, value: impl Into<Value>) -> Self {
        Self::Relation(Relation::new(key, RelationType::Contains, value))
    }

    /// The element id falls in `[start, end)`.
    #[must_use]
    pub fn scan(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        let range = Value::Array(vec![start.into(), end.into()]);
        Self::Relation(Relation::new(SysKey::Id, RelationType::Scan, range))
    }

    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Returns the relation, if this is a single comparison.
    #[must_use]
    pub const fn as_relation(&self) -> Option<&Relation> {
        match self {
            Self::Relation(r) => Some(r),
            _ => None,
        }
    }

    /// Returns true if this is a single comparison.
    #[must_use]
    pub const fn is_relation(&self) -> bool {
        matches!(self, Self::Relation(_))
    }

    /// Returns every relation in this condition, depth first.
    #[must_use]
    pub fn relations(&self) -> Vec<&Relation> {
        let mut out = Vec::new();
        self.collect_relations(&mut out);
        out
    }

    fn collect_relations<'a>(&'a self, out: &mut Vec<&'a Relation>) {
        match self {
            Self::Relation(r) => out.push(r),
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_relations(out);
                r.collect_relations(out);
            }
        }
    }

    /// Returns true if every relation in this condition is on a system key.
    #[must_use]
    pub fn is_sysprop(&self) -> bool {
        self.relations().iter().all(|r| r.is_sysprop())
    }

    /// Evaluates this condition, looking up stored values with `lookup`.
    pub fn test(&self, lookup: &dyn Fn(&RelationKey) -> Option<Value>) -> bool {
        match self {
            Self::Relation(r) => r.test(lookup(&r.key).as_ref()),
            Self::And(l, r) => l.test(lookup) && r.test(lookup),
            Self::Or(l, r) => l.test(lookup) || r.test(lookup),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relation(r) => write!(f, "{r}"),
            Self::And(l, r) => write!(f, "({l} AND {r})"),
            Self::Or(l, r) => write!(f, "({l} OR {r})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_in(values: &HashMap<RelationKey, Value>) -> impl Fn(&RelationKey) -> Option<Value> + '_ {
        move |key| values.get(key).cloned()
    }

    #[test]
    fn relations_compare_with_stored_values() {
        let mut values = HashMap::new();
        values.insert(RelationKey::from("age"), Value::Int(29));
        values.insert(RelationKey::from("city"), Value::from("Beijing"));
        let lookup = lookup_in(&values);

        assert!(Condition::eq("age", 29).test(&lookup));
        assert!(Condition::gt("age", 20).test(&lookup));
        assert!(Condition::lte("age", 29.0).test(&lookup));
        assert!(!Condition::lt("age", 29).test(&lookup));
        assert!(Condition::neq("city", "Shanghai").test(&lookup));
        assert!(Condition::contains("city", "jing").test(&lookup));
    }

    #[test]
    fn missing_values_never_match() {
        let values = HashMap::new();
        let lookup = lookup_in(&values);
        assert!(!Condition::neq("age", 1).test(&lookup));
        assert!(!Condition::eq("age", Value::Null).test(&lookup));
    }

    #[test]
    fn composites_follow_boolean_logic() {
        let mut values = HashMap::new();
        values.insert(RelationKey::from("age"), Value::Int(29));
        let lookup = lookup_in(&values);

        let young_or_old = Condition::lt("age", 18).or(Condition::gt("age", 25));
        assert!(young_or_old.test(&lookup));
        let between = Condition::gt("age", 18).and(Condition::lt("age", 25));
        assert!(!between.test(&lookup));
        assert_eq!(between.relations().len(), 2);
    }

    #[test]
    fn contains_key_checks_membership() {
        let mut values = HashMap::new();
        values.insert(
            RelationKey::Sys(SysKey::IndexNames),
            Value::Array(vec!["personByAge".into(), "personByCity".into()]),
        );
        let lookup = lookup_in(&values);
        assert!(Condition::contains_key(SysKey::IndexNames, "personByCity").test(&lookup));
        assert!(!Condition::contains_key(SysKey::IndexNames, "personByName").test(&lookup));
    }

    #[test]
    fn scan_is_half_open() {
        let mut values = HashMap::new();
        values.insert(RelationKey::Sys(SysKey::Id), Value::from("b"));
        let lookup = lookup_in(&values);
        assert!(Condition::scan("a", "c").test(&lookup));
        assert!(Condition::scan("b", "c").test(&lookup));
        assert!(!Condition::scan("a", "b").test(&lookup));
    }

    #[test]
    fn search_types_are_ranges_and_contains() {
        assert!(RelationType::Gte.is_search_type());
        assert!(RelationType::Contains.is_search_type());
        assert!(!RelationType::Eq.is_search_type());
        assert!(!RelationType::ContainsKey.is_range_type());
    }

    #[test]
    fn sysprop_requires_every_relation_on_system_keys() {
        let mixed = Condition::eq(SysKey::Label, "person").and(Condition::eq("age", 29));
        assert!(!mixed.is_sysprop());
        assert!(Condition::eq(SysKey::Label, "person").is_sysprop());
    }
}
