//! Backend-neutral read requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConditionQuery;
use crate::types::{ElementType, Id, IdKind};

/// A scan over every element of one category, with paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// The category of the returned elements.
    pub result_type: ElementType,
    /// Number of matches to skip.
    pub offset: usize,
    /// Maximum number of matches to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates an unbounded scan over `result_type`.
    #[must_use]
    pub const fn new(result_type: ElementType) -> Self {
        Self { result_type, offset: 0, limit: None }
    }

    /// Set the offset.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the limit.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A lookup of elements by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdQuery {
    /// Category and paging.
    pub base: Query,
    ids: Vec<Id>,
}

impl IdQuery {
    /// Creates an id lookup with no ids yet.
    #[must_use]
    pub const fn new(result_type: ElementType) -> Self {
        Self { base: Query::new(result_type), ids: Vec::new() }
    }

    /// Creates a lookup of one id.
    #[must_use]
    pub fn single(result_type: ElementType, id: Id) -> Self {
        let mut query = Self::new(result_type);
        query.query(id);
        query
    }

    /// Adds an id; duplicates are ignored.
    pub fn query(&mut self, id: Id) -> &mut Self {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        self
    }

    /// Returns the ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Converts every id to `kind`, merging ids that become equal.
    pub fn convert_ids(&mut self, kind: IdKind) {
        for id in std::mem::take(&mut self.ids) {
            self.query(id.to_kind(kind));
        }
    }
}

impl FromIterator<Id> for IdQuery {
    /// Collects ids into a vertex lookup. Set `base.result_type` for other categories.
    fn from_iter<T: IntoIterator<Item = Id>>(iter: T) -> Self {
        let mut query = Self::new(ElementType::Vertex);
        for id in iter {
            query.query(id);
        }
        query
    }
}

/// Any query a backend store can execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackendQuery {
    /// Scan every element of a category.
    Scan(Query),
    /// Look elements up by id.
    Ids(IdQuery),
    /// Filter elements by ids and conditions.
    Condition(ConditionQuery),
}

impl BackendQuery {
    /// Returns the category of the returned elements.
    #[must_use]
    pub const fn result_type(&self) -> ElementType {
        self.base().result_type
    }

    /// Returns category and paging.
    #[must_use]
    pub const fn base(&self) -> &Query {
        match self {
            Self::Scan(q) => q,
            Self::Ids(q) => &q.base,
            Self::Condition(q) => &q.base,
        }
    }

    /// Converts the looked-up ids to `kind`.
    ///
    /// An id written as a plain value, as in `eq(SysKey::Id, 42)`, takes the
    /// value's representation until it is converted to the graph's.
    #[must_use]
    pub fn with_id_kind(mut self, kind: IdKind) -> Self {
        match &mut self {
            Self::Scan(_) => {}
            Self::Ids(q) => q.convert_ids(kind),
            Self::Condition(q) => q.convert_ids(kind),
        }
        self
    }

    /// Returns true for lookups that name neither an id nor a condition.
    ///
    /// Plain scans are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scan(_) => false,
            Self::Ids(q) => q.ids().is_empty(),
            Self::Condition(q) => q.ids().is_empty() && q.conditions().is_empty(),
        }
    }
}

impl From<Query> for BackendQuery {
    fn from(query: Query) -> Self {
        Self::Scan(query)
    }
}

impl From<IdQuery> for BackendQuery {
    fn from(query: IdQuery) -> Self {
        Self::Ids(query)
    }
}

impl From<ConditionQuery> for BackendQuery {
    fn from(query: ConditionQuery) -> Self {
        Self::Condition(query)
    }
}

impl fmt::Display for BackendQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(q) => write!(f, "scan {}", q.result_type),
            Self::Ids(q) => {
                write!(f, "{} ids [", q.base.result_type)?;
                for (i, id) in q.ids().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", id.as_string().escape_debug())?;
                }
                f.write_str("]")
            }
            Self::Condition(q) => write!(f, "{q}"),
        }
    }
}
