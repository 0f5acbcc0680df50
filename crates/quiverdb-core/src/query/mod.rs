//! Backend-neutral query model.
//!
//! - [`Query`]: a paged scan of one element category
//! - [`IdQuery`]: a lookup by ids
//! - [`ConditionQuery`]: ids plus AND-combined [`Condition`]s
//!
//! [`BackendQuery`] wraps the three for the storage layer.

mod backend;
mod condition;
mod condition_query;

pub use backend::{BackendQuery, IdQuery, Query};
pub use condition::{Condition, Relation, RelationKey, RelationType, SysKey};
pub use condition_query::ConditionQuery;
