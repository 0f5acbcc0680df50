//! Schema elements: property keys, vertex labels, edge labels and index labels.
//!
//! Schema elements are plain values. They hold no reference to the
//! transaction that loaded them; operations that need storage take a
//! transaction explicitly.
//!
//! # Example
//!
//! ```
//! use quiverdb_core::schema::{IndexLabel, IndexType, SchemaElement, VertexLabel};
//! use quiverdb_core::ElementType;
//!
//! let person = VertexLabel::builder("person")
//!     .properties(["name", "age", "city"])
//!     .primary_keys(["name"])
//!     .build();
//!
//! let by_age = IndexLabel::builder("personByAge")
//!     .on(ElementType::VertexLabel, "person")
//!     .by(["age"])
//!     .index_type(IndexType::Secondary)
//!     .build();
//!
//! assert_eq!(person.name(), "person");
//! assert!(person.has_property("age"));
//! assert_eq!(by_age.fields, vec!["age"]);
//! ```

mod index_label;
mod label;
mod property_key;

pub use index_label::{IndexLabel, IndexLabelBuilder, IndexType};
pub use label::{EdgeLabel, EdgeLabelBuilder, Frequency, VertexLabel, VertexLabelBuilder};
pub use property_key::{Cardinality, DataType, PropertyKey, PropertyKeyBuilder};

use crate::error::{CoreError, CoreResult};
use crate::id::{IDS_SPLITOR, ID_SPLITOR, NAME_SPLITOR};
use crate::types::{ElementType, Id};

/// Prefix reserved for system keys.
pub const SYSTEM_PREFIX: char = '~';

/// Behavior shared by every schema element.
pub trait SchemaElement {
    /// Returns the category of this element.
    fn element_type(&self) -> ElementType;

    /// Returns the element name.
    fn name(&self) -> &str;

    /// Returns the assigned id, if any.
    fn id(&self) -> Option<&Id>;

    /// Assigns the id.
    fn set_id(&mut self, id: Id);

    /// Returns the names of the indexes built on this element.
    fn index_names(&self) -> &[String] {
        &[]
    }

    /// Returns the index-name list for modification, if this element carries one.
    fn index_names_mut(&mut self) -> Option<&mut Vec<String>> {
        None
    }

    /// Adds an index name, keeping the list free of duplicates.
    ///
    /// Returns true if the name was added.
    fn add_index_name(&mut self, name: &str) -> bool {
        match self.index_names_mut() {
            Some(names) if !names.iter().any(|n| n == name) => {
                names.push(name.to_owned());
                true
            }
            _ => false,
        }
    }

    /// Removes an index name.
    ///
    /// Returns true if the name was present.
    fn remove_index_name(&mut self, name: &str) -> bool {
        match self.index_names_mut() {
            Some(names) => {
                let before = names.len();
                names.retain(|n| n != name);
                names.len() != before
            }
            None => false,
        }
    }
}

/// Checks that `name` is usable as a schema element name.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if the name is blank, starts
/// with the reserved system prefix, or contains an id separator.
pub fn validate_schema_name(element_type: ElementType, name: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::invalid(format!("{element_type} name can't be empty or blank")));
    }
    if name.starts_with(SYSTEM_PREFIX) {
        return Err(CoreError::invalid(format!(
            "{element_type} name '{name}' can't start with '{SYSTEM_PREFIX}'"
        )));
    }
    if let Some(c) = name.chars().find(|c| [IDS_SPLITOR, ID_SPLITOR, NAME_SPLITOR].contains(c)) {
        return Err(CoreError::invalid(format!(
            "{element_type} name '{}' contains reserved separator U+{:04X}",
            name.escape_debug(),
            u32::from(c)
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_and_blank_names() {
        for name in ["", "   ", "~age", "by\u{1}Age", "per\u{2}son", "a\u{3}ge"] {
            let err = validate_schema_name(ElementType::IndexLabel, name).unwrap_err();
            assert!(err.is_invalid_argument(), "{name:?}");
        }
        assert!(validate_schema_name(ElementType::IndexLabel, "personByAge").is_ok());
    }

    #[test]
    fn index_names_stay_unique() {
        let mut person = VertexLabel::builder("person").build();
        assert!(person.add_index_name("personByAge"));
        assert!(!person.add_index_name("personByAge"));
        assert_eq!(person.index_names(), ["personByAge".to_owned()]);
        assert!(person.remove_index_name("personByAge"));
        assert!(!person.remove_index_name("personByAge"));
    }

    #[test]
    fn index_labels_carry_no_index_names() {
        let mut index = IndexLabel::builder("byAge").build();
        assert!(!index.add_index_name("other"));
        assert!(index.index_names().is_empty());
    }
}
