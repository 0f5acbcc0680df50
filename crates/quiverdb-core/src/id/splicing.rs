//! Deterministic ids spliced together from business keys.
//!
//! Three non-printable separators keep the parts apart:
//!
//! - [`IDS_SPLITOR`] between whole ids inside an edge id
//! - [`ID_SPLITOR`] between the label and name inside a vertex id
//! - [`NAME_SPLITOR`] between the key values that make up a name
//!
//! User data containing any of them is rejected.

use super::IdGenerator;
use crate::error::{CoreError, CoreResult};
use crate::schema::SchemaElement;
use crate::types::{Id, IdKind, Value};

/// Separator between ids.
pub const IDS_SPLITOR: char = '\u{1}';
/// Separator between the parts of one id.
pub const ID_SPLITOR: char = '\u{2}';
/// Separator between key values.
pub const NAME_SPLITOR: char = '\u{3}';

const EDGE_ID_PARTS: usize = 4;

/// Joins business-key values with [`NAME_SPLITOR`].
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if a value's key string contains
/// one of the separators.
pub fn concat_values(values: &[Value]) -> CoreResult<String> {
    let mut name = String::new();
    for (i, value) in values.iter().enumerate() {
        let part = value.to_key_string();
        check_part("key value", &part, &[IDS_SPLITOR, ID_SPLITOR, NAME_SPLITOR])?;
        if i > 0 {
            name.push(NAME_SPLITOR);
        }
        name.push_str(&part);
    }
    Ok(name)
}

fn check_part(what: &str, part: &str, reserved: &[char]) -> CoreResult<()> {
    match part.chars().find(|c| reserved.contains(c)) {
        Some(c) => Err(CoreError::invalid(format!(
            "{what} '{}' contains reserved separator U+{:04X}",
            part.escape_debug(),
            u32::from(c)
        ))),
        None => Ok(()),
    }
}

/// Id generator deriving every id from business keys.
///
/// Equal keys always produce equal ids. Spliced ids are always textual.
#[derive(Debug, Default, Clone, Copy)]
pub struct SplicingIdGenerator;

impl SplicingIdGenerator {
    /// Creates a splicing generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn text(id: &Id) -> CoreResult<&str> {
        id.as_text()
            .ok_or_else(|| CoreError::invalid(format!("spliced ids are textual, got numeric id {id}")))
    }
}

impl IdGenerator for SplicingIdGenerator {
    fn kind(&self) -> IdKind {
        IdKind::Text
    }

    fn is_deterministic(&self) -> bool {
        true
    }

    fn schema_id(&self, element: &dyn SchemaElement) -> CoreResult<Id> {
        let name = element.name();
        check_part("schema name", name, &[IDS_SPLITOR, ID_SPLITOR, NAME_SPLITOR])?;
        Ok(Id::Text(name.to_owned()))
    }

    fn vertex_id(&self, label: &str, name: &str) -> CoreResult<Id> {
        check_part("vertex label", label, &[IDS_SPLITOR, ID_SPLITOR, NAME_SPLITOR])?;
        check_part("vertex name", name, &[IDS_SPLITOR, ID_SPLITOR])?;
        Ok(Id::Text(format!("{label}{ID_SPLITOR}{name}")))
    }

    fn edge_id(&self, source: &Id, label: &str, name: &str, target: &Id) -> CoreResult<Id> {
        let source = Self::text(source)?;
        let target = Self::text(target)?;
        check_part("source id", source, &[IDS_SPLITOR])?;
        check_part("target id", target, &[IDS_SPLITOR])?;
        check_part("edge label", label, &[IDS_SPLITOR, ID_SPLITOR, NAME_SPLITOR])?;
        check_part("edge name", name, &[IDS_SPLITOR, ID_SPLITOR])?;
        Ok(Id::Text(format!(
            "{source}{IDS_SPLITOR}{label}{IDS_SPLITOR}{name}{IDS_SPLITOR}{target}"
        )))
    }

    /// Splits an edge id into `[source, label, name, target]` or a vertex id
    /// into `[label, name]`.
    fn split(&self, id: &Id) -> CoreResult<Vec<Id>> {
        let text = Self::text(id)?;
        if text.contains(IDS_SPLITOR) {
            let parts: Vec<Id> = text.split(IDS_SPLITOR).map(Id::from).collect();
            if parts.len() != EDGE_ID_PARTS {
                return Err(CoreError::invalid(format!(
                    "edge id '{}' has {} parts, expected {EDGE_ID_PARTS}",
                    text.escape_debug(),
                    parts.len()
                )));
            }
            return Ok(parts);
        }
        match text.split_once(ID_SPLITOR) {
            Some((label, name)) => Ok(vec![Id::from(label), Id::from(name)]),
            None => Err(CoreError::invalid(format!(
                "id '{}' contains no separator",
                text.escape_debug()
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::PropertyKey;

    #[test]
    fn schema_id_is_the_name() {
        let age = PropertyKey::builder("age").build();
        assert_eq!(SplicingIdGenerator.schema_id(&age), Ok(Id::from("age")));
    }

    #[test]
    fn equal_keys_give_equal_ids() {
        let generator = SplicingIdGenerator::new();
        let name = concat_values(&["marko".into(), Value::Int(29)]).unwrap();
        let a = generator.vertex_id("person", &name).unwrap();
        let b = generator.vertex_id("person", &name).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Id::from("person\u{2}marko\u{3}29"));
    }

    #[test]
    fn edge_id_splits_back_into_parts() {
        let generator = SplicingIdGenerator::new();
        let marko = generator.vertex_id("person", "marko").unwrap();
        let lop = generator.vertex_id("software", "lop").unwrap();
        let edge = generator.edge_id(&marko, "created", "2017", &lop).unwrap();

        let parts = generator.split(&edge).unwrap();
        assert_eq!(parts, vec![marko.clone(), Id::from("created"), Id::from("2017"), lop]);

        let vertex_parts = generator.split(&marko).unwrap();
        assert_eq!(vertex_parts, vec![Id::from("person"), Id::from("marko")]);
    }

    #[test]
    fn split_rejects_ids_without_separator() {
        let err = SplicingIdGenerator.split(&Id::from("plain")).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = SplicingIdGenerator.split(&Id::from("a\u{1}b")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn rejects_separators_in_user_data() {
        let generator = SplicingIdGenerator::new();
        assert!(generator.vertex_id("per\u{2}son", "marko").is_err());
        assert!(generator.vertex_id("person", "mar\u{1}ko").is_err());
        let key = PropertyKey::builder("a\u{3}ge").build();
        assert!(generator.schema_id(&key).is_err());
    }

    #[test]
    fn key_values_with_separators_are_rejected() {
        let joined = concat_values(&["a".into(), "b".into()]).unwrap();
        assert_eq!(joined, "a\u{3}b");

        for value in ["a\u{3}b", "a\u{2}b", "a\u{1}b"] {
            let err = concat_values(&[value.into()]).unwrap_err();
            assert!(err.is_invalid_argument(), "{value:?}");
        }
    }

    #[test]
    fn numeric_ids_are_not_spliceable() {
        let generator = SplicingIdGenerator::new();
        let err = generator.edge_id(&Id::Numeric(1), "knows", "", &Id::from("b")).unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
