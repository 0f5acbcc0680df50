//! Query evaluation shared by the backends.

use quiverdb_core::query::{BackendQuery, Condition};
use quiverdb_core::{ElementType, Id};

use super::{StorageError, StorageResult};
use crate::entry::BackendEntry;
use crate::mutation::{MutateAction, MutateItem};

/// Point and scan access to committed records.
pub trait EntrySource {
    /// Returns the record stored under `(element_type, id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record can't be read or decoded.
    fn get(&self, element_type: ElementType, id: &Id) -> StorageResult<Option<BackendEntry>>;

    /// Returns every record of `element_type`, ordered by id bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the records can't be read or decoded.
    fn scan(&self, element_type: ElementType) -> StorageResult<Vec<BackendEntry>>;
}

/// Evaluates `query` against `source`.
///
/// Ids are looked up directly, in query order; a query without ids scans
/// the whole category. Conditions are then tested against each candidate
/// before paging is applied.
///
/// # Errors
///
/// Returns the first error reported by `source`.
pub fn execute<S: EntrySource + ?Sized>(
    source: &S,
    query: &BackendQuery,
) -> StorageResult<Vec<BackendEntry>> {
    let result_type = query.result_type();
    let (candidates, conditions): (Vec<BackendEntry>, &[Condition]) = match query {
        BackendQuery::Scan(_) => (source.scan(result_type)?, &[]),
        BackendQuery::Ids(q) => (fetch(source, result_type, q.ids())?, &[]),
        BackendQuery::Condition(q) if q.ids().is_empty() => {
            (source.scan(result_type)?, q.conditions())
        }
        BackendQuery::Condition(q) => (fetch(source, result_type, q.ids())?, q.conditions()),
    };

    let base = query.base();
    Ok(candidates
        .into_iter()
        .filter(|entry| conditions.iter().all(|c| c.test(&|key| entry.lookup(key))))
        .skip(base.offset)
        .take(base.limit.unwrap_or(usize::MAX))
        .collect())
}

fn fetch<S: EntrySource + ?Sized>(
    source: &S,
    element_type: ElementType,
    ids: &[Id],
) -> StorageResult<Vec<BackendEntry>> {
    let mut entries = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(entry) = source.get(element_type, id)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Applies one item to the record currently stored under its key.
///
/// Returns the record to store, or `None` if the key must be removed.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if a partial update targets a missing record.
pub fn apply_item(
    current: Option<BackendEntry>,
    item: &MutateItem,
) -> StorageResult<Option<BackendEntry>> {
    let missing = || StorageError::NotFound {
        element_type: item.entry.element_type(),
        id: item.entry.id().clone(),
    };
    match item.action {
        MutateAction::Insert => Ok(Some(item.entry.clone())),
        MutateAction::Delete => Ok(None),
        MutateAction::Append => {
            let mut entry = current.ok_or_else(missing)?;
            entry.merge(&item.entry);
            Ok(Some(entry))
        }
        MutateAction::Eliminate => {
            let mut entry = current.ok_or_else(missing)?;
            entry.eliminate(&item.entry);
            Ok(Some(entry))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use quiverdb_core::query::{ConditionQuery, IdQuery, Query, SysKey};
    use quiverdb_core::Value;

    use super::*;

    #[derive(Default)]
    struct MapSource(BTreeMap<(ElementType, Id), BackendEntry>);

    impl EntrySource for MapSource {
        fn get(&self, element_type: ElementType, id: &Id) -> StorageResult<Option<BackendEntry>> {
            Ok(self.0.get(&(element_type, id.clone())).cloned())
        }

        fn scan(&self, element_type: ElementType) -> StorageResult<Vec<BackendEntry>> {
            Ok(self
                .0
                .iter()
                .filter(|((t, _), _)| *t == element_type)
                .map(|(_, e)| e.clone())
                .collect())
        }
    }

    fn people() -> MapSource {
        let mut source = MapSource::default();
        for (name, age) in [("josh", 32), ("marko", 29), ("peter", 35), ("vadas", 27)] {
            let mut entry = BackendEntry::new(ElementType::Vertex, Id::from(name));
            entry.put_value("age", &Value::Int(age)).unwrap();
            entry.put_value(SysKey::Label.column(), &Value::from("person")).unwrap();
            source.0.insert((ElementType::Vertex, Id::from(name)), entry);
        }
        let lop = BackendEntry::new(ElementType::VertexLabel, Id::from("lop"));
        source.0.insert((ElementType::VertexLabel, Id::from("lop")), lop);
        source
    }

    fn ids(entries: &[BackendEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id().as_string()).collect()
    }

    #[test]
    fn scans_one_category_with_paging() {
        let source = people();
        let all = execute(&source, &Query::new(ElementType::Vertex).into()).unwrap();
        assert_eq!(ids(&all), ["josh", "marko", "peter", "vadas"]);

        let page = execute(&source, &Query::new(ElementType::Vertex).offset(1).limit(2).into());
        assert_eq!(ids(&page.unwrap()), ["marko", "peter"]);
    }

    #[test]
    fn id_lookups_skip_missing_records() {
        let source = people();
        let query: IdQuery = [Id::from("peter"), Id::from("nobody"), Id::from("josh")]
            .into_iter()
            .collect();
        let found = execute(&source, &query.into()).unwrap();
        assert_eq!(ids(&found), ["peter", "josh"]);
    }

    #[test]
    fn conditions_filter_candidates() {
        let source = people();
        let mut query = ConditionQuery::new(ElementType::Vertex);
        query.gte("age", 29).lt("age", 35);
        assert_eq!(ids(&execute(&source, &query.clone().into()).unwrap()), ["josh", "marko"]);

        query.query_id(Id::from("marko")).query_id(Id::from("peter"));
        assert_eq!(ids(&execute(&source, &query.into()).unwrap()), ["marko"]);
    }

    #[test]
    fn partial_updates_need_an_existing_record() {
        let mut append = BackendEntry::new(ElementType::VertexLabel, Id::from("person"));
        append.put_members(SysKey::IndexNames.column(), &["personByAge"]);
        let item = MutateItem::new(append, MutateAction::Append);

        let err = apply_item(None, &item).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { element_type: ElementType::VertexLabel, .. }));

        let existing = BackendEntry::new(ElementType::VertexLabel, Id::from("person"));
        let updated = apply_item(Some(existing), &item).unwrap().unwrap();
        assert_eq!(updated.members(SysKey::IndexNames.column()), ["personByAge"]);
    }
}
