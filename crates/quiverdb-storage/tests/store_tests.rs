//! Tests for the backend store contract.
//!
//! These tests validate the `BackendStore` contract and can be used to test
//! any backend implementation.

#![allow(dead_code)]

use quiverdb_core::query::{ConditionQuery, IdQuery, Query, SysKey};
use quiverdb_core::{ElementType, Id, Value};
use quiverdb_storage::{
    BackendEntry, BackendMutation, BackendStore, MutateAction, StorageError, StorageResult,
};

/// A test harness trait for testing backend store implementations.
pub trait TestHarness {
    /// The store type being tested.
    type Store: BackendStore;

    /// Create a new, empty store for testing.
    fn create_store() -> StorageResult<Self::Store>;
}

/// Run the standard test suite against a backend store.
pub fn run_test_suite<H: TestHarness>() {
    test_insert_and_delete::<H>();
    test_bracket_visibility::<H>();
    test_rollback::<H>();
    test_partial_updates::<H>();
    test_partial_update_of_missing_record::<H>();
    test_condition_queries::<H>();
    test_clear::<H>();
}

fn person(name: &str, age: i64) -> BackendEntry {
    let mut entry = BackendEntry::new(ElementType::Vertex, Id::from(format!("person\u{2}{name}")));
    entry.put_value(SysKey::Label.column(), &Value::from("person")).expect("encode label");
    entry.put_value("age", &Value::Int(age)).expect("encode age");
    entry
}

fn single(entry: BackendEntry, action: MutateAction) -> BackendMutation {
    let mut mutation = BackendMutation::new();
    mutation.add(entry, action).expect("add to mutation");
    mutation
}

fn all_vertices<S: BackendStore>(store: &S) -> Vec<BackendEntry> {
    store.query(&Query::new(ElementType::Vertex).into()).expect("scan vertices")
}

fn commit<S: BackendStore>(store: &S, mutation: &BackendMutation) -> StorageResult<()> {
    store.begin_tx()?;
    if let Err(e) = store.mutate(mutation) {
        store.rollback_tx()?;
        return Err(e);
    }
    store.commit_tx()
}

/// Inserted records can be read back by id and deleted again.
fn test_insert_and_delete<H: TestHarness>() {
    let store = H::create_store().expect("failed to create store");
    let marko = person("marko", 29);

    commit(&store, &single(marko.clone(), MutateAction::Insert)).expect("insert");
    let found = store
        .query(&IdQuery::single(ElementType::Vertex, marko.id().clone()).into())
        .expect("query by id");
    assert_eq!(found, vec![marko.clone()]);

    commit(&store, &single(person("marko", 30), MutateAction::Insert)).expect("overwrite");
    let found = all_vertices(&store);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value("age").expect("decode"), Some(Value::Int(30)));

    let delete = BackendEntry::new(ElementType::Vertex, marko.id().clone());
    commit(&store, &single(delete.clone(), MutateAction::Delete)).expect("delete");
    assert!(all_vertices(&store).is_empty());

    commit(&store, &single(delete, MutateAction::Delete)).expect("deleting a missing record");
}

/// Mutations inside a bracket are invisible until commit.
fn test_bracket_visibility<H: TestHarness>() {
    let store = H::create_store().expect("failed to create store");
    store.begin_tx().expect("begin");
    store.mutate(&single(person("josh", 32), MutateAction::Insert)).expect("mutate");
    store.mutate(&single(person("peter", 35), MutateAction::Insert)).expect("mutate");
    assert!(all_vertices(&store).is_empty());

    store.commit_tx().expect("commit");
    assert_eq!(all_vertices(&store).len(), 2);
    assert!(matches!(store.commit_tx(), Err(StorageError::Transaction(_))));
}

/// Rollback discards buffered mutations and closes the bracket.
fn test_rollback<H: TestHarness>() {
    let store = H::create_store().expect("failed to create store");
    store.begin_tx().expect("begin");
    store.mutate(&single(person("vadas", 27), MutateAction::Insert)).expect("mutate");
    store.rollback_tx().expect("rollback");
    assert!(all_vertices(&store).is_empty());

    store.rollback_tx().expect("rollback without a bracket");
    store.begin_tx().expect("a new bracket can start");
    store.rollback_tx().expect("rollback");
}

/// APPEND and ELIMINATE change columns without rewriting the record.
fn test_partial_updates<H: TestHarness>() {
    let store = H::create_store().expect("failed to create store");
    let id = Id::from("person");
    let mut label = BackendEntry::new(ElementType::VertexLabel, id.clone());
    label.put_value(SysKey::Name.column(), &Value::from("person")).expect("encode name");
    commit(&store, &single(label, MutateAction::Insert)).expect("insert label");

    let mut names = BackendEntry::new(ElementType::VertexLabel, id.clone());
    names.put_members(SysKey::IndexNames.column(), &["personByAge", "personByCity"]);
    commit(&store, &single(names, MutateAction::Append)).expect("append");

    let mut removed = BackendEntry::new(ElementType::VertexLabel, id.clone());
    removed.put_members(SysKey::IndexNames.column(), &["personByAge"]);
    commit(&store, &single(removed, MutateAction::Eliminate)).expect("eliminate");

    let stored = store
        .query(&IdQuery::single(ElementType::VertexLabel, id).into())
        .expect("query label");
    assert_eq!(stored[0].members(SysKey::IndexNames.column()), ["personByCity"]);
    assert_eq!(stored[0].value(SysKey::Name.column()).expect("decode"), Some(Value::from("person")));
}

/// A partial update of a missing record fails the whole commit.
fn test_partial_update_of_missing_record<H: TestHarness>() {
    let store = H::create_store().expect("failed to create store");
    let mut mutation = single(person("ripple", 1), MutateAction::Insert);
    let mut names = BackendEntry::new(ElementType::VertexLabel, Id::from("software"));
    names.put_members(SysKey::IndexNames.column(), &["softwareByLang"]);
    mutation.add(names, MutateAction::Append).expect("add append");

    let err = commit(&store, &mutation).expect_err("append to a missing record");
    assert!(matches!(err, StorageError::NotFound { element_type: ElementType::VertexLabel, .. }));
    assert!(all_vertices(&store).is_empty());
}

/// Condition queries filter, and paging applies after filtering.
fn test_condition_queries<H: TestHarness>() {
    let store = H::create_store().expect("failed to create store");
    let mut mutation = BackendMutation::new();
    for (name, age) in [("josh", 32), ("marko", 29), ("peter", 35), ("vadas", 27)] {
        mutation.add(person(name, age), MutateAction::Insert).expect("add");
    }
    commit(&store, &mutation).expect("insert people");

    let mut older = ConditionQuery::new(ElementType::Vertex);
    older.eq(SysKey::Label, "person").gt("age", 28);
    let found = store.query(&older.clone().into()).expect("condition query");
    assert_eq!(found.len(), 3);

    older.base = Query::new(ElementType::Vertex).offset(1).limit(1);
    let page = store.query(&older.into()).expect("paged query");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id(), found[1].id());

    let mut by_id = ConditionQuery::new(ElementType::Vertex);
    by_id.query_id(Id::from("person\u{2}vadas")).lt("age", 30);
    let found = store.query(&by_id.into()).expect("ids plus conditions");
    assert_eq!(found.len(), 1);
}

/// Clear removes every record of the store.
fn test_clear<H: TestHarness>() {
    let store = H::create_store().expect("failed to create store");
    commit(&store, &single(person("lop", 1), MutateAction::Insert)).expect("insert");
    store.clear().expect("clear");
    assert!(all_vertices(&store).is_empty());
}
