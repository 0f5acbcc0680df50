//! Integration tests for the transaction protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use quiverdb::{AbstractTransaction, Config, Error, Graph};
use quiverdb_core::id::SplicingIdGenerator;
use quiverdb_core::query::{BackendQuery, ConditionQuery, IdQuery, Query, SysKey};
use quiverdb_core::schema::{PropertyKey, VertexLabel};
use quiverdb_core::{ElementType, Id, Value};
use quiverdb_storage::backends::InMemoryStore;
use quiverdb_storage::{BackendEntry, BackendMutation, BackendStore, StorageError, StorageResult};

/// An in-memory store that records every call it receives.
#[derive(Debug)]
struct RecordingStore {
    inner: InMemoryStore,
    calls: Mutex<Vec<&'static str>>,
    fail_rollback: AtomicBool,
}

impl RecordingStore {
    fn new(name: &str) -> Self {
        Self { inner: InMemoryStore::new(name), calls: Mutex::default(), fail_rollback: AtomicBool::new(false) }
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    fn forget(&self) {
        self.calls.lock().expect("calls lock").clear();
    }
}

impl BackendStore for RecordingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn query(&self, query: &BackendQuery) -> StorageResult<Vec<BackendEntry>> {
        self.record("query");
        self.inner.query(query)
    }

    fn mutate(&self, mutation: &BackendMutation) -> StorageResult<()> {
        self.record("mutate");
        self.inner.mutate(mutation)
    }

    fn begin_tx(&self) -> StorageResult<()> {
        self.record("begin");
        self.inner.begin_tx()
    }

    fn commit_tx(&self) -> StorageResult<()> {
        self.record("commit");
        self.inner.commit_tx()
    }

    fn rollback_tx(&self) -> StorageResult<()> {
        self.record("rollback");
        let result = self.inner.rollback_tx();
        if self.fail_rollback.load(Ordering::SeqCst) {
            return Err(StorageError::Internal("rollback refused".to_owned()));
        }
        result
    }

    fn clear(&self) -> StorageResult<()> {
        self.inner.clear()
    }
}

/// Opens a graph whose graph store is the returned recording store.
fn recorded_graph(auto_commit: bool) -> (Graph, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::new("graph"));
    let config = Config::builder().auto_commit(auto_commit).build();
    let graph = Graph::from_parts(
        config,
        Arc::new(SplicingIdGenerator::new()),
        Arc::new(InMemoryStore::new("schema")),
        Arc::clone(&store) as Arc<dyn BackendStore>,
    );
    (graph, store)
}

fn entry(id: &str) -> BackendEntry {
    BackendEntry::new(ElementType::Vertex, Id::from(id))
}

fn by_id(id: &str) -> BackendQuery {
    IdQuery::single(ElementType::Vertex, Id::from(id)).into()
}

// ============================================================================
// Empty Queries
// ============================================================================

#[test]
fn test_empty_queries_never_reach_the_store() {
    let (graph, store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");

    let err = tx.query(IdQuery::new(ElementType::Vertex).into()).unwrap_err();
    assert!(matches!(err, Error::EmptyQuery));
    assert!(err.is_invalid_argument());

    let err = tx.query(ConditionQuery::new(ElementType::Vertex).into()).unwrap_err();
    assert!(matches!(err, Error::EmptyQuery));

    // Nothing was committed or read, the write is still pending.
    assert!(store.calls().is_empty());
    assert!(tx.has_updates());
}

#[test]
fn test_scan_is_a_valid_query() {
    let (graph, _store) = recorded_graph(false);
    let mut tx = graph.transaction();
    let found = tx.query(Query::new(ElementType::Vertex).into()).expect("failed to scan");
    assert!(found.is_empty());
}

// ============================================================================
// Commit Then Clean
// ============================================================================

#[test]
fn test_commit_leaves_no_updates() {
    let (graph, store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");
    tx.add_entry(entry("v2")).expect("failed to add entry");
    assert_eq!(tx.core().pending_len(), 2);

    tx.commit().expect("failed to commit");
    assert!(!tx.has_updates());
    assert_eq!(store.calls(), vec!["begin", "mutate", "commit"]);

    store.forget();
    tx.rollback().expect("failed to rollback");
    assert!(!tx.has_updates());
    assert_eq!(store.calls(), vec!["rollback"]);

    // The committed records survive the rollback.
    assert_eq!(tx.query(Query::new(ElementType::Vertex).into()).expect("failed to scan").len(), 2);
}

#[test]
fn test_commit_without_updates_skips_the_store() {
    let (graph, store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.commit().expect("failed to commit");
    assert!(store.calls().is_empty());
}

#[test]
fn test_rollback_discards_pending_writes() {
    let (graph, store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");
    tx.rollback().expect("failed to rollback");
    assert!(!tx.has_updates());

    assert!(tx.query_by_id(ElementType::Vertex, &Id::from("v1")).expect("failed to query").is_none());
    assert_eq!(store.count("mutate"), 0);
}

// ============================================================================
// Read Your Own Writes
// ============================================================================

#[test]
fn test_read_commits_pending_writes_once() {
    let (graph, store) = recorded_graph(true);
    let mut tx = graph.transaction();
    assert!(tx.auto_commit());

    tx.add_entry(entry("v1")).expect("failed to add entry");
    let found = tx.query(by_id("v1")).expect("failed to query");

    assert_eq!(found.len(), 1);
    assert_eq!(store.calls(), vec!["begin", "mutate", "commit", "query"]);

    store.forget();
    tx.query(by_id("v1")).expect("failed to query");
    assert_eq!(store.calls(), vec!["query"]);
}

#[test]
fn test_auto_commit_commits_typed_writes() {
    let (graph, store) = recorded_graph(true);
    let mut schema = graph.schema();
    schema.add_property_key(PropertyKey::builder("name").build()).expect("failed to add key");
    let person = schema
        .add_vertex_label(
            VertexLabel::builder("person").properties(["name"]).primary_keys(["name"]).build(),
        )
        .expect("failed to add label");

    let mut tx = graph.transaction();
    let marko = tx.add_vertex(&person, [("name", "marko")]).expect("failed to add vertex");
    assert!(!tx.has_updates());
    assert_eq!(store.count("commit"), 1);

    let read = tx.get_vertex(&marko.id).expect("failed to read vertex");
    assert_eq!(read.property("name"), Some(&Value::from("marko")));
    assert_eq!(store.count("commit"), 1);
}

#[test]
fn test_without_auto_commit_writes_wait_for_commit() {
    let (graph, store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");
    assert!(store.calls().is_empty());

    // Reads still observe the writes.
    let found = tx.query(by_id("v1")).expect("failed to query");
    assert_eq!(found.len(), 1);
    assert_eq!(store.calls(), vec!["begin", "mutate", "commit", "query"]);
    assert!(!tx.has_updates());
}

#[test]
fn test_read_fails_when_pending_writes_fail() {
    let (graph, _store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.append_entry(entry("ghost")).expect("failed to buffer append");

    let err = tx.query(by_id("ghost")).unwrap_err();
    assert!(err.is_commit_failure());
    assert!(err.cause().is_not_found());
    assert!(!tx.has_updates());
}

// ============================================================================
// Net Effects
// ============================================================================

#[test]
fn test_insert_then_remove_nets_to_a_deletion() {
    let (graph, _store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");
    tx.commit().expect("failed to commit");

    let mut updated = entry("v1");
    updated.put_value("age", &Value::Int(30)).expect("failed to encode");
    tx.add_entry(updated).expect("failed to add entry");
    tx.remove_by_id(ElementType::Vertex, &Id::from("v1")).expect("failed to remove");
    assert_eq!(tx.core().pending_len(), 1);
    tx.commit().expect("failed to commit");

    assert!(tx.query_by_id(ElementType::Vertex, &Id::from("v1")).expect("failed to query").is_none());
}

#[test]
fn test_remove_then_insert_keeps_the_insert() {
    let (graph, _store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");
    tx.commit().expect("failed to commit");

    tx.remove_entry(entry("v1")).expect("failed to remove");
    let mut replacement = entry("v1");
    replacement.put_value("age", &Value::Int(7)).expect("failed to encode");
    tx.add_entry(replacement).expect("failed to add entry");
    tx.commit().expect("failed to commit");

    let found = tx.get(ElementType::Vertex, &Id::from("v1")).expect("failed to get");
    assert_eq!(found.value("age").expect("failed to decode"), Some(Value::Int(7)));
}

#[test]
fn test_whole_and_partial_writes_conflict() {
    let (graph, store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");
    tx.append_entry(entry("v1")).expect("failed to buffer append");

    let err = tx.commit().unwrap_err();
    assert!(err.cause().is_incompatible_action());
    assert!(!tx.has_updates());
    assert_eq!(store.count("begin"), 0);
}

#[test]
fn test_get_reports_missing_records() {
    let (graph, _store) = recorded_graph(false);
    let mut tx = graph.transaction();
    let err = tx.get(ElementType::Vertex, &Id::from("ghost")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_condition_queries_match_system_columns() {
    let (graph, _store) = recorded_graph(false);
    let mut tx = graph.transaction();
    let mut person = entry("person\u{2}marko");
    person.put_value(SysKey::Label.column(), &Value::from("person")).expect("failed to encode");
    let mut software = entry("software\u{2}lop");
    software.put_value(SysKey::Label.column(), &Value::from("software")).expect("failed to encode");
    tx.add_entry(person).expect("failed to add entry");
    tx.add_entry(software).expect("failed to add entry");

    let mut query = ConditionQuery::new(ElementType::Vertex);
    query.eq(SysKey::Label, "software");
    let found = tx.query(query.into()).expect("failed to query");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), &Id::from("software\u{2}lop"));
}

// ============================================================================
// Commit Failure
// ============================================================================

#[test]
fn test_failed_commit_rolls_back() {
    let store = Arc::new(InMemoryStore::new("graph"));
    let graph = Graph::from_parts(
        Config::default(),
        Arc::new(SplicingIdGenerator::new()),
        Arc::new(InMemoryStore::new("schema")),
        Arc::clone(&store) as Arc<dyn BackendStore>,
    );
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");

    store.fail_next_mutate();
    let err = tx.commit().unwrap_err();
    assert!(err.is_commit_failure());
    assert!(err.cause().is_storage_error());
    assert!(err.to_string().contains("injected failure"));
    assert!(!tx.has_updates());
    assert!(store.is_empty().expect("failed to count"));

    // The store's transaction was closed, so the next commit goes through.
    tx.add_entry(entry("v2")).expect("failed to add entry");
    tx.commit().expect("failed to commit");
    assert_eq!(store.len().expect("failed to count"), 1);
}

#[test]
fn test_rollback_failure_keeps_the_original_error() {
    let (graph, store) = recorded_graph(false);
    let mut tx = graph.transaction();
    tx.add_entry(entry("v1")).expect("failed to add entry");
    tx.append_entry(entry("v2")).expect("failed to buffer append");
    store.fail_rollback.store(true, Ordering::SeqCst);

    // Appending to a missing record fails when the store commits.
    let err = tx.commit().unwrap_err();
    assert!(err.cause().is_not_found());
    assert!(!err.to_string().contains("rollback refused"));
    assert!(!tx.has_updates());
    assert_eq!(store.calls(), vec!["begin", "mutate", "commit", "rollback"]);
}
