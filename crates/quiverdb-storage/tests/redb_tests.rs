//! Tests for the Redb backend store.
//!
//! This module runs the standard backend store compliance tests against
//! the Redb backend, plus Redb-specific tests.

mod store_tests;

use quiverdb_core::query::Query;
use quiverdb_core::{ElementType, Id, Value};
use quiverdb_storage::backends::RedbStore;
use quiverdb_storage::{BackendEntry, BackendMutation, BackendStore, MutateAction, StorageResult};

use store_tests::{run_test_suite, TestHarness};

/// Test harness for the Redb in-memory backend.
struct RedbHarness;

impl TestHarness for RedbHarness {
    type Store = RedbStore;

    fn create_store() -> StorageResult<Self::Store> {
        RedbStore::in_memory("test")
    }
}

/// Run the full compliance test suite for Redb.
#[test]
fn test_redb_compliance() {
    run_test_suite::<RedbHarness>();
}

/// Committed records survive reopening the database file.
#[test]
fn test_records_persist_across_reopen() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("graph.redb");

    {
        let db = RedbStore::create_database(&path).expect("failed to create database");
        let store = RedbStore::with_database(db, "graph");
        let mut entry = BackendEntry::new(ElementType::Vertex, Id::Numeric(42));
        entry.put_value("name", &Value::from("marko")).expect("encode");
        let mut mutation = BackendMutation::new();
        mutation.add(entry, MutateAction::Insert).expect("add");

        store.begin_tx().expect("begin");
        store.mutate(&mutation).expect("mutate");
        store.commit_tx().expect("commit");
    }

    let db = RedbStore::create_database(&path).expect("failed to reopen database");
    let store = RedbStore::with_database(db, "graph");
    let all = store.query(&Query::new(ElementType::Vertex).into()).expect("scan");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].value("name").expect("decode"), Some(Value::from("marko")));
}

/// Logical stores in one database never see each other's records.
#[test]
fn test_logical_stores_share_one_database() {
    let db = RedbStore::create_in_memory_database().expect("failed to create database");
    let schema = RedbStore::with_database(db.clone(), "schema");
    let graph = RedbStore::with_database(db, "graph");

    let mut mutation = BackendMutation::new();
    mutation
        .add(BackendEntry::new(ElementType::Vertex, Id::from("v")), MutateAction::Insert)
        .expect("add");
    graph.mutate(&mutation).expect("mutate");

    assert!(schema.query(&Query::new(ElementType::Vertex).into()).expect("scan").is_empty());
    assert_eq!(graph.query(&Query::new(ElementType::Vertex).into()).expect("scan").len(), 1);
}
