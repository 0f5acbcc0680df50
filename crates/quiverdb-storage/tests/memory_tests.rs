//! Tests for the in-memory backend store.

mod store_tests;

use quiverdb_core::query::Query;
use quiverdb_core::{ElementType, Id};
use quiverdb_storage::backends::InMemoryStore;
use quiverdb_storage::{BackendEntry, BackendMutation, BackendStore, MutateAction, StorageResult};

use store_tests::{run_test_suite, TestHarness};

/// Test harness for the in-memory backend.
struct MemoryHarness;

impl TestHarness for MemoryHarness {
    type Store = InMemoryStore;

    fn create_store() -> StorageResult<Self::Store> {
        Ok(InMemoryStore::new("test"))
    }
}

#[test]
fn test_memory_compliance() {
    run_test_suite::<MemoryHarness>();
}

#[test]
fn test_injected_failure_leaves_store_unchanged() {
    let store = InMemoryStore::new("graph");
    let mut mutation = BackendMutation::new();
    mutation
        .add(BackendEntry::new(ElementType::Vertex, Id::Numeric(1)), MutateAction::Insert)
        .expect("add");

    store.fail_next_mutate();
    store.begin_tx().expect("begin");
    assert!(store.mutate(&mutation).is_err());
    store.rollback_tx().expect("rollback");

    let all = store.query(&Query::new(ElementType::Vertex).into()).expect("scan");
    assert!(all.is_empty());
}

#[test]
fn test_numeric_ids_scan_in_numeric_order() {
    let store = InMemoryStore::new("graph");
    let mut mutation = BackendMutation::new();
    for n in [5, -3, 12, 0] {
        mutation
            .add(BackendEntry::new(ElementType::Vertex, Id::Numeric(n)), MutateAction::Insert)
            .expect("add");
    }
    store.mutate(&mutation).expect("mutate");

    let ids: Vec<Id> = store
        .query(&Query::new(ElementType::Vertex).into())
        .expect("scan")
        .iter()
        .map(|e| e.id().clone())
        .collect();
    assert_eq!(ids, [Id::Numeric(-3), Id::Numeric(0), Id::Numeric(5), Id::Numeric(12)]);
}
