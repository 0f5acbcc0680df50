//! Property-based tests for the net effect of buffered writes.

use std::collections::BTreeMap;

use proptest::prelude::*;

use quiverdb::{AbstractTransaction, Graph};
use quiverdb_core::query::Query;
use quiverdb_core::{ElementType, Id, Value};
use quiverdb_storage::BackendEntry;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, i64),
    Remove(u8),
    Commit,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..4, any::<i64>()).prop_map(|(v, age)| Op::Put(v, age)),
        3 => (0u8..4).prop_map(Op::Remove),
        1 => Just(Op::Commit),
    ]
}

fn vertex_id(v: u8) -> Id {
    Id::from(format!("v{v}"))
}

proptest! {
    #[test]
    fn committed_state_matches_last_write_per_record(ops in prop::collection::vec(arb_op(), 0..32)) {
        let graph = Graph::in_memory().unwrap();
        let mut tx = graph.transaction();
        let mut model: BTreeMap<Id, i64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(v, age) => {
                    let mut entry = BackendEntry::new(ElementType::Vertex, vertex_id(v));
                    entry.put_value("age", &Value::Int(age)).unwrap();
                    tx.add_entry(entry).unwrap();
                    model.insert(vertex_id(v), age);
                }
                Op::Remove(v) => {
                    tx.remove_by_id(ElementType::Vertex, &vertex_id(v)).unwrap();
                    model.remove(&vertex_id(v));
                }
                Op::Commit => {
                    tx.commit().unwrap();
                    prop_assert!(!tx.has_updates());
                }
            }
        }
        tx.commit().unwrap();

        let stored: BTreeMap<Id, i64> = tx
            .query(Query::new(ElementType::Vertex).into())
            .unwrap()
            .into_iter()
            .map(|e| {
                let age = match e.value("age").unwrap() {
                    Some(Value::Int(age)) => age,
                    other => panic!("unexpected age {other:?}"),
                };
                (e.id().clone(), age)
            })
            .collect();
        prop_assert_eq!(stored, model);
    }
}
