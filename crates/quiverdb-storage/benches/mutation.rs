//! Benchmarks for mutation resolution and backend commits.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use quiverdb_core::{ElementType, Id, Value};
use quiverdb_storage::backends::{InMemoryStore, RedbStore};
use quiverdb_storage::{BackendEntry, BackendMutation, BackendStore, MutateAction};

fn vertex(n: i64) -> BackendEntry {
    let mut entry = BackendEntry::new(ElementType::Vertex, Id::Numeric(n));
    entry.put_value("age", &Value::Int(n)).unwrap();
    entry
}

fn inserts(size: i64) -> BackendMutation {
    let mut mutation = BackendMutation::new();
    for n in 0..size {
        mutation.add(vertex(n), MutateAction::Insert).unwrap();
    }
    mutation
}

/// Benchmark adding distinct records.
fn bench_add_distinct(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutation_add_distinct");

    for size in [10, 100, 1000] {
        group.throughput(Throughput::Elements(size));
        group.bench_function(format!("add_{size}"), |b| {
            b.iter(|| black_box(inserts(size as i64)));
        });
    }

    group.finish();
}

/// Benchmark resolving repeated partial updates on one record.
fn bench_add_conflicting(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutation_add_conflicting");
    group.throughput(Throughput::Elements(100));

    group.bench_function("append_eliminate_100", |b| {
        b.iter(|| {
            let mut mutation = BackendMutation::new();
            for i in 0..100 {
                let mut entry = BackendEntry::new(ElementType::VertexLabel, Id::from("person"));
                entry.put_members("~index_names", &[format!("index{}", i % 8)]);
                let action = if i % 3 == 0 { MutateAction::Eliminate } else { MutateAction::Append };
                mutation.add(entry, action).unwrap();
            }
            black_box(mutation)
        });
    });

    group.finish();
}

/// Benchmark committing a mutation to each backend.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("backend_commit");
    let mutation = inserts(100);
    group.throughput(Throughput::Elements(100));

    group.bench_function("memory_commit_100", |b| {
        b.iter_batched(
            || InMemoryStore::new("bench"),
            |store| {
                store.begin_tx().unwrap();
                store.mutate(&mutation).unwrap();
                store.commit_tx().unwrap();
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("redb_commit_100", |b| {
        b.iter_batched(
            || RedbStore::in_memory("bench").unwrap(),
            |store| {
                store.begin_tx().unwrap();
                store.mutate(&mutation).unwrap();
                store.commit_tx().unwrap();
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_add_distinct, bench_add_conflicting, bench_commit);
criterion_main!(benches);
