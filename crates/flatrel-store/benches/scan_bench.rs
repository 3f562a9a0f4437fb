//! Table scan benchmarks.

use std::fmt::Write;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flatrel_store::codec::decode_records;
use flatrel_store::{Aggregate, Catalog, Field, Query, Queryable, Schema, StoreConfig};
use tempfile::TempDir;

fn schemas() -> (Arc<Schema>, Arc<Schema>) {
    let task = Schema::new("Task", vec![Field::text("name"), Field::text("project")]).unwrap();
    let log = Schema::new(
        "Log",
        vec![
            Field::reference("task", &task),
            Field::float("start"),
            Field::float("end"),
            Field::text("description"),
        ],
    )
    .unwrap();
    (task, log)
}

/// Writes 100 tasks and `logs` log lines spread over them.
fn populate(dir: &TempDir, logs: usize) {
    let mut tasks = String::new();
    for i in 0..100 {
        writeln!(tasks, "task-{},project-{}", i, i % 7).unwrap();
    }
    std::fs::write(dir.path().join("task.csv"), tasks).unwrap();

    let mut lines = String::new();
    for i in 0..logs {
        let start = 1_700_000_000.0 + (i as f64) * 60.0;
        writeln!(lines, "{},{},{},\"entry, #{}\"", i % 100, start, start + 45.0, i).unwrap();
    }
    std::fs::write(dir.path().join("log.csv"), lines).unwrap();
}

fn decode_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    populate(&dir, 10_000);
    let content = std::fs::read_to_string(dir.path().join("log.csv")).unwrap();

    c.bench_function("decode_10000", |b| {
        b.iter(|| black_box(decode_records(&content, ',', "Log").unwrap().len()))
    });
}

fn load_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    populate(&dir, 10_000);
    let catalog = Catalog::open(StoreConfig::with_data_dir(dir.path())).unwrap();
    let (_, log) = schemas();
    let table = catalog.get(&log).unwrap();

    c.bench_function("load_10000", |b| {
        b.iter(|| {
            table.refresh();
            black_box(table.len().unwrap())
        })
    });
}

fn query_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    populate(&dir, 10_000);
    let catalog = Catalog::open(StoreConfig::with_data_dir(dir.path())).unwrap();
    let (_, log) = schemas();
    let table = catalog.get(&log).unwrap();
    let query = Query::new()
        .filter("end_ge", 1_700_300_000.0)
        .order([("end", "desc")])
        .limit(20);

    c.bench_function("filter_sort_limit_10000", |b| {
        b.iter(|| black_box(table.read(&query).unwrap().len()))
    });
}

fn group_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    populate(&dir, 10_000);
    let catalog = Catalog::open(StoreConfig::with_data_dir(dir.path())).unwrap();
    let (_, log) = schemas();
    let table = catalog.get(&log).unwrap();

    c.bench_function("group_max_10000", |b| {
        b.iter(|| {
            let groups = table
                .group_by("task", &[("end", Aggregate::max("end"))])
                .unwrap();
            black_box(groups.len().unwrap())
        })
    });
}

criterion_group!(
    benches,
    decode_benchmark,
    load_benchmark,
    query_benchmark,
    group_benchmark
);
criterion_main!(benches);
