//! Benchmarks for the cycle table
//!
//! Draw cost for a known client and record creation for new clients.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use joke_server::core::{Category, CycleTable};
use uuid::Uuid;

fn bench_next_index_known_client(c: &mut Criterion) {
    let table = CycleTable::seeded(1);
    let id = Uuid::new_v4();
    table.ensure(id);

    c.bench_function("cycle_next_index_known", |b| {
        b.iter(|| table.next_index(black_box(id), black_box(Category::Joke)))
    });
}

fn bench_ensure_new_clients(c: &mut Criterion) {
    let table = CycleTable::new();

    c.bench_function("cycle_ensure_new", |b| {
        b.iter(|| table.ensure(black_box(Uuid::new_v4())))
    });
}

criterion_group!(benches, bench_next_index_known_client, bench_ensure_new_clients);
criterion_main!(benches);
