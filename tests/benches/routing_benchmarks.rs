//! # Kadmesh Routing Benchmarks
//!
//! ```text
//! cargo bench -p kadmesh-tests
//! ```

use criterion::{criterion_group, criterion_main, Criterion};

fn routing_benchmarks(c: &mut Criterion) {
    kadmesh_tests::benchmarks::routing_table::register_benchmarks(c);
}

criterion_group!(benches, routing_benchmarks);
criterion_main!(benches);
