//! # Routing Table Benchmarks
//!
//! Targets:
//! - XOR distance and bucket index: tens of nanoseconds
//! - `find_closest` over a populated 20-wide table: well under 1ms
//! - Insertion bursts including full-bucket rejections
//!
//! Identifiers are uniformly random, so most peers land in the first few
//! buckets and those fill first; the clustered case forces deep buckets.

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use kadmesh_routing::{
    bucket_index, find_k_closest, xor_distance, Insertion, NodeId, PeerId, RoutingTable,
};
use rand::Rng;
use std::time::Duration;

const BUCKET_SIZE: usize = 20;

fn random_id(rng: &mut impl Rng) -> NodeId {
    NodeId::new(rng.gen())
}

fn random_peer(rng: &mut impl Rng, port: u16) -> PeerId {
    PeerId::new(format!("10.1.0.1:{port}"), random_id(rng))
}

/// Identifiers sharing a `prefix_bytes`-long prefix with `local`.
fn clustered_peers(local: &NodeId, count: usize, prefix_bytes: usize) -> Vec<PeerId> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let mut bytes: [u8; 32] = rng.gen();
            bytes[..prefix_bytes].copy_from_slice(&local.as_bytes()[..prefix_bytes]);
            PeerId::new(format!("10.2.0.1:{i}"), NodeId::new(bytes))
        })
        .collect()
}

fn populated_table(local: PeerId, target_len: usize) -> RoutingTable {
    let mut rng = rand::thread_rng();
    let mut table = RoutingTable::new(local, BUCKET_SIZE);
    let mut attempts = 0u32;
    while table.len() < target_len && attempts < 200_000 {
        table.try_insert(random_peer(&mut rng, (attempts % 60_000) as u16));
        attempts += 1;
    }
    table
}

pub fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing/distance");
    let mut rng = rand::thread_rng();
    let a = random_id(&mut rng);
    let b = random_id(&mut rng);

    group.bench_function("xor_distance", |bench| {
        bench.iter(|| black_box(xor_distance(black_box(&a), black_box(&b))))
    });
    group.bench_function("bucket_index", |bench| {
        bench.iter(|| black_box(bucket_index(black_box(&a), black_box(&b))))
    });

    group.finish();
}

pub fn bench_find_closest(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing/find_closest");
    group.measurement_time(Duration::from_secs(10));
    let mut rng = rand::thread_rng();
    let local = random_peer(&mut rng, 1);

    let table = populated_table(local.clone(), 200);
    group.bench_function(BenchmarkId::new("random_table", table.len()), |bench| {
        let target = random_id(&mut rng);
        bench.iter(|| black_box(table.find_closest(&target, BUCKET_SIZE)))
    });

    let mut clustered = RoutingTable::new(local.clone(), BUCKET_SIZE);
    for depth in 1..8 {
        for peer in clustered_peers(&local.node_id, BUCKET_SIZE, depth) {
            clustered.try_insert(peer);
        }
    }
    group.bench_function(BenchmarkId::new("clustered_table", clustered.len()), |bench| {
        let target = local.node_id;
        bench.iter(|| black_box(clustered.find_closest(&target, BUCKET_SIZE)))
    });

    for count in [100usize, 1000, 5000] {
        let peers: Vec<PeerId> = (0..count)
            .map(|i| random_peer(&mut rng, i as u16))
            .collect();
        let target = random_id(&mut rng);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("find_k_closest", count), &peers, |bench, peers| {
            bench.iter(|| black_box(find_k_closest(peers.iter().cloned(), &target, BUCKET_SIZE)))
        });
    }

    group.finish();
}

pub fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing/insert");
    let mut rng = rand::thread_rng();
    let local = random_peer(&mut rng, 1);
    let burst: Vec<PeerId> = (0..1000).map(|i| random_peer(&mut rng, i)).collect();

    group.throughput(Throughput::Elements(burst.len() as u64));
    group.bench_function("burst_1000", |bench| {
        bench.iter(|| {
            let mut table = RoutingTable::new(local.clone(), BUCKET_SIZE);
            let mut full = 0usize;
            for peer in &burst {
                if matches!(table.try_insert(peer.clone()), Insertion::Full { .. }) {
                    full += 1;
                }
            }
            black_box((table.len(), full))
        })
    });

    let mut table = populated_table(local, 200);
    let known = table.all_peers();
    group.throughput(Throughput::Elements(1));
    group.bench_function("refresh_known", |bench| {
        let mut i = 0usize;
        bench.iter(|| {
            i = (i + 1) % known.len();
            black_box(table.try_insert(known[i].clone()))
        })
    });

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_distance(c);
    bench_find_closest(c);
    bench_insert(c);
}
