//! Benchmarks for ring rebuilds and lookups.

use chash_core::HashRing;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn targets(count: usize) -> Vec<(String, u32)> {
    (0..count).map(|i| (format!("10.0.{}.{}:11211", i / 256, i % 256), 1)).collect()
}

fn keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("user:{i:08}")).collect()
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    for &count in &[10usize, 100, 1000] {
        let set = targets(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &set, |b, set| {
            let ring = HashRing::new();
            b.iter(|| {
                ring.set_targets(set.iter().cloned()).unwrap();
                black_box(ring.freeze().unwrap())
            });
        });
    }
    group.finish();
}

fn bench_lookup_list(c: &mut Criterion) {
    let keys = keys(1024);
    let mut group = c.benchmark_group("lookup_list");
    group.throughput(Throughput::Elements(keys.len() as u64));
    for &replicas in &[1usize, 3, 5] {
        let ring = HashRing::new();
        ring.set_targets(targets(100)).unwrap();
        ring.freeze().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(replicas), &replicas, |b, &replicas| {
            b.iter(|| {
                for key in &keys {
                    black_box(ring.lookup_list(key, replicas).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_lookup_balance(c: &mut Criterion) {
    let keys = keys(1024);
    let ring = HashRing::new();
    ring.set_targets(targets(100)).unwrap();
    ring.freeze().unwrap();

    let mut group = c.benchmark_group("lookup_balance");
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("count_3", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(ring.lookup_balance(key, 3).unwrap());
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_lookup_list, bench_lookup_balance);
criterion_main!(benches);
