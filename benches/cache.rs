#![allow(unused)]
extern crate dotbind;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dotbind::utils::cache::ConcurrentCache;
use rayon::prelude::*;
use std::hint::black_box;

/// Lookups of already published values, the steady state of a compilation
fn bench_hits(c: &mut Criterion) {
    let cache: ConcurrentCache<u32, String> = ConcurrentCache::new();
    for key in 0..1024 {
        cache.get_or_create(key, |key| format!("value{key}"));
    }

    c.bench_function("cache_hit", |b| {
        let mut key = 0u32;
        b.iter(|| {
            key = (key + 1) % 1024;
            black_box(cache.try_get(black_box(&key)))
        });
    });
}

/// Many workers asking for the same few keys of a fresh cache
fn bench_contended_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_contended_create");

    for keys in [1u32, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
            b.iter(|| {
                let cache: ConcurrentCache<u32, u64> = ConcurrentCache::new();
                (0..4096u32).into_par_iter().for_each(|i| {
                    black_box(cache.get_or_create(i % keys, |key| u64::from(*key) * 3));
                });
                black_box(cache.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hits, bench_contended_create);
criterion_main!(benches);
