use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use keygate::{Limiter, LimiterConfig, MemoryStore, Store};

fn bench_limiter(config: LimiterConfig, rt: &Runtime) -> Limiter {
    // entering the runtime lets the store spawn its purge task
    let _guard = rt.enter();
    let store = Store::with_backend(Box::new(MemoryStore::new(Duration::from_secs(1))));
    Limiter::with_store(store, config)
}

fn wide_open_policy() -> LimiterConfig {
    LimiterConfig {
        period_ms: 60_000,
        limit: u32::MAX,
        duration_ms: 0,
        timeout_ms: 1_000,
    }
}

fn bench_take(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("take");

    group.bench_function("unique_keys", |b| {
        let limiter = bench_limiter(wide_open_policy(), &rt);
        let mut i: u64 = 0;
        b.iter(|| {
            i += 1;
            let key = format!("bench-key-{i}");
            rt.block_on(limiter.take(black_box(&key))).unwrap();
        })
    });

    group.bench_function("same_key", |b| {
        let limiter = bench_limiter(wide_open_policy(), &rt);
        b.iter(|| rt.block_on(limiter.take(black_box("bench-contended-key"))).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_take);
criterion_main!(benches);
