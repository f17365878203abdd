use contention::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn criterion_benchmark(c: &mut Criterion) {
    let count = 1 << 16;
    c.bench_with_input(
        BenchmarkId::new("guarded_counter_increment", count),
        &count,
        |b, &count| {
            b.iter(|| {
                let counter = GuardedCounter::new();
                for _ in 0..count {
                    counter.increment();
                }
                counter.get()
            })
        },
    );

    c.bench_with_input(
        BenchmarkId::new("fair_lock_reentrant", count),
        &count,
        |b, &count| {
            let lock = FairLock::new(std::cell::Cell::new(0u64));
            b.iter(|| {
                for _ in 0..count {
                    let outer = lock.lock();
                    let inner = lock.lock();
                    inner.set(outer.get() + 1);
                }
            })
        },
    );

    for threads in [1usize, 4] {
        c.bench_with_input(
            BenchmarkId::new("score_map_update_if_present", threads),
            &threads,
            |b, &threads| {
                let map = Arc::new(ConcurrentScoreMap::<u32>::with_capacity_and_shard_amount(
                    1 << 10,
                    64,
                ));
                for key in 0..1024 {
                    map.put(key, 0);
                }
                b.iter(|| {
                    let tasks = (0..threads).map(|t| {
                        let map = map.clone();
                        move || {
                            for i in 0..(count as u32) {
                                map.update_if_present(&((i + t as u32 * 7) % 1024), 1);
                            }
                        }
                    });
                    run_all("bench", tasks).unwrap();
                })
            },
        );
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
