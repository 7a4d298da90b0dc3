//! Engine overhead for each concurrency mode

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use flowx::{Iteration, Limit, Seq};

pub fn bench_iteration(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("map_1000");

    for limit in [Limit::Unbounded, Limit::Bounded(16), Limit::SERIAL] {
        group.bench_with_input(BenchmarkId::from_parameter(limit), &limit, |b, &limit| {
            b.iter(|| {
                rt.block_on(async {
                    let out = Iteration::new(Seq(0..1000u64))
                        .limit(limit)
                        .map(|n| async move { Ok::<_, ()>(n + 1) })
                        .await;
                    black_box(out)
                })
            });
        });
    }
    group.finish();

    c.bench_function("detect_early_hit_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    Iteration::new(Seq(0..1000u64))
                        .limit(8)
                        .detect(|n| async move { Ok::<_, ()>(n == 3) })
                        .await,
                )
            })
        });
    });
}
