//! One source feeding many independent consumers

use std::hint::black_box;

use criterion::Criterion;
use flowx::{parallel_limit, Auto, AutoTask};

pub fn bench_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("graph_fanout_1_to_500", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut auto =
                    Auto::<()>::new().task("source", AutoTask::leaf(|| async { Ok(42u64) }));
                for i in 0..500u64 {
                    auto = auto.task(
                        format!("sink_{i}"),
                        AutoTask::with_deps(["source"], move |deps| async move {
                            Ok(deps.get::<u64>("source").map_or(0, |v| v + i))
                        }),
                    );
                }
                black_box(auto.run().await.unwrap().unwrap())
            })
        });
    });

    c.bench_function("parallel_limit_500_tasks", |b| {
        b.iter(|| {
            rt.block_on(async {
                let tasks: Vec<_> = (0..500u64)
                    .map(|i| move || async move { Ok::<_, ()>(i) })
                    .collect();
                black_box(parallel_limit(tasks, 32).await)
            })
        });
    });
}
