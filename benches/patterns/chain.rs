//! Long sequential chains

use std::hint::black_box;

use criterion::Criterion;
use flowx::{seq, step, unary, waterfall, Auto, AutoTask};

pub fn bench_chain(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("graph_chain_200", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut auto = Auto::<()>::new().task("n0", AutoTask::leaf(|| async { Ok(0u32) }));
                for i in 1..200u32 {
                    auto = auto.task(
                        format!("n{i}"),
                        AutoTask::with_deps([format!("n{}", i - 1)], move |_| async move { Ok(i) }),
                    );
                }
                black_box(auto.run().await.unwrap().unwrap())
            })
        });
    });

    c.bench_function("waterfall_200_steps", |b| {
        b.iter(|| {
            rt.block_on(async {
                let steps = (0..200)
                    .map(|_| step(|prev: Option<u64>| async move { Ok::<_, ()>(prev.unwrap_or(0) + 1) }))
                    .collect();
                black_box(waterfall(steps).await)
            })
        });
    });

    c.bench_function("seq_200_functions", |b| {
        let pipeline =
            seq((0..200).map(|_| unary(|n: u64| async move { Ok::<_, ()>(n + 1) })).collect());
        b.iter(|| rt.block_on(async { black_box(pipeline(0).await) }));
    });
}
