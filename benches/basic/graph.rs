//! Dependency-graph planning and execution

use std::hint::black_box;

use criterion::Criterion;
use flowx::{Auto, AutoTask};

fn layered(width: usize, depth: usize) -> Auto<()> {
    let mut auto = Auto::new();
    for layer in 0..depth {
        for i in 0..width {
            let name = format!("t{layer}_{i}");
            let task = if layer == 0 {
                AutoTask::leaf(move || async move { Ok(i) })
            } else {
                let deps: Vec<String> = (0..width).map(|j| format!("t{}_{j}", layer - 1)).collect();
                AutoTask::with_deps(deps, move |_| async move { Ok(i) })
            };
            auto = auto.task(name, task);
        }
    }
    auto
}

pub fn bench_graph(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("plan_10x10_layers", |b| {
        b.iter(|| black_box(layered(10, 10).plan().unwrap()));
    });

    c.bench_function("run_10x10_layers", |b| {
        b.iter(|| {
            rt.block_on(async {
                let results = layered(10, 10).run().await.unwrap().unwrap();
                black_box(results)
            })
        });
    });
}
