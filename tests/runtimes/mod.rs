//! The combinators on executors other than tokio

use std::future::Future;

use flowx::{Auto, AutoTask, Iteration, Queue, Spawner};
use futures::task::SpawnExt;
use test_case::test_case;

use crate::common::{Gauge, Recorder};

trait RuntimeTest {
    fn run_flowx_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>;
}

struct SmolRuntimeTest;

impl RuntimeTest for SmolRuntimeTest {
    fn run_flowx_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>,
    {
        smol::block_on(f(Spawner::new(|fut| smol::spawn(fut).detach())));
    }
}

struct FuturesExecutorRuntimeTest;

impl RuntimeTest for FuturesExecutorRuntimeTest {
    fn run_flowx_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>,
    {
        let pool = futures::executor::ThreadPool::new().unwrap();

        futures::executor::block_on(f(Spawner::new(move |fut| {
            pool.spawn(fut).unwrap();
        })));
    }
}

struct PollsterRuntimeTest;

impl RuntimeTest for PollsterRuntimeTest {
    fn run_flowx_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>,
    {
        pollster::block_on(f(Spawner::new(|fut| {
            std::thread::spawn(move || pollster::block_on(fut));
        })));
    }
}

#[test_case(SmolRuntimeTest)]
#[test_case(FuturesExecutorRuntimeTest)]
#[test_case(PollsterRuntimeTest)]
fn test_limited_map(runner: impl RuntimeTest) {
    runner.run_flowx_test(|_spawner| async {
        let gauge = Gauge::new();

        let squares = Iteration::new(vec![1u32, 2, 3, 4, 5, 6])
            .limit(3)
            .map(|n| {
                let gauge = gauge.clone();
                async move {
                    let _inflight = gauge.enter();
                    futures::future::ready(()).await;
                    Ok::<_, ()>(n * n)
                }
            })
            .await;

        assert_eq!(squares, Ok(vec![1, 4, 9, 16, 25, 36]));
        assert!(gauge.peak() <= 3);
    })
}

#[test_case(SmolRuntimeTest)]
#[test_case(FuturesExecutorRuntimeTest)]
#[test_case(PollsterRuntimeTest)]
fn test_queue_drains(runner: impl RuntimeTest) {
    runner.run_flowx_test(|spawner| async move {
        let seen = Recorder::new();
        let queue = {
            let seen = seen.clone();
            Queue::new(
                2,
                move |n: u32| {
                    let seen = seen.clone();
                    async move {
                        seen.record(n);
                        Ok::<_, ()>(n + 100)
                    }
                },
                spawner,
            )
            .unwrap()
        };

        let handles = queue.push_all(0..8);
        queue.drained().await;

        let mut seen = seen.events();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        assert_eq!(handles.len(), 8);
        for (n, handle) in (0u32..).zip(handles) {
            assert_eq!(handle.await, Ok(Ok(n + 100)));
        }
    })
}

#[test_case(SmolRuntimeTest)]
#[test_case(FuturesExecutorRuntimeTest)]
#[test_case(PollsterRuntimeTest)]
fn test_dependency_graph(runner: impl RuntimeTest) {
    runner.run_flowx_test(|_spawner| async {
        let results = Auto::new()
            .task("x", AutoTask::leaf(|| async { Ok::<_, String>(2i32) }))
            .task("y", AutoTask::leaf(|| async { Ok::<_, String>(3i32) }))
            .task(
                "sum",
                AutoTask::with_deps(["x", "y"], |deps| async move {
                    let x = deps.cloned::<i32>("x").map_err(|e| e.to_string())?;
                    let y = deps.cloned::<i32>("y").map_err(|e| e.to_string())?;
                    Ok::<_, String>(x + y)
                }),
            )
            .run()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(results.get::<i32>("sum"), Ok(&5));
    })
}
