//! Validation and scheduling of hand-built graphs

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use flowx::{Auto, AutoTask, GraphError};
use futures::FutureExt;
use tokio::time::{sleep, Instant};

use crate::common::{Gauge, Recorder};

fn timed(ms: u64, deps: &[&str], runs: &Recorder<&'static str>, name: &'static str) -> AutoTask<String> {
    let runs = runs.clone();
    AutoTask::with_deps(deps.to_vec(), move |_| async move {
        runs.record(name);
        sleep(Duration::from_millis(ms)).await;
        Ok(ms)
    })
}

#[test]
fn test_cycle_is_reported_before_any_task_runs() {
    let runs = Recorder::new();
    let err = Auto::new()
        .task("fetch", timed(1, &["store"], &runs, "fetch"))
        .task("parse", timed(1, &["fetch"], &runs, "parse"))
        .task("store", timed(1, &["parse"], &runs, "store"))
        .plan()
        .unwrap_err();

    match err {
        GraphError::Cycle { path } => {
            assert_eq!(path.first(), path.last());
            assert_eq!(path.len(), 4);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert!(runs.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_independent_branches_run_concurrently() {
    let runs = Recorder::new();
    let start = Instant::now();

    let results = Auto::new()
        .task("left", timed(30, &[], &runs, "left"))
        .task("right", timed(30, &[], &runs, "right"))
        .task("join", timed(10, &["left", "right"], &runs, "join"))
        .run()
        .await
        .unwrap()
        .unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(40), "took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(60), "took {elapsed:?}");
    assert_eq!(results.get::<u64>("join"), Ok(&10));
    assert_eq!(runs.events().last(), Some(&"join"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_caps_the_whole_graph() {
    let gauge = Gauge::new();
    let mut auto = Auto::new().concurrency(2);
    for name in ["a", "b", "c", "d", "e"] {
        let gauge = gauge.clone();
        auto = auto.task(
            name,
            AutoTask::leaf(move || async move {
                let _inflight = gauge.enter();
                sleep(Duration::from_millis(10)).await;
                Ok::<_, String>(name)
            }),
        );
    }

    let results = auto.run().await.unwrap().unwrap();

    assert_eq!(gauge.peak(), 2);
    assert_eq!(results.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_failure_skips_dependents_and_keeps_finished_results() {
    let runs = Recorder::new();
    let failed = AutoTask::with_deps(["config"], |_| async move {
        sleep(Duration::from_millis(5)).await;
        Err::<u64, _>("connection refused".to_string())
    });

    let failure = Auto::new()
        .task("config", timed(1, &[], &runs, "config"))
        .task("connect", failed)
        .task("query", timed(1, &["connect"], &runs, "query"))
        .run()
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(failure.task, "connect");
    assert_eq!(failure.error, "connection refused");
    assert!(failure.partial.contains("config"));
    assert!(!failure.partial.contains("query"));
    assert_eq!(runs.events(), vec!["config"]);
}

async fn explode() -> Result<u64, String> {
    sleep(Duration::from_millis(5)).await;
    panic!("task exploded");
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_lets_running_siblings_finish() {
    let runs = Recorder::new();
    let finished = runs.clone();

    let outcome = AssertUnwindSafe(
        Auto::new()
            .task(
                "slow",
                AutoTask::leaf(move || async move {
                    sleep(Duration::from_millis(20)).await;
                    finished.record("slow");
                    Ok::<_, String>(20u64)
                }),
            )
            .task("boom", AutoTask::leaf(explode))
            .task("after", timed(1, &["boom"], &runs, "after"))
            .run(),
    )
    .catch_unwind()
    .await;

    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"task exploded"));
    // The sibling in flight completed before the panic resumed; the dependent never ran
    assert_eq!(runs.events(), vec!["slow"]);
}
