//! Detect/some/every, races and the task-list helpers

use std::time::Duration;

use flowx::{parallel_limit, race, times_series, Iteration};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::sleep;

use crate::common::{delayed, tokio_spawner, Recorder};

#[tokio::test(start_paused = true)]
async fn test_detect_takes_first_match_in_completion_order() {
    let found = Iteration::new(vec![30u64, 10, 20])
        .detect(|ms| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, ()>(true)
        })
        .await;

    assert_eq!(found, Ok(Some(10)));
}

#[tokio::test(start_paused = true)]
async fn test_some_stops_admitting_after_first_true() {
    let started = Recorder::new();

    let any_even = Iteration::new(vec![1u32, 3, 4, 5, 7, 9])
        .limit(2)
        .some(|n| {
            started.record(n);
            async move {
                sleep(Duration::from_millis(10)).await;
                Ok::<_, ()>(n % 2 == 0)
            }
        })
        .await;

    assert_eq!(any_even, Ok(true));
    assert_eq!(started.events(), vec![1, 3, 4, 5]);
}

#[tokio::test]
async fn test_every_is_vacuously_true_on_empty_input() {
    let all = Iteration::new(Vec::<u32>::new())
        .every(|_| async { Ok::<_, ()>(false) })
        .await;

    assert_eq!(all, Ok(true));
}

#[tokio::test(start_paused = true)]
async fn test_decision_observed_before_error_wins() {
    let result = Iteration::new(vec![(10u64, Ok(false)), (20, Ok(true)), (30, Err("late"))])
        .every(|(ms, outcome)| async move {
            sleep(Duration::from_millis(ms)).await;
            outcome
        })
        .await;

    assert_eq!(result, Ok(false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_detached_settle_returns_before_in_flight_finish() {
    let (done_tx, done_rx) = futures::channel::oneshot::channel::<()>();
    let mut done_tx = Some(done_tx);

    let result = Iteration::new(vec![0u64, 1])
        .detach_with(tokio_spawner())
        .map(|n| {
            let done = if n == 1 { done_tx.take() } else { None };
            async move {
                if n == 0 {
                    return Err("first");
                }
                sleep(Duration::from_millis(50)).await;
                if let Some(done) = done {
                    let _ = done.send(());
                }
                Ok(n)
            }
        })
        .await;

    assert_eq!(result, Err("first"));
    // The leftover slot keeps running on the spawner
    assert!(done_rx.await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_race_first_settled_wins() {
    let winner = race(vec![
        delayed(30, Ok::<_, &str>("slow")).boxed(),
        delayed(10, Err("fast failure")).boxed(),
    ])
    .await;

    assert_eq!(winner, Err("fast failure"));
}

#[tokio::test(start_paused = true)]
async fn test_parallel_limit_runs_task_list() {
    let gauge = crate::common::Gauge::new();
    let tasks: Vec<Box<dyn FnOnce() -> BoxFuture<'static, Result<u32, ()>> + Send>> = (0..6u32)
        .map(|n| {
            let gauge = gauge.clone();
            Box::new(move || {
                async move {
                    let _inflight = gauge.enter();
                    sleep(Duration::from_millis(5)).await;
                    Ok(n * n)
                }
                .boxed()
            }) as Box<dyn FnOnce() -> BoxFuture<'static, Result<u32, ()>> + Send>
        })
        .collect();

    let squares = parallel_limit(tasks, 3).await;

    assert_eq!(squares, Ok(vec![0, 1, 4, 9, 16, 25]));
    assert_eq!(gauge.peak(), 3);
}

#[tokio::test]
async fn test_times_series_counts_up() {
    let calls = Recorder::new();

    let ids = times_series(4, |n| {
        let calls = calls.clone();
        async move {
            calls.record(n);
            Ok::<_, ()>(format!("id-{n}"))
        }
    })
    .await;

    let expected: Vec<String> = (0..4).map(|n| format!("id-{n}")).collect();
    assert_eq!(ids, Ok(expected));
    assert_eq!(calls.events(), vec![0, 1, 2, 3]);
}
