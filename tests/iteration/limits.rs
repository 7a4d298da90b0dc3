//! Concurrency limits and result ordering

use std::time::Duration;

use flowx::{Iteration, Limit, Seq};
use indexmap::IndexMap;
use tokio::time::sleep;

use crate::common::{Gauge, Recorder};

#[tokio::test(start_paused = true)]
async fn test_map_limit_two_keeps_input_order() {
    let gauge = Gauge::new();
    let started = Recorder::new();

    let doubled = Iteration::new(vec![5u64, 4, 3, 2, 1])
        .limit(2)
        .map(|n| {
            let gauge = gauge.clone();
            started.record(n);
            async move {
                let _inflight = gauge.enter();
                sleep(Duration::from_millis(n * 10)).await;
                Ok::<_, String>(n * 2)
            }
        })
        .await;

    assert_eq!(doubled, Ok(vec![10, 8, 6, 4, 2]));
    assert_eq!(gauge.peak(), 2);
    assert_eq!(started.events(), vec![5, 4, 3, 2, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_limit_at_least_len_is_fully_parallel() {
    let gauge = Gauge::new();

    let result = Iteration::new(Seq(0..5u64))
        .limit(10)
        .map(|n| {
            let gauge = gauge.clone();
            async move {
                let _inflight = gauge.enter();
                sleep(Duration::from_millis(10)).await;
                Ok::<_, ()>(n)
            }
        })
        .await;

    assert_eq!(result, Ok(vec![0, 1, 2, 3, 4]));
    assert_eq!(gauge.peak(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_series_completes_in_key_order() {
    let finished = Recorder::new();

    Iteration::new(vec![30u64, 20, 10])
        .series()
        .each(|ms| {
            let finished = finished.clone();
            async move {
                sleep(Duration::from_millis(ms)).await;
                finished.record(ms);
                Ok::<_, ()>(())
            }
        })
        .await
        .unwrap();

    assert_eq!(finished.events(), vec![30, 20, 10]);
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_stops_admission_and_drains_in_flight() {
    let started = Recorder::new();
    let finished = Recorder::new();

    let result = Iteration::new(Seq(0..10u64))
        .limit(2)
        .each(|n| {
            let finished = finished.clone();
            started.record(n);
            async move {
                if n == 1 {
                    sleep(Duration::from_millis(10)).await;
                    return Err(format!("item {n} failed"));
                }
                sleep(Duration::from_millis(30)).await;
                finished.record(n);
                Ok(())
            }
        })
        .await;

    assert_eq!(result, Err("item 1 failed".to_string()));
    assert_eq!(started.events(), vec![0, 1]);
    // The slot admitted before the failure still ran to completion
    assert_eq!(finished.events(), vec![0]);
}

#[tokio::test]
async fn test_zero_limit_never_calls_iteratee() {
    let started = Recorder::<u32>::new();

    let result = Iteration::new(vec![1u32, 2, 3])
        .limit(Limit::Bounded(0))
        .map(|n| {
            let started = started.clone();
            async move {
                started.record(n);
                Ok::<_, ()>(n)
            }
        })
        .await;

    assert_eq!(result, Ok(vec![]));
    assert!(started.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_map_values_keeps_keys_regardless_of_completion() {
    let mut latency = IndexMap::new();
    latency.insert("slow", 30u64);
    latency.insert("fast", 10);
    latency.insert("medium", 20);

    let halved = Iteration::new(latency)
        .map_values(|_name, ms| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, ()>(ms / 2)
        })
        .await
        .unwrap();

    let keys: Vec<_> = halved.keys().copied().collect();
    assert_eq!(keys, vec!["slow", "fast", "medium"]);
    assert_eq!(halved["fast"], 5);
}

#[tokio::test(start_paused = true)]
async fn test_group_by_and_sort_by_under_limit() {
    let words = vec!["pear", "fig", "plum", "kiwi", "apple"];

    let groups = Iteration::new(words.clone())
        .limit(2)
        .group_by(|word| async move { Ok::<_, ()>(word.len()) })
        .await
        .unwrap();
    assert_eq!(groups[&4], vec!["pear", "plum", "kiwi"]);
    assert_eq!(groups[&3], vec!["fig"]);

    let sorted = Iteration::new(words)
        .limit(3)
        .sort_by(|word| async move {
            sleep(Duration::from_millis(word.len() as u64)).await;
            Ok::<_, ()>(word.len())
        })
        .await
        .unwrap();
    assert_eq!(sorted, vec!["fig", "pear", "plum", "kiwi", "apple"]);
}
