//! Cargo batching and priority ordering

use std::time::Duration;

use flowx::{PriorityQueue, Queue, QueueError};
use tokio::time::sleep;

use crate::common::{tokio_spawner, Recorder};

#[tokio::test(start_paused = true)]
async fn test_cargo_groups_tasks_pushed_while_busy() {
    let batches = Recorder::new();
    let cargo = {
        let batches = batches.clone();
        Queue::cargo(
            3,
            move |batch: Vec<u32>| {
                batches.record(batch.clone());
                async move {
                    sleep(Duration::from_millis(10)).await;
                    Ok::<_, String>(batch.iter().sum::<u32>())
                }
            },
            tokio_spawner(),
        )
        .unwrap()
    };

    let first = cargo.push(1);
    let rest = cargo.push_all([2, 3, 4, 5]);
    cargo.drained().await;

    assert_eq!(batches.events(), vec![vec![1], vec![2, 3, 4], vec![5]]);
    assert_eq!(first.await, Ok(Ok(1)));
    let sums: Vec<_> = futures::future::join_all(rest).await;
    assert_eq!(sums, vec![Ok(Ok(9)), Ok(Ok(9)), Ok(Ok(9)), Ok(Ok(5))]);
}

#[test]
fn test_cargo_queue_rejects_zero_payload() {
    let err = Queue::<u32, (), ()>::cargo_queue(
        2,
        0,
        |_batch: Vec<u32>| async { Ok(()) },
        tokio_spawner(),
    )
    .unwrap_err();

    assert_eq!(err, QueueError::ZeroPayload);
}

#[tokio::test(start_paused = true)]
async fn test_priority_queue_runs_lowest_value_first() {
    let order = Recorder::new();
    let queue = {
        let order = order.clone();
        PriorityQueue::new(
            1,
            move |name: &'static str| {
                order.record(name);
                async move {
                    sleep(Duration::from_millis(5)).await;
                    Ok::<_, ()>(())
                }
            },
            tokio_spawner(),
        )
        .unwrap()
    };

    queue.pause();
    queue.push("background", 10);
    queue.push_all(["urgent-1", "urgent-2"], -1);
    queue.push("normal", 0);
    queue.resume();
    queue.drained().await;

    assert_eq!(
        order.events(),
        vec!["urgent-1", "urgent-2", "normal", "background"]
    );
}
