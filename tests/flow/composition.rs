//! Waterfalls, composed functions and loops

use std::sync::atomic::{AtomicU32, Ordering};

use flowx::{compose, do_until, seq, step, try_each, unary, waterfall, whilst};

use crate::common::Recorder;

#[tokio::test]
async fn test_waterfall_threads_outputs() {
    let path = waterfall(vec![
        step(|_| async { Ok::<_, String>(vec!["root".to_string()]) }),
        step(|prev: Option<Vec<String>>| async move {
            let mut path = prev.unwrap_or_default();
            path.push("usr".into());
            Ok(path)
        }),
        step(|prev: Option<Vec<String>>| async move {
            let mut path = prev.unwrap_or_default();
            path.push("bin".into());
            Ok(path)
        }),
    ])
    .await;

    assert_eq!(path, Ok(Some(vec!["root".into(), "usr".into(), "bin".into()])));
}

#[tokio::test]
async fn test_waterfall_stops_at_first_error() {
    let reached = &AtomicU32::new(0);

    let result = waterfall(vec![
        step(|_| async { Err::<u32, _>("bad input") }),
        step(move |_| async move {
            reached.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }),
    ])
    .await;

    assert_eq!(result, Err("bad input"));
    assert_eq!(reached.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_seq_and_compose_apply_in_opposite_orders() {
    let add_one = || unary(|n: i64| async move { Ok::<_, ()>(n + 1) });
    let double = || unary(|n: i64| async move { Ok::<_, ()>(n * 2) });

    let pipeline = seq(vec![add_one(), double()]);
    let composed = compose(vec![add_one(), double()]);

    assert_eq!(pipeline(5).await, Ok(12));
    assert_eq!(composed(5).await, Ok(11));
    // Reusable
    assert_eq!(pipeline(0).await, Ok(2));
}

#[tokio::test]
async fn test_whilst_and_do_until_loop_counts() {
    let count = &AtomicU32::new(0);

    let last = whilst(
        || count.load(Ordering::SeqCst) < 3,
        || async move { Ok::<_, ()>(count.fetch_add(1, Ordering::SeqCst) + 1) },
    )
    .await;
    assert_eq!(last, Ok(Some(3)));

    let polls = &AtomicU32::new(0);
    let ready = do_until(
        || async move { Ok::<_, ()>(polls.fetch_add(1, Ordering::SeqCst) + 1) },
        |seen| *seen >= 4,
    )
    .await;
    assert_eq!(ready, Ok(4));
}

#[tokio::test]
async fn test_try_each_falls_through_to_first_success() {
    let asked = Recorder::new();

    let attempts = ["primary", "replica", "backup"].map(|host| {
        let asked = asked.clone();
        move || async move {
            asked.record(host);
            if host == "primary" {
                Err(format!("{host} down"))
            } else {
                Ok(host)
            }
        }
    });

    assert_eq!(try_each(attempts).await, Ok(Some("replica")));
    assert_eq!(asked.events(), vec!["primary", "replica"]);
}
