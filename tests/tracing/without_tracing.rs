//! Tests that the library works correctly without tracing feature

use flowx::{Auto, AutoTask, Iteration};

#[tokio::test]
async fn test_iteration_without_tracing() {
    let doubled = Iteration::new(vec![1, 2, 3])
        .series()
        .map(|n| async move { Ok::<_, ()>(n * 2) })
        .await;

    assert_eq!(doubled, Ok(vec![2, 4, 6]));
}

#[tokio::test]
async fn test_graph_without_tracing() {
    let results = Auto::new()
        .task("a", AutoTask::leaf(|| async { Ok::<_, String>(1u8) }))
        .task("b", AutoTask::with_deps(["a"], |_| async { Ok(2u8) }))
        .run()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(results.cloned::<u8>("b"), Ok(2));
}
