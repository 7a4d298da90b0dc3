//! Batching constructors.
//!
//! A cargo worker receives up to `payload` pending tasks per call and produces one
//! outcome for the whole batch. Every task in the batch observes that same outcome.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use super::{BatchWorker, Queue};
use crate::error::QueueError;
use crate::types::Spawner;

impl<T, R, E> Queue<T, R, E>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A single batching worker: tasks pushed while it runs are delivered together on
    /// its next call, up to `payload` at a time.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowx::{Queue, Spawner};
    ///
    /// # futures::executor::block_on(async {
    /// let pool = futures::executor::ThreadPool::new().unwrap();
    /// let spawner = Spawner::new(move |fut| pool.spawn_ok(fut));
    ///
    /// let cargo = Queue::cargo(
    ///     2,
    ///     |batch: Vec<&'static str>| async move { Ok::<_, ()>(batch.len()) },
    ///     spawner,
    /// )
    /// .unwrap();
    ///
    /// cargo.pause();
    /// let handles = cargo.push_all(["a", "b", "c"]);
    /// cargo.resume();
    ///
    /// let sizes: Vec<_> = futures::future::join_all(handles).await;
    /// assert_eq!(sizes, vec![Ok(Ok(2)), Ok(Ok(2)), Ok(Ok(1))]);
    /// # });
    /// ```
    pub fn cargo<F, Fut>(payload: usize, worker: F, spawner: Spawner) -> Result<Self, QueueError>
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        Self::cargo_queue(1, payload, worker, spawner)
    }

    /// Up to `concurrency` batching workers, each receiving up to `payload` tasks.
    ///
    /// Fails with [`QueueError::ZeroConcurrency`] or [`QueueError::ZeroPayload`].
    pub fn cargo_queue<F, Fut>(
        concurrency: usize,
        payload: usize,
        worker: F,
        spawner: Spawner,
    ) -> Result<Self, QueueError>
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let worker: BatchWorker<T, R, E> = Arc::new(move |batch: Vec<T>| {
            let size = batch.len();
            worker(batch)
                .map(move |outcome| vec![outcome; size])
                .boxed()
        });
        Self::with_batch_worker(concurrency, payload, worker, spawner)
    }
}
