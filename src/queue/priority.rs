//! Priority-ordered worker pool.

use std::future::Future;

use super::{Completion, Placement, Queue};
use crate::error::QueueError;
use crate::types::Spawner;

/// A [`Queue`] whose pending tasks are ordered by priority.
///
/// Lower values run first. Tasks with equal priority keep the order they were pushed
/// in. There is no `unshift`: placement is decided by priority alone.
pub struct PriorityQueue<T, R = (), E = ()> {
    queue: Queue<T, R, E>,
}

impl<T, R, E> Clone for PriorityQueue<T, R, E> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T, R, E> std::fmt::Debug for PriorityQueue<T, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PriorityQueue").field(&self.queue).finish()
    }
}

impl<T, R, E> PriorityQueue<T, R, E>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut>(concurrency: usize, worker: F, spawner: Spawner) -> Result<Self, QueueError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        Ok(Self {
            queue: Queue::new(concurrency, worker, spawner)?,
        })
    }

    /// Insert `task` after every pending task with a priority `<= priority`.
    pub fn push(&self, task: T, priority: i64) -> Completion<R, E> {
        self.queue.insert(task, Placement::Priority(priority))
    }

    /// Insert every task with the same `priority`, keeping their relative order.
    pub fn push_all<I: IntoIterator<Item = T>>(
        &self,
        tasks: I,
        priority: i64,
    ) -> Vec<Completion<R, E>> {
        self.queue.insert_all(tasks, Placement::Priority(priority))
    }

    pub fn remove<P: FnMut(&T) -> bool>(&self, pred: P) -> Vec<T> {
        self.queue.remove(pred)
    }

    pub fn pause(&self) {
        self.queue.pause()
    }

    pub fn resume(&self) {
        self.queue.resume()
    }

    pub fn kill(&self) {
        self.queue.kill()
    }

    pub fn drained(&self) -> impl Future<Output = ()> + Send + 'static {
        self.queue.drained()
    }

    pub fn set_concurrency(&self, concurrency: usize) -> Result<(), QueueError> {
        self.queue.set_concurrency(concurrency)
    }

    pub fn set_buffer(&self, buffer: usize) {
        self.queue.set_buffer(buffer)
    }

    pub fn on_saturated(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.queue.on_saturated(hook)
    }

    pub fn on_unsaturated(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.queue.on_unsaturated(hook)
    }

    pub fn on_empty(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.queue.on_empty(hook)
    }

    pub fn on_drain(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.queue.on_drain(hook)
    }

    pub fn on_error(&self, hook: impl Fn(&E, &T) + Send + Sync + 'static) {
        self.queue.on_error(hook)
    }
}

impl<T: Clone, R, E> PriorityQueue<T, R, E> {
    pub fn length(&self) -> usize {
        self.queue.length()
    }

    pub fn running(&self) -> usize {
        self.queue.running()
    }

    pub fn workers_list(&self) -> Vec<T> {
        self.queue.workers_list()
    }

    pub fn idle(&self) -> bool {
        self.queue.idle()
    }

    pub fn started(&self) -> bool {
        self.queue.started()
    }

    pub fn is_paused(&self) -> bool {
        self.queue.is_paused()
    }

    pub fn concurrency(&self) -> usize {
        self.queue.concurrency()
    }

    pub fn buffer(&self) -> usize {
        self.queue.buffer()
    }
}
