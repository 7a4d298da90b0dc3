//! Worker-pool queues.
//!
//! A [`Queue`] is long-lived: tasks are pushed over time and processed by at most
//! `concurrency` workers. Each worker is a future handed to the queue's [`Spawner`], so
//! the queue keeps making progress without anyone polling it.
//!
//! Pending tasks live in an arena-backed linked list. Admission happens whenever a
//! worker slot is free, the queue is not paused and a task is pending: synchronously
//! inside [`push`](Queue::push), and again every time a worker finishes.
//!
//! Lifecycle hooks (`saturated`, `unsaturated`, `empty`, `drain`, `error`) hold at most
//! one handler each; assigning a new one replaces the previous. Hooks run on the
//! thread that caused the transition, never while the queue's lock is held, so a hook
//! may call back into the queue. The same holds for the iterators passed to
//! `push_all`/`unshift_all` and the predicate passed to [`remove`](Queue::remove).
//!
//! Variants:
//! - [`Queue::new`]: one task per worker call
//! - [`Queue::cargo`] / [`Queue::cargo_queue`]: workers receive batches of up to
//!   `payload` tasks
//! - [`PriorityQueue`]: pending tasks ordered by priority, lowest first

use std::collections::HashSet;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, error, info, trace};

use crate::dll::Dll;
use crate::error::QueueError;
use crate::types::Spawner;

mod cargo;
mod priority;

pub use priority::PriorityQueue;

/// Resolves with the outcome of one pushed task.
///
/// Resolves with `Err(Canceled)` if the task never ran: it was removed, the queue was
/// killed, or its worker panicked.
pub type Completion<R, E> = oneshot::Receiver<Result<R, E>>;

type BatchWorker<T, R, E> =
    Arc<dyn Fn(Vec<T>) -> BoxFuture<'static, Vec<Result<R, E>>> + Send + Sync>;
type Hook = Arc<dyn Fn() + Send + Sync>;
type ErrorHook<T, E> = Arc<dyn Fn(&E, &T) + Send + Sync>;

struct Hooks<T, E> {
    saturated: Option<Hook>,
    unsaturated: Option<Hook>,
    empty: Option<Hook>,
    drain: Option<Hook>,
    error: Option<ErrorHook<T, E>>,
}

impl<T, E> Default for Hooks<T, E> {
    fn default() -> Self {
        Self {
            saturated: None,
            unsaturated: None,
            empty: None,
            drain: None,
            error: None,
        }
    }
}

impl<T, E> Clone for Hooks<T, E> {
    fn clone(&self) -> Self {
        Self {
            saturated: self.saturated.clone(),
            unsaturated: self.unsaturated.clone(),
            empty: self.empty.clone(),
            drain: self.drain.clone(),
            error: self.error.clone(),
        }
    }
}

fn fire(hook: &Option<Hook>) {
    if let Some(hook) = hook {
        hook();
    }
}

struct Entry<T, R, E> {
    id: u64,
    task: T,
    priority: i64,
    done: oneshot::Sender<Result<R, E>>,
}

/// Where a new task goes in the pending list.
#[derive(Debug, Clone, Copy)]
enum Placement {
    Back,
    Front,
    Priority(i64),
}

struct State<T, R, E> {
    pending: Dll<Entry<T, R, E>>,
    /// Tasks held by each running worker.
    workers: IndexMap<u64, Vec<T>>,
    running: usize,
    concurrency: usize,
    buffer: usize,
    paused: bool,
    started: bool,
    next_worker: u64,
    next_entry: u64,
    hooks: Hooks<T, E>,
    drained: Vec<oneshot::Sender<()>>,
}

impl<T, R, E> State<T, R, E> {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running == 0
    }

    /// Take the `drained()` waiters if the queue is idle.
    fn take_waiters_if_idle(&mut self) -> Vec<oneshot::Sender<()>> {
        if self.is_idle() {
            mem::take(&mut self.drained)
        } else {
            Vec::new()
        }
    }
}

struct Inner<T, R, E> {
    state: Mutex<State<T, R, E>>,
    worker: BatchWorker<T, R, E>,
    payload: usize,
    spawner: Spawner,
}

/// One admitted batch on its way to a worker.
struct Launch<T, R, E> {
    id: u64,
    tasks: Vec<T>,
    entries: Vec<Entry<T, R, E>>,
}

/// A persistent worker pool.
///
/// Cloning a `Queue` yields another handle to the same pool.
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
/// let queue = Queue::new(2, |n: u32| async move { Ok::<_, ()>(n * 10) }, spawner).unwrap();
/// let first = queue.push(1);
/// let second = queue.push(2);
///
/// assert_eq!(first.await, Ok(Ok(10)));
/// assert_eq!(second.await, Ok(Ok(20)));
/// queue.drained().await;
/// assert!(queue.idle());
/// # });
/// ```
pub struct Queue<T, R = (), E = ()> {
    inner: Arc<Inner<T, R, E>>,
}

impl<T, R, E> Clone for Queue<T, R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R, E> std::fmt::Debug for Queue<T, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Queue")
            .field("pending", &state.pending.len())
            .field("running", &state.running)
            .field("concurrency", &state.concurrency)
            .field("payload", &self.inner.payload)
            .field("paused", &state.paused)
            .finish()
    }
}

impl<T, R, E> Queue<T, R, E>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create a queue whose `worker` processes one task per call.
    ///
    /// Fails with [`QueueError::ZeroConcurrency`] if `concurrency` is zero.
    pub fn new<F, Fut>(concurrency: usize, worker: F, spawner: Spawner) -> Result<Self, QueueError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let worker: BatchWorker<T, R, E> = Arc::new(move |mut batch: Vec<T>| match batch.pop() {
            Some(task) => worker(task).map(|result| vec![result]).boxed(),
            None => futures::future::ready(Vec::new()).boxed(),
        });
        Self::with_batch_worker(concurrency, 1, worker, spawner)
    }

    fn with_batch_worker(
        concurrency: usize,
        payload: usize,
        worker: BatchWorker<T, R, E>,
        spawner: Spawner,
    ) -> Result<Self, QueueError> {
        if concurrency == 0 {
            return Err(QueueError::ZeroConcurrency);
        }
        if payload == 0 {
            return Err(QueueError::ZeroPayload);
        }

        #[cfg(feature = "tracing")]
        debug!(concurrency, payload, "creating queue");

        let state = State {
            pending: Dll::new(),
            workers: IndexMap::new(),
            running: 0,
            concurrency,
            buffer: concurrency / 4,
            paused: false,
            started: false,
            next_worker: 0,
            next_entry: 0,
            hooks: Hooks::default(),
            drained: Vec::new(),
        };
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                worker,
                payload,
                spawner,
            }),
        })
    }

    /// Append `task` to the pending list.
    pub fn push(&self, task: T) -> Completion<R, E> {
        self.insert(task, Placement::Back)
    }

    /// Append every task, admitting workers once all of them are queued.
    pub fn push_all<I: IntoIterator<Item = T>>(&self, tasks: I) -> Vec<Completion<R, E>> {
        self.insert_all(tasks, Placement::Back)
    }

    /// Put `task` at the head of the pending list, ahead of everything already waiting.
    pub fn unshift(&self, task: T) -> Completion<R, E> {
        self.insert(task, Placement::Front)
    }

    /// Put `tasks` at the head of the pending list, keeping their relative order.
    pub fn unshift_all<I: IntoIterator<Item = T>>(&self, tasks: I) -> Vec<Completion<R, E>> {
        let tasks: Vec<T> = tasks.into_iter().collect();
        let mut handles = self.insert_all(tasks.into_iter().rev(), Placement::Front);
        handles.reverse();
        handles
    }

    fn insert(&self, task: T, placement: Placement) -> Completion<R, E> {
        let mut handles = self.insert_all(std::iter::once(task), placement);
        match handles.pop() {
            Some(handle) => handle,
            None => unreachable!("one task inserted, one handle returned"),
        }
    }

    fn insert_all<I: IntoIterator<Item = T>>(
        &self,
        tasks: I,
        placement: Placement,
    ) -> Vec<Completion<R, E>> {
        let tasks: Vec<T> = tasks.into_iter().collect();
        let handles = {
            let mut state = self.inner.state.lock();
            state.started = true;
            let handles: Vec<_> = tasks
                .into_iter()
                .map(|task| {
                    let (done, handle) = oneshot::channel();
                    let priority = match placement {
                        Placement::Priority(priority) => priority,
                        Placement::Back | Placement::Front => 0,
                    };
                    let id = state.next_entry;
                    state.next_entry += 1;
                    let entry = Entry {
                        id,
                        task,
                        priority,
                        done,
                    };
                    match placement {
                        Placement::Back => state.pending.push(entry),
                        Placement::Front => state.pending.unshift(entry),
                        Placement::Priority(priority) => state
                            .pending
                            .insert_before(entry, |queued| queued.priority > priority),
                    }
                    handle
                })
                .collect();

            #[cfg(feature = "tracing")]
            debug!(
                pushed = handles.len(),
                pending = state.pending.len(),
                ?placement,
                "tasks queued"
            );

            handles
        };
        self.process();
        handles
    }

    /// Admit pending tasks to workers while slots are free and the queue is not paused.
    fn process(&self) {
        loop {
            let (launch, empty, saturated, hooks) = {
                let mut state = self.inner.state.lock();
                if state.paused || state.running >= state.concurrency || state.pending.is_empty()
                {
                    return;
                }

                let mut entries = Vec::with_capacity(self.inner.payload);
                while entries.len() < self.inner.payload {
                    match state.pending.shift() {
                        Some(entry) => entries.push(entry),
                        None => break,
                    }
                }
                let tasks: Vec<T> = entries.iter().map(|entry| entry.task.clone()).collect();

                let id = state.next_worker;
                state.next_worker += 1;
                state.running += 1;
                state.workers.insert(id, tasks.clone());

                #[cfg(feature = "tracing")]
                trace!(
                    worker = id,
                    tasks = tasks.len(),
                    running = state.running,
                    "worker admitted"
                );

                (
                    Launch { id, tasks, entries },
                    state.pending.is_empty(),
                    state.running == state.concurrency,
                    state.hooks.clone(),
                )
            };

            if empty {
                fire(&hooks.empty);
            }
            if saturated {
                fire(&hooks.saturated);
            }
            self.launch(launch);
        }
    }

    fn launch(&self, launch: Launch<T, R, E>) {
        let Launch { id, tasks, entries } = launch;
        let worker = &self.inner.worker;

        let fut = match panic::catch_unwind(AssertUnwindSafe(|| worker(tasks))) {
            Ok(fut) => fut,
            Err(_) => {
                #[cfg(feature = "tracing")]
                error!(worker = id, "worker panicked before returning a future");

                self.finish(id, entries, None);
                return;
            }
        };

        let queue = self.clone();
        self.inner.spawner.spawn(Box::pin(async move {
            let outcome = AssertUnwindSafe(fut).catch_unwind().await;

            #[cfg(feature = "tracing")]
            if outcome.is_err() {
                error!(worker = id, "worker panicked");
            }

            queue.finish(id, entries, outcome.ok());
            queue.process();
        }));
    }

    /// Book-keeping for a worker that returned (`Some`) or panicked (`None`).
    fn finish(&self, id: u64, entries: Vec<Entry<T, R, E>>, outcome: Option<Vec<Result<R, E>>>) {
        let (hooks, unsaturated, idle, waiters) = {
            let mut state = self.inner.state.lock();
            state.running = state.running.saturating_sub(1);
            state.workers.shift_remove(&id);
            let unsaturated =
                state.pending.len() < state.concurrency.saturating_sub(state.buffer);
            let idle = state.is_idle();
            let waiters = state.take_waiters_if_idle();
            (state.hooks.clone(), unsaturated, idle, waiters)
        };

        if let Some(results) = outcome {
            for (entry, result) in entries.into_iter().zip(results) {
                if let (Err(error), Some(hook)) = (&result, &hooks.error) {
                    hook(error, &entry.task);
                }
                // The caller may have dropped its handle.
                let _ = entry.done.send(result);
            }
        }

        if unsaturated {
            fire(&hooks.unsaturated);
        }
        if idle {
            #[cfg(feature = "tracing")]
            info!("queue drained");

            fire(&hooks.drain);
            for waiter in waiters {
                let _ = waiter.send(());
            }
        }
    }

    /// Drop every pending task matching `pred`, returning the removed tasks.
    ///
    /// `pred` sees a snapshot of the pending tasks and runs without the queue's lock
    /// held. Tasks admitted to a worker meanwhile are not removed, and tasks pushed
    /// meanwhile are kept. Running tasks are unaffected. Completion handles of removed
    /// tasks resolve with `Canceled`. If the removal leaves the queue idle, the `drain`
    /// hook fires.
    pub fn remove<P>(&self, mut pred: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        let snapshot: Vec<(u64, T)> = {
            let state = self.inner.state.lock();
            state
                .pending
                .iter()
                .map(|entry| (entry.id, entry.task.clone()))
                .collect()
        };
        let matched: HashSet<u64> = snapshot
            .into_iter()
            .filter(|(_, task)| pred(task))
            .map(|(id, _)| id)
            .collect();
        if matched.is_empty() {
            return Vec::new();
        }

        let (removed, idle, hooks, waiters) = {
            let mut state = self.inner.state.lock();
            let removed = state.pending.remove(|entry| matched.contains(&entry.id));
            let idle = !removed.is_empty() && state.is_idle();
            (removed, idle, state.hooks.clone(), state.take_waiters_if_idle())
        };

        #[cfg(feature = "tracing")]
        debug!(removed = removed.len(), idle, "pending tasks removed");

        if idle {
            fire(&hooks.drain);
        }
        for waiter in waiters {
            let _ = waiter.send(());
        }
        removed.into_iter().map(|entry| entry.task).collect()
    }

    /// Stop admitting new workers. Running workers finish normally.
    pub fn pause(&self) {
        self.inner.state.lock().paused = true;

        #[cfg(feature = "tracing")]
        debug!("queue paused");
    }

    /// Resume admission after [`pause`](Self::pause).
    pub fn resume(&self) {
        {
            let mut state = self.inner.state.lock();
            if !state.paused {
                return;
            }
            state.paused = false;
        }

        #[cfg(feature = "tracing")]
        debug!("queue resumed");

        self.process();
    }

    /// Drop all pending tasks and detach every hook.
    ///
    /// Running workers are not interrupted; the queue can be used again afterwards.
    pub fn kill(&self) {
        let waiters = {
            let mut state = self.inner.state.lock();
            state.hooks = Hooks::default();
            let dropped = state.pending.clear();

            #[cfg(feature = "tracing")]
            debug!(dropped = dropped.len(), "queue killed");

            drop(dropped);
            state.take_waiters_if_idle()
        };
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// Resolves once no task is pending or running; immediately if already idle.
    pub fn drained(&self) -> impl Future<Output = ()> + Send + 'static {
        let waiter = {
            let mut state = self.inner.state.lock();
            if state.is_idle() {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.drained.push(tx);
                Some(rx)
            }
        };
        async move {
            if let Some(rx) = waiter {
                let _ = rx.await;
            }
        }
    }

    /// Change the number of workers allowed at once.
    ///
    /// Raising it admits pending tasks immediately. Lowering it only throttles future
    /// admissions.
    pub fn set_concurrency(&self, concurrency: usize) -> Result<(), QueueError> {
        if concurrency == 0 {
            return Err(QueueError::ZeroConcurrency);
        }
        self.inner.state.lock().concurrency = concurrency;
        self.process();
        Ok(())
    }

    /// Set the slack used by the `unsaturated` hook. Defaults to `concurrency / 4`.
    pub fn set_buffer(&self, buffer: usize) {
        self.inner.state.lock().buffer = buffer;
    }

    pub fn on_saturated(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner.state.lock().hooks.saturated = Some(Arc::new(hook));
    }

    pub fn on_unsaturated(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner.state.lock().hooks.unsaturated = Some(Arc::new(hook));
    }

    pub fn on_empty(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner.state.lock().hooks.empty = Some(Arc::new(hook));
    }

    /// Called whenever the last pending or running task is done, or a
    /// [`remove`](Self::remove) leaves the queue idle.
    ///
    /// [`kill`](Self::kill) detaches this hook before dropping the pending tasks, so it
    /// does not fire there even though `drained()` waiters are released.
    pub fn on_drain(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner.state.lock().hooks.drain = Some(Arc::new(hook));
    }

    /// Called with the error and the task for every failed task.
    pub fn on_error(&self, hook: impl Fn(&E, &T) + Send + Sync + 'static) {
        self.inner.state.lock().hooks.error = Some(Arc::new(hook));
    }
}

impl<T: Clone, R, E> Queue<T, R, E> {
    /// Number of pending (not yet started) tasks.
    pub fn length(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Number of running workers.
    pub fn running(&self) -> usize {
        self.inner.state.lock().running
    }

    /// Tasks currently held by running workers, in admission order.
    pub fn workers_list(&self) -> Vec<T> {
        let state = self.inner.state.lock();
        state.workers.values().flatten().cloned().collect()
    }

    /// Whether nothing is pending and nothing is running.
    pub fn idle(&self) -> bool {
        self.inner.state.lock().is_idle()
    }

    /// Whether any task has ever been pushed.
    pub fn started(&self) -> bool {
        self.inner.state.lock().started
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    pub fn concurrency(&self) -> usize {
        self.inner.state.lock().concurrency
    }

    pub fn buffer(&self) -> usize {
        self.inner.state.lock().buffer
    }

    /// Maximum number of tasks handed to one worker call.
    pub fn payload(&self) -> usize {
        self.inner.payload
    }
}
