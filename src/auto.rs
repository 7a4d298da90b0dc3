//! Dependency graph scheduler.
//!
//! [`Auto`] collects named tasks, each either a [`Leaf`](AutoTask::Leaf) or a task that
//! [depends on](AutoTask::WithDeps) other tasks by name. [`Auto::plan`] validates the
//! graph up front (every dependency exists, no cycles) and returns a [`Plan`]. Running
//! the plan is maximally eager: a task starts the moment its last dependency resolves
//! and a slot under the global concurrency cap is free, without waiting for the rest
//! of its "layer".
//!
//! # Examples
//!
//! ```
//! use flowx::{Auto, AutoTask};
//!
//! # futures::executor::block_on(async {
//! let plan = Auto::new()
//!     .task("width", AutoTask::leaf(|| async { Ok::<_, String>(3u32) }))
//!     .task("height", AutoTask::leaf(|| async { Ok::<_, String>(4u32) }))
//!     .task(
//!         "area",
//!         AutoTask::with_deps(["width", "height"], |deps| async move {
//!             let w: &u32 = deps.get("width").map_err(|e| e.to_string())?;
//!             let h: &u32 = deps.get("height").map_err(|e| e.to_string())?;
//!             Ok::<_, String>(w * h)
//!         }),
//!     )
//!     .plan()
//!     .unwrap();
//!
//! let results = plan.run().await.unwrap();
//! assert_eq!(results.get::<u32>("area"), Ok(&12));
//! # });
//! ```

use std::any::{type_name, Any};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use indexmap::IndexMap;

#[cfg(feature = "tracing")]
use tracing::{debug, error, info, trace};

use crate::engine::Panic;
use crate::error::{AutoFailure, GraphError, LookupError};
use crate::types::Limit;

/// Type-erased task output.
type Value = Arc<dyn Any + Send + Sync>;

type LeafFn<E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<Value, E>> + Send>;
type DepsFn<E> = Box<dyn FnOnce(Results) -> BoxFuture<'static, Result<Value, E>> + Send>;

/// Resolved task outputs, keyed by task name.
///
/// Cloning is cheap: values are shared, not copied.
#[derive(Clone, Default)]
pub struct Results {
    values: IndexMap<String, Value>,
}

impl Results {
    /// Borrow the output of task `name` as a `T`.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T, LookupError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| LookupError::NotFound(name.to_owned()))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| LookupError::TypeMismatch {
                name: name.to_owned(),
                expected: type_name::<T>(),
            })
    }

    /// Clone the output of task `name` out as a `T`.
    pub fn cloned<T: Any + Clone>(&self, name: &str) -> Result<T, LookupError> {
        self.get::<T>(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Task names in the order their outputs were recorded.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    fn subset<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Results {
        let values = names
            .into_iter()
            .filter_map(|name| {
                self.values
                    .get_key_value(name)
                    .map(|(key, value)| (key.clone(), Arc::clone(value)))
            })
            .collect();
        Results { values }
    }
}

impl fmt::Debug for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// One named unit of work in an [`Auto`] graph.
pub enum AutoTask<E> {
    /// A task with no dependencies.
    Leaf(LeafFn<E>),
    /// A task that runs once every named dependency has resolved, receiving their
    /// outputs.
    WithDeps(Vec<String>, DepsFn<E>),
}

impl<E: 'static> AutoTask<E> {
    pub fn leaf<F, Fut, T>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Any + Send + Sync,
    {
        AutoTask::Leaf(Box::new(move || f().map(erase).boxed()))
    }

    /// A task that receives the outputs of `deps` once all of them have resolved.
    ///
    /// An empty `deps` list still receives an (empty) [`Results`].
    pub fn with_deps<I, S, F, Fut, T>(deps: I, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(Results) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Any + Send + Sync,
    {
        AutoTask::WithDeps(
            deps.into_iter().map(Into::into).collect(),
            Box::new(move |results| f(results).map(erase).boxed()),
        )
    }
}

impl<E> AutoTask<E> {
    /// Names of the tasks this one waits for.
    pub fn dependencies(&self) -> &[String] {
        match self {
            AutoTask::Leaf(_) => &[],
            AutoTask::WithDeps(deps, _) => deps,
        }
    }
}

impl<E> fmt::Debug for AutoTask<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoTask::Leaf(_) => f.write_str("Leaf"),
            AutoTask::WithDeps(deps, _) => f.debug_tuple("WithDeps").field(deps).finish(),
        }
    }
}

fn erase<T: Any + Send + Sync, E>(result: Result<T, E>) -> Result<Value, E> {
    result.map(|value| Arc::new(value) as Value)
}

/// Adapts a task function's return type to the `Result` an [`AutoTask`] produces.
///
/// Used by [`inject`](crate::inject) to name the error type of a task function.
pub trait TaskResult {
    type Ok: Any + Send + Sync;
    type Error;

    fn into_result(self) -> Result<Self::Ok, Self::Error>;
}

impl<T: Any + Send + Sync, E> TaskResult for Result<T, E> {
    type Ok = T;
    type Error = E;

    fn into_result(self) -> Result<T, E> {
        self
    }
}

/// Dependency lookup used by code generated with [`inject`](crate::inject).
///
/// # Panics
///
/// If `name` has no output or its output is not a `T`.
#[doc(hidden)]
pub fn injected<'r, T: Any>(results: &'r Results, name: &str) -> &'r T {
    match results.get::<T>(name) {
        Ok(value) => value,
        Err(error) => panic!("injected dependency: {error}"),
    }
}

/// Builder for a dependency graph of named tasks.
pub struct Auto<E> {
    tasks: IndexMap<String, AutoTask<E>>,
    duplicates: Vec<String>,
    limit: Limit,
}

impl<E> Default for Auto<E> {
    fn default() -> Self {
        Self {
            tasks: IndexMap::new(),
            duplicates: Vec::new(),
            limit: Limit::Unbounded,
        }
    }
}

impl<E> fmt::Debug for Auto<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auto")
            .field("tasks", &self.tasks)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<E> Auto<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` under `name`.
    ///
    /// Registering a name twice is reported by [`plan`](Self::plan).
    pub fn task(mut self, name: impl Into<String>, task: AutoTask<E>) -> Self {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.tasks.insert(name, task);
        }
        self
    }

    /// Cap the number of tasks running at once across the whole graph.
    ///
    /// A cap of zero is treated as unbounded.
    pub fn concurrency(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = match limit.into() {
            Limit::Bounded(0) => Limit::Unbounded,
            limit => limit,
        };
        self
    }

    /// Validate the graph and compute a topological order.
    ///
    /// Fails before any task runs if a name is registered twice, a dependency does not
    /// exist, or the dependency relation has a cycle.
    pub fn plan(self) -> Result<Plan<E>, GraphError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(GraphError::DuplicateTask(name));
        }

        let mut deps = Vec::with_capacity(self.tasks.len());
        for (name, task) in &self.tasks {
            let mut indexes = Vec::with_capacity(task.dependencies().len());
            for dependency in task.dependencies() {
                let index = self.tasks.get_index_of(dependency).ok_or_else(|| {
                    GraphError::MissingDependency {
                        task: name.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                indexes.push(index);
            }
            deps.push(indexes);
        }

        let order = topological_order(&self.tasks, &deps)?;

        let mut dependents = vec![Vec::new(); deps.len()];
        for (index, task_deps) in deps.iter().enumerate() {
            for &dep in task_deps {
                dependents[dep].push(index);
            }
        }

        let nodes = self
            .tasks
            .into_iter()
            .zip(deps)
            .zip(dependents)
            .map(|(((name, task), deps), dependents)| Node {
                name,
                deps,
                dependents,
                task: Some(task),
            })
            .collect();

        #[cfg(feature = "tracing")]
        debug!(tasks = order.len(), limit = %self.limit, "dependency graph planned");

        Ok(Plan {
            nodes,
            order,
            limit: self.limit,
        })
    }

    /// Validate and run the graph in one step.
    ///
    /// Validation failures are returned as the outer `Err`, before any task runs.
    pub async fn run(self) -> Result<Result<Results, AutoFailure<E>>, GraphError>
    where
        E: 'static,
    {
        let plan = self.plan()?;
        Ok(plan.run().await)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first traversal with an explicit stack, reporting the first cycle found.
///
/// The returned order lists every task after all of its dependencies.
fn topological_order<E>(
    tasks: &IndexMap<String, AutoTask<E>>,
    deps: &[Vec<usize>],
) -> Result<Vec<usize>, GraphError> {
    let mut marks = vec![Mark::Unvisited; deps.len()];
    let mut order = Vec::with_capacity(deps.len());
    let name = |index: usize| -> String {
        tasks
            .get_index(index)
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    };

    for root in 0..deps.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // (task, next dependency to visit)
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::InProgress;

        while let Some((node, cursor)) = stack.last_mut() {
            let node = *node;
            match deps[node].get(*cursor) {
                Some(&dep) => {
                    *cursor += 1;
                    match marks[dep] {
                        Mark::Unvisited => {
                            marks[dep] = Mark::InProgress;
                            stack.push((dep, 0));
                        }
                        Mark::InProgress => {
                            let start = stack
                                .iter()
                                .position(|&(index, _)| index == dep)
                                .unwrap_or(0);
                            let mut path: Vec<String> =
                                stack[start..].iter().map(|&(index, _)| name(index)).collect();
                            path.push(name(dep));
                            return Err(GraphError::Cycle { path });
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[node] = Mark::Done;
                    order.push(node);
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}

struct Node<E> {
    name: String,
    deps: Vec<usize>,
    dependents: Vec<usize>,
    task: Option<AutoTask<E>>,
}

/// A validated dependency graph, ready to run.
pub struct Plan<E> {
    nodes: Vec<Node<E>>,
    order: Vec<usize>,
    limit: Limit,
}

impl<E> fmt::Debug for Plan<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("order", &self.order().collect::<Vec<_>>())
            .field("limit", &self.limit)
            .finish()
    }
}

type Outcome<E> = Result<Result<Value, E>, Panic>;

type Running<E> = FuturesUnordered<BoxFuture<'static, (usize, Outcome<E>)>>;

impl<E> Plan<E> {
    /// Task names in a valid execution order (every task after its dependencies).
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(|&index| self.nodes[index].name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<E: 'static> Plan<E> {
    /// Run every task, starting each as soon as its dependencies have resolved.
    ///
    /// The first task error stops new tasks from starting. Tasks already running are
    /// polled to completion, then the error is returned together with the results
    /// that had been recorded when it was observed.
    ///
    /// # Panics
    ///
    /// A panicking task stops new tasks from starting like an error does. Once the
    /// tasks already running have completed, the panic is resumed on the caller.
    pub async fn run(mut self) -> Result<Results, AutoFailure<E>> {
        let mut waiting: Vec<usize> = self.nodes.iter().map(|node| node.deps.len()).collect();
        let mut ready: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&index| waiting[index] == 0)
            .collect();
        let mut running: Running<E> = FuturesUnordered::new();
        let mut results = Results::default();
        let mut failure: Option<AutoFailure<E>> = None;
        let mut caught: Option<Panic> = None;

        #[cfg(feature = "tracing")]
        info!(tasks = self.nodes.len(), limit = %self.limit, "running dependency graph");

        loop {
            while failure.is_none() && caught.is_none() && self.limit.admits(running.len()) {
                let Some(index) = ready.pop_front() else {
                    break;
                };
                let fut = self.start(index, &results);
                running.push(fut);
            }

            let Some((index, outcome)) = running.next().await else {
                break;
            };
            let stopped = failure.is_some() || caught.is_some();

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(payload) => {
                    if !stopped {
                        #[cfg(feature = "tracing")]
                        error!(
                            task = %self.nodes[index].name,
                            in_flight = running.len(),
                            "task panicked, no further tasks will start"
                        );

                        caught = Some(payload);
                    }
                    continue;
                }
            };

            match outcome {
                Ok(value) => {
                    if stopped {
                        // Drained after a failure; not part of the outcome.
                        continue;
                    }

                    #[cfg(feature = "tracing")]
                    trace!(task = %self.nodes[index].name, "task resolved");

                    results.insert(self.nodes[index].name.clone(), value);
                    for &dependent in &self.nodes[index].dependents {
                        waiting[dependent] -= 1;
                        if waiting[dependent] == 0 {
                            ready.push_back(dependent);
                        }
                    }
                }
                Err(error) => {
                    if stopped {
                        continue;
                    }

                    #[cfg(feature = "tracing")]
                    error!(
                        task = %self.nodes[index].name,
                        in_flight = running.len(),
                        "task failed, no further tasks will start"
                    );

                    failure = Some(AutoFailure {
                        task: self.nodes[index].name.clone(),
                        error,
                        partial: results.clone(),
                    });
                }
            }
        }

        if let Some(payload) = caught {
            panic::resume_unwind(payload);
        }

        match failure {
            Some(failure) => Err(failure),
            None => {
                #[cfg(feature = "tracing")]
                info!(tasks = results.len(), "dependency graph complete");

                Ok(results)
            }
        }
    }

    fn start(&mut self, index: usize, results: &Results) -> BoxFuture<'static, (usize, Outcome<E>)> {
        let node = &mut self.nodes[index];

        #[cfg(feature = "tracing")]
        debug!(task = %node.name, deps = node.deps.len(), "starting task");

        // Task functions are called on first poll so a panic in the call itself is
        // caught along with panics in the future it returns.
        let fut: BoxFuture<'static, Result<Value, E>> = match node.task.take() {
            Some(AutoTask::Leaf(f)) => async move { f().await }.boxed(),
            Some(AutoTask::WithDeps(names, f)) => {
                let deps = results.subset(names.iter().map(String::as_str));
                async move { f(deps).await }.boxed()
            }
            None => unreachable!("task `{}` started twice", node.name),
        };
        AssertUnwindSafe(fut)
            .catch_unwind()
            .map(move |outcome| (index, outcome))
            .boxed()
    }
}
