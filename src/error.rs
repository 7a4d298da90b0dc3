//! Error types.
//!
//! Validation errors ([`GraphError`], [`QueueError`]) are returned synchronously from
//! constructors and planners, before any task runs. Task errors are the caller's own
//! error type and travel through the async outcome of the combinator that ran them.

use std::fmt;

use thiserror::Error;

use crate::auto::Results;

/// The dependency graph handed to [`Auto`](crate::Auto) cannot be scheduled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// A task names a dependency that is not part of the graph.
    #[error("task `{task}` depends on `{dependency}`, which does not exist")]
    MissingDependency { task: String, dependency: String },

    /// The dependency relation loops back on itself.
    ///
    /// `path` lists the task names along the cycle, starting and ending with the task
    /// where it was detected.
    #[error("dependency cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// Two tasks were registered under the same name.
    #[error("task `{0}` is defined more than once")]
    DuplicateTask(String),
}

/// A worker-pool queue was configured with a value it cannot run with.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueueError {
    #[error("concurrency must not be zero")]
    ZeroConcurrency,

    #[error("payload must not be zero")]
    ZeroPayload,
}

/// Typed lookup into [`Results`] failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LookupError {
    #[error("no result recorded for task `{0}`")]
    NotFound(String),

    #[error("result of task `{name}` is not a `{expected}`")]
    TypeMismatch { name: String, expected: &'static str },
}

/// The distinguished error produced by [`timeout`](crate::timeout).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("callback function \"{name}\" timed out")]
pub struct Timeout {
    name: String,
    info: Option<String>,
}

impl Timeout {
    /// Stable identifying code of every timeout error.
    pub const CODE: &'static str = "ETIMEDOUT";

    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            info: None,
        }
    }

    pub(crate) fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn code(&self) -> &'static str {
        Self::CODE
    }

    /// Name of the operation that ran out of time.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }
}

/// Either the wrapped operation's own error or a [`Timeout`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeoutError<E> {
    #[error(transparent)]
    Elapsed(Timeout),

    #[error("{0}")]
    Inner(E),
}

impl<E> TimeoutError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutError::Elapsed(_))
    }
}

/// The first task error of an [`Auto`](crate::Auto) run.
///
/// Carries the failing task's name and the results of every task that had already
/// completed when the failure was observed.
#[derive(Error)]
#[error("task `{task}` failed: {error}")]
pub struct AutoFailure<E> {
    pub task: String,
    pub error: E,
    pub partial: Results,
}

impl<E: fmt::Debug> fmt::Debug for AutoFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoFailure")
            .field("task", &self.task)
            .field("error", &self.error)
            .field("partial", &self.partial)
            .finish()
    }
}
