//! Core type definitions shared by the iteration engine, the worker pool and the
//! dependency scheduler.
//!
//! This module defines the concurrency limit and the runtime-agnostic spawner used
//! wherever work has to keep running after the caller stops polling.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

/// Maximum number of operations allowed in flight at once.
///
/// `Limit` is the slot budget of every combinator in this crate:
///
/// - [`Limit::Unbounded`] admits every key at once (the "parallel" variants)
/// - [`Limit::Bounded(1)`](Limit::SERIAL) is strictly serial (the "series" variants)
/// - [`Limit::Bounded(n)`] keeps at most `n` operations running
///
/// `Bounded(0)` is legal: nothing is ever admitted and the combinator completes
/// vacuously.
///
/// # Examples
///
/// ```
/// use flowx::Limit;
///
/// assert_eq!(Limit::from(4), Limit::Bounded(4));
/// assert!(Limit::Unbounded.admits(1_000_000));
/// assert!(!Limit::SERIAL.admits(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Limit {
    /// No upper bound on in-flight operations.
    #[default]
    Unbounded,
    /// At most this many operations in flight.
    Bounded(usize),
}

impl Limit {
    /// One slot: call order equals key order, no overlap.
    pub const SERIAL: Limit = Limit::Bounded(1);

    /// Whether one more operation may start while `running` are in flight.
    #[inline]
    pub fn admits(self, running: usize) -> bool {
        match self {
            Limit::Unbounded => true,
            Limit::Bounded(n) => running < n,
        }
    }

    /// Number of slots, `None` when unbounded.
    pub fn slots(self) -> Option<usize> {
        match self {
            Limit::Unbounded => None,
            Limit::Bounded(n) => Some(n),
        }
    }
}

impl From<usize> for Limit {
    fn from(n: usize) -> Self {
        Limit::Bounded(n)
    }
}

impl From<Option<usize>> for Limit {
    fn from(n: Option<usize>) -> Self {
        n.map_or(Limit::Unbounded, Limit::Bounded)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unbounded => f.write_str("unbounded"),
            Limit::Bounded(n) => write!(f, "{n}"),
        }
    }
}

/// Runtime-agnostic spawner.
///
/// Wraps the closure that hands a future to the caller's executor, e.g.
/// `Spawner::new(|fut| { tokio::spawn(fut); })` or
/// `Spawner::new(|fut| smol::spawn(fut).detach())`.
#[derive(Clone)]
pub struct Spawner(Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>);

impl Spawner {
    pub fn new<S>(spawn: S) -> Self
    where
        S: Fn(BoxFuture<'static, ()>) + Send + Sync + 'static,
    {
        Self(Arc::new(spawn))
    }

    pub(crate) fn spawn(&self, fut: BoxFuture<'static, ()>) {
        (self.0)(fut)
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Spawner")
    }
}
