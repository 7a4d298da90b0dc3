//! Async Control Flow
//!
//! Runtime-agnostic combinators for running many independently-completing async
//! operations under an explicit concurrency policy, with deterministic result ordering
//! and fail-fast error semantics.
//!
//! # Features
//!
//! - **One engine, three modes**: every collection combinator runs in parallel
//!   ([`Limit::Unbounded`]), limited ([`Limit::Bounded`]) or serial ([`Limit::SERIAL`])
//!   mode over the same admission loop.
//! - **Results by key**: outputs land at their input's index or key regardless of which
//!   operation finished first.
//! - **Fail-fast without cancellation**: the first error stops new work from starting.
//!   Work already in flight always runs to completion (see [`Drain`] and [`Detach`]).
//! - **Worker pools**: long-lived [`Queue`]s, batching cargo queues and
//!   [`PriorityQueue`]s with pause/resume and lifecycle hooks.
//! - **Dependency graphs**: [`Auto`] validates a graph of named tasks up front and runs it
//!   with maximal parallelism; [`inject`] derives dependencies from parameter names.
//! - **Sequential composition**: [`waterfall`], [`seq`], [`compose`], the `whilst`
//!   family, [`retry`] and [`timeout`].
//! - **Runtime-agnostic**: anything that runs on its own is handed to a caller-supplied
//!   [`Spawner`]. Only [`retry`] intervals and [`timeout`] use the tokio timer.
//!
//! # Quick Start
//!
//! ```
//! use flowx::Iteration;
//!
//! # futures::executor::block_on(async {
//! // At most two lookups in flight; results come back in input order
//! let lengths = Iteration::new(vec!["alpha", "be", "gamma"])
//!     .limit(2)
//!     .map(|word| async move { Ok::<_, String>(word.len()) })
//!     .await;
//!
//! assert_eq!(lengths, Ok(vec![5, 2, 5]));
//! # });
//! ```
//!
//! # Core Concepts
//!
//! ## Iteration
//!
//! [`Iteration::new`] snapshots a collection (anything implementing [`IntoEntries`]:
//! vectors, arrays, [`IndexMap`](indexmap::IndexMap), [`BTreeMap`](std::collections::BTreeMap)
//! or any iterator wrapped in [`Seq`]) into `(key, item)` pairs. Combinators such as
//! [`map`](Iteration::map), [`filter`](Iteration::filter), [`detect`](Iteration::detect)
//! or [`group_by`](Iteration::group_by) then drive the pairs through an async iteratee.
//!
//! A limit of zero is legal and completes without calling the iteratee.
//!
//! ## Short-circuiting
//!
//! [`detect`](Iteration::detect), [`some`](Iteration::some) and
//! [`every`](Iteration::every) stop admitting keys the moment a decisive answer is
//! observed. Whichever terminal outcome the engine observes first wins: a decisive
//! answer observed before an error is returned even if the error arrives while the
//! remaining slots drain.
//!
//! ## Worker pools
//!
//! ```
//! use flowx::{Queue, Spawner};
//!
//! # futures::executor::block_on(async {
//! let pool = futures::executor::ThreadPool::new().unwrap();
//! let queue = Queue::new(
//!     2,
//!     |url: &'static str| async move { Ok::<_, String>(url.len()) },
//!     Spawner::new(move |fut| pool.spawn_ok(fut)),
//! )
//! .unwrap();
//!
//! queue.on_drain(|| println!("all done"));
//! let handle = queue.push("https://example.com");
//! assert_eq!(handle.await, Ok(Ok(19)));
//! # });
//! ```
//!
//! ## Dependency graphs
//!
//! ```
//! use flowx::{inject, Auto};
//!
//! #[inject]
//! async fn rows() -> Result<Vec<u32>, String> {
//!     Ok(vec![1, 2, 3])
//! }
//!
//! #[inject]
//! async fn total(rows: &Vec<u32>) -> Result<u32, String> {
//!     Ok(rows.iter().sum())
//! }
//!
//! # futures::executor::block_on(async {
//! let results = Auto::new()
//!     .task("rows", rows())
//!     .task("total", total())
//!     .plan()
//!     .unwrap()
//!     .run()
//!     .await
//!     .unwrap();
//!
//! assert_eq!(results.get::<u32>("total"), Ok(&6));
//! # });
//! ```
//!
//! Missing dependencies and cycles are reported by [`Auto::plan`] as a [`GraphError`]
//! before any task runs.
//!
//! # Tracing
//!
//! Enable the `tracing` feature to get structured logs from the iteration engine, the
//! queues and the dependency scheduler:
//!
//! ```toml
//! [dependencies]
//! flowx = { version = "0.1", features = ["tracing"] }
//! ```
//!
//! - **INFO**: dependency graph start and completion, queue drain
//! - **DEBUG**: admission halts, graph planning, queue lifecycle, retries
//! - **TRACE**: per-slot admission and completion
//! - **ERROR**: fail-fast triggers and worker panics
//!
//! With the feature disabled (the default) every log statement is compiled out and the
//! `tracing` crate is not linked.

#![allow(private_bounds, private_interfaces)]

extern crate self as flowx;

// Module declarations
mod auto;
mod collect;
mod collection;
mod dll;
mod engine;
mod error;
mod flow;
mod iteration;
mod queue;
mod retry;
mod timeout;
mod types;

// Public re-exports
pub use auto::{Auto, AutoTask, Plan, Results, TaskResult};
pub use collection::{Entries, IntoEntries, Seq};
pub use engine::{Detach, Drain, Settle};
pub use error::{AutoFailure, GraphError, LookupError, QueueError, Timeout, TimeoutError};
pub use flow::{
    compose, do_during, do_until, do_whilst, during, forever, seq, step, try_each, unary,
    until, waterfall, whilst, Step, Unary,
};
pub use iteration::{
    parallel, parallel_limit, race, series, times, times_limit, times_series, Iteration,
};
pub use queue::{Completion, PriorityQueue, Queue};
pub use retry::{retry, retryable, Interval, RetryOptions, Retryable};
pub use timeout::{timeout, timeout_detached};
pub use types::{Limit, Spawner};

// Re-export the procedural macro
pub use flowx_macros::inject;

// Support for generated code - not part of the public API
#[doc(hidden)]
pub use auto::injected;
