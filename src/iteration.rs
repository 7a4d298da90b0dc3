//! Collection combinators.
//!
//! [`Iteration`] snapshots a collection and drives it through an async iteratee with a
//! configurable [`Limit`]. Every combinator comes in three modes chosen on the builder:
//! parallel (the default, [`Limit::Unbounded`]), limited ([`Iteration::limit`]) and
//! serial ([`Iteration::series`]).
//!
//! Results are always placed by key, independent of completion order, and the first
//! error stops admission of further keys (fail-fast). Work already in flight is never
//! cancelled; see [`Drain`] and [`Detach`].

use std::future::Future;
use std::hash::Hash;

use futures::FutureExt;
use indexmap::IndexMap;

use crate::collect::{
    Concat, Detect, Discard, First, Grouped, Keyed, Ordered, Partition, Sorted, Verdict,
};
use crate::collection::{Entries, IntoEntries, Seq};
use crate::engine::{self, Detach, Drain, Settle, Slot};
use crate::types::{Limit, Spawner};

fn slot<'a, R, E, Fut>(index: usize, fut: Fut) -> Slot<'a, R, E>
where
    Fut: Future<Output = Result<R, E>> + Send + 'a,
{
    Box::pin(fut.map(move |outcome| (index, outcome)))
}

/// A snapshotted collection ready to be driven through an iteratee.
///
/// # Examples
///
/// ```
/// use flowx::Iteration;
///
/// # futures::executor::block_on(async {
/// let doubled = Iteration::new(vec![1, 2, 3])
///     .limit(2)
///     .map(|n| async move { Ok::<_, ()>(n * 2) })
///     .await;
///
/// assert_eq!(doubled, Ok(vec![2, 4, 6]));
/// # });
/// ```
///
/// Mappings keep their keys:
///
/// ```
/// use flowx::Iteration;
/// use indexmap::IndexMap;
///
/// # futures::executor::block_on(async {
/// let mut prices = IndexMap::new();
/// prices.insert("tea", 3);
/// prices.insert("cake", 5);
///
/// let taxed = Iteration::new(prices)
///     .map_values(|_name, price| async move { Ok::<_, ()>(price * 2) })
///     .await
///     .unwrap();
///
/// assert_eq!(taxed["cake"], 10);
/// # });
/// ```
#[derive(Debug)]
pub struct Iteration<K, T, S = Drain> {
    entries: Entries<K, T>,
    limit: Limit,
    settle: S,
}

impl<K, T> Iteration<K, T, Drain> {
    /// Snapshot `collection` into ordered `(key, item)` pairs.
    pub fn new<C>(collection: C) -> Self
    where
        C: IntoEntries<Key = K, Item = T>,
    {
        Self {
            entries: collection.into_entries(),
            limit: Limit::Unbounded,
            settle: Drain,
        }
    }

    /// Return terminal outcomes immediately and hand in-flight slots to `spawner`.
    ///
    /// Without this, a combinator that decides early (an error, or a decisive
    /// `detect`/`some`/`every` result) polls the slots it already admitted to completion
    /// before returning.
    pub fn detach_with(self, spawner: Spawner) -> Iteration<K, T, Detach> {
        Iteration {
            entries: self.entries,
            limit: self.limit,
            settle: Detach::new(spawner),
        }
    }
}

impl<K, T, S> Iteration<K, T, S> {
    /// Keep at most `limit` iteratee calls in flight.
    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Run one key at a time, in key order.
    pub fn series(self) -> Self {
        self.limit(Limit::SERIAL)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `f` on every item for its side effects.
    pub async fn each<'a, E, F, Fut>(self, mut f: F) -> Result<(), E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'a,
        S: Settle<'a, (), E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            Discard,
            settle,
        )
        .await
    }

    /// Like [`each`](Self::each), but the iteratee also receives the key.
    pub async fn each_of<'a, E, F, Fut>(self, mut f: F) -> Result<(), E>
    where
        F: FnMut(K, T) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'a,
        S: Settle<'a, (), E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        engine::run(
            entries,
            limit,
            |index, (key, item)| slot(index, f(key, item)),
            Discard,
            settle,
        )
        .await
    }

    /// Transform every item, collecting results in key order.
    pub async fn map<'a, R, E, F, Fut>(self, mut f: F) -> Result<Vec<R>, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'a,
        S: Settle<'a, R, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        let collector = Ordered::new(entries.len());
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            collector,
            settle,
        )
        .await
    }

    /// Transform every item, keeping results under their original keys.
    pub async fn map_values<'a, R, E, F, Fut>(self, mut f: F) -> Result<IndexMap<K, R>, E>
    where
        K: Clone + Hash + Eq,
        F: FnMut(K, T) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'a,
        S: Settle<'a, R, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        let collector = Keyed::new(entries.iter().map(|(key, _)| key.clone()).collect());
        engine::run(
            entries,
            limit,
            |index, (key, item)| slot(index, f(key, item)),
            collector,
            settle,
        )
        .await
    }

    /// Keep the items whose predicate resolves to `true`, in their original order.
    pub async fn filter<'a, E, F, Fut>(self, f: F) -> Result<Vec<T>, E>
    where
        T: Clone,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<bool, E>> + Send + 'a,
        S: Settle<'a, bool, E>,
    {
        self.partition(f, true).await
    }

    /// Drop the items whose predicate resolves to `true`, in their original order.
    pub async fn reject<'a, E, F, Fut>(self, f: F) -> Result<Vec<T>, E>
    where
        T: Clone,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<bool, E>> + Send + 'a,
        S: Settle<'a, bool, E>,
    {
        self.partition(f, false).await
    }

    async fn partition<'a, E, F, Fut>(self, mut f: F, keep: bool) -> Result<Vec<T>, E>
    where
        T: Clone,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<bool, E>> + Send + 'a,
        S: Settle<'a, bool, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        let items = entries.iter().map(|(_, item)| item.clone()).collect();
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            Partition::new(items, keep),
            settle,
        )
        .await
    }

    /// Resolve with the first item, in completion order, whose predicate holds.
    ///
    /// Admission stops as soon as a match is observed.
    pub async fn detect<'a, E, F, Fut>(self, mut f: F) -> Result<Option<T>, E>
    where
        T: Clone,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<bool, E>> + Send + 'a,
        S: Settle<'a, bool, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        let items = entries.iter().map(|(_, item)| item.clone()).collect();
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            Detect::new(items),
            settle,
        )
        .await
    }

    /// Whether any predicate resolves to `true`. Stops at the first `true`.
    pub async fn some<'a, E, F, Fut>(self, mut f: F) -> Result<bool, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<bool, E>> + Send + 'a,
        S: Settle<'a, bool, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            Verdict::some(),
            settle,
        )
        .await
    }

    /// Whether every predicate resolves to `true`. Stops at the first `false`.
    pub async fn every<'a, E, F, Fut>(self, mut f: F) -> Result<bool, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<bool, E>> + Send + 'a,
        S: Settle<'a, bool, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            Verdict::every(),
            settle,
        )
        .await
    }

    /// Map every item to a sequence and flatten the sequences in key order.
    pub async fn concat<'a, R, E, F, Fut>(self, mut f: F) -> Result<Vec<R>, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<Vec<R>, E>> + Send + 'a,
        S: Settle<'a, Vec<R>, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        let collector = Concat::new(entries.len());
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            collector,
            settle,
        )
        .await
    }

    /// Bucket items by the group each iteratee call resolves to.
    pub async fn group_by<'a, G, E, F, Fut>(self, mut f: F) -> Result<IndexMap<G, Vec<T>>, E>
    where
        T: Clone,
        G: Hash + Eq,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<G, E>> + Send + 'a,
        S: Settle<'a, G, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        let items = entries.iter().map(|(_, item)| item.clone()).collect();
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            Grouped::new(items),
            settle,
        )
        .await
    }

    /// Sort items by the criterion each iteratee call resolves to. Ties keep key order.
    pub async fn sort_by<'a, C, E, F, Fut>(self, mut f: F) -> Result<Vec<T>, E>
    where
        T: Clone,
        C: Ord,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<C, E>> + Send + 'a,
        S: Settle<'a, C, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        let items = entries.iter().map(|(_, item)| item.clone()).collect();
        engine::run(
            entries,
            limit,
            |index, (_, item)| slot(index, f(item)),
            Sorted::new(items),
            settle,
        )
        .await
    }

    /// Fold items in key order, one at a time. The limit is ignored.
    pub async fn reduce<A, E, F, Fut>(self, init: A, mut f: F) -> Result<A, E>
    where
        F: FnMut(A, T) -> Fut,
        Fut: Future<Output = Result<A, E>>,
    {
        let mut acc = init;
        for (_, item) in self.entries {
            acc = f(acc, item).await?;
        }
        Ok(acc)
    }

    /// Fold items in reverse key order, one at a time. The limit is ignored.
    pub async fn reduce_right<A, E, F, Fut>(self, init: A, mut f: F) -> Result<A, E>
    where
        F: FnMut(A, T) -> Fut,
        Fut: Future<Output = Result<A, E>>,
    {
        let mut acc = init;
        for (_, item) in self.entries.into_iter().rev() {
            acc = f(acc, item).await?;
        }
        Ok(acc)
    }

    /// Fold `(key, item)` pairs in key order into an accumulator. The limit is ignored.
    pub async fn transform<A, E, F, Fut>(self, init: A, mut f: F) -> Result<A, E>
    where
        F: FnMut(A, K, T) -> Fut,
        Fut: Future<Output = Result<A, E>>,
    {
        let mut acc = init;
        for (key, item) in self.entries {
            acc = f(acc, key, item).await?;
        }
        Ok(acc)
    }
}

impl<K, Fut, S> Iteration<K, Fut, S> {
    /// Resolve with the first outcome to settle, value or error.
    ///
    /// Resolves with `Ok(None)` when there is nothing to race.
    pub async fn race<'a, R, E>(self) -> Result<Option<R>, E>
    where
        Fut: Future<Output = Result<R, E>> + Send + 'a,
        S: Settle<'a, R, E>,
    {
        let Self {
            entries,
            limit,
            settle,
        } = self;
        engine::run(
            entries,
            limit,
            |index, (_, fut)| slot(index, fut),
            First::default(),
            settle,
        )
        .await
    }
}

/// Call `f` with `0..n` concurrently, collecting results in order.
pub async fn times<'a, R, E, F, Fut>(n: usize, f: F) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'a,
    R: 'a,
    E: 'a,
{
    times_limit(n, Limit::Unbounded, f).await
}

/// Call `f` with `0..n`, keeping at most `limit` calls in flight.
pub async fn times_limit<'a, R, E, F, Fut>(
    n: usize,
    limit: impl Into<Limit>,
    f: F,
) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'a,
    R: 'a,
    E: 'a,
{
    Iteration::new(Seq(0..n)).limit(limit).map(f).await
}

/// Call `f` with `0..n` one at a time.
pub async fn times_series<'a, R, E, F, Fut>(n: usize, f: F) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'a,
    R: 'a,
    E: 'a,
{
    times_limit(n, Limit::SERIAL, f).await
}

/// Run a collection of tasks concurrently, collecting results in key order.
///
/// # Examples
///
/// ```
/// # futures::executor::block_on(async {
/// let tasks = ["one", "three"].map(|word| move || async move { Ok::<_, ()>(word.len()) });
///
/// assert_eq!(flowx::parallel(tasks).await, Ok(vec![3, 5]));
/// # });
/// ```
pub async fn parallel<'a, C, Task, R, E, Fut>(tasks: C) -> Result<Vec<R>, E>
where
    C: IntoEntries<Item = Task>,
    Task: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'a,
    R: 'a,
    E: 'a,
{
    parallel_limit(tasks, Limit::Unbounded).await
}

/// Run a collection of tasks with at most `limit` in flight.
pub async fn parallel_limit<'a, C, Task, R, E, Fut>(
    tasks: C,
    limit: impl Into<Limit>,
) -> Result<Vec<R>, E>
where
    C: IntoEntries<Item = Task>,
    Task: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'a,
    R: 'a,
    E: 'a,
{
    Iteration::new(tasks).limit(limit).map(|task| task()).await
}

/// Run a collection of tasks one after another.
pub async fn series<'a, C, Task, R, E, Fut>(tasks: C) -> Result<Vec<R>, E>
where
    C: IntoEntries<Item = Task>,
    Task: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'a,
    R: 'a,
    E: 'a,
{
    parallel_limit(tasks, Limit::SERIAL).await
}

/// Resolve with the first of `futures` to settle, value or error.
pub async fn race<'a, I, R, E, Fut>(futures: I) -> Result<Option<R>, E>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<R, E>> + Send + 'a,
    R: 'a,
    E: 'a,
{
    Iteration::new(Seq(futures)).race().await
}
