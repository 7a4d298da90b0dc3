//! Collection normalization.
//!
//! Every combinator works on an eagerly snapshotted list of `(key, item)` pairs. Keys are
//! positional indexes for sequences and field keys for mappings, so the key set cannot
//! change once iteration starts.

use std::collections::BTreeMap;

use indexmap::IndexMap;

/// Snapshot of a collection as ordered `(key, item)` pairs.
pub type Entries<K, T> = Vec<(K, T)>;

/// A collection that can be driven through an iteratee.
///
/// Implemented for vectors and arrays (keys are `usize` indexes), insertion-ordered
/// [`IndexMap`]s and sorted [`BTreeMap`]s (keys are the map keys), and arbitrary
/// iterators through the [`Seq`] adapter.
///
/// # Examples
///
/// ```
/// use flowx::{IntoEntries, Seq};
/// use indexmap::IndexMap;
///
/// let entries = vec!["a", "b"].into_entries();
/// assert_eq!(entries, vec![(0, "a"), (1, "b")]);
///
/// let mut map = IndexMap::new();
/// map.insert("z", 1);
/// map.insert("a", 2);
/// assert_eq!(map.into_entries(), vec![("z", 1), ("a", 2)]);
///
/// let lazy = Seq((1..=3).map(|n| n * 10));
/// assert_eq!(lazy.into_entries(), vec![(0, 10), (1, 20), (2, 30)]);
/// ```
pub trait IntoEntries {
    type Key;
    type Item;

    /// Produce the ordered `(key, item)` pairs once.
    fn into_entries(self) -> Entries<Self::Key, Self::Item>;
}

impl<T> IntoEntries for Vec<T> {
    type Key = usize;
    type Item = T;

    fn into_entries(self) -> Entries<usize, T> {
        self.into_iter().enumerate().collect()
    }
}

impl<T, const N: usize> IntoEntries for [T; N] {
    type Key = usize;
    type Item = T;

    fn into_entries(self) -> Entries<usize, T> {
        self.into_iter().enumerate().collect()
    }
}

impl<K, V> IntoEntries for IndexMap<K, V> {
    type Key = K;
    type Item = V;

    fn into_entries(self) -> Entries<K, V> {
        self.into_iter().collect()
    }
}

impl<K, V> IntoEntries for BTreeMap<K, V> {
    type Key = K;
    type Item = V;

    fn into_entries(self) -> Entries<K, V> {
        self.into_iter().collect()
    }
}

/// Adapter for lazily produced sequences.
///
/// The wrapped iterator is drained eagerly when iteration starts and its items are
/// keyed by position.
#[derive(Debug, Clone)]
pub struct Seq<I>(pub I);

impl<I: IntoIterator> IntoEntries for Seq<I> {
    type Key = usize;
    type Item = I::Item;

    fn into_entries(self) -> Entries<usize, I::Item> {
        self.0.into_iter().enumerate().collect()
    }
}
