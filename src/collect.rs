//! Ordered result collectors.
//!
//! A collector receives each settled slot's value at the position of its key, in
//! completion order, and builds the final result in key order. Predicate collectors can
//! report a decisive result, which stops admission the same way an error does.

use std::hash::Hash;

use indexmap::IndexMap;

/// Whether the engine should keep admitting keys after a recorded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Decided,
}

pub(crate) trait Collector<R> {
    type Output;

    fn record(&mut self, index: usize, value: R) -> Flow;

    fn finish(self) -> Self::Output;
}

fn empty_slots<R>(len: usize) -> Vec<Option<R>> {
    std::iter::repeat_with(|| None).take(len).collect()
}

/// Ignores values (`each`).
#[derive(Debug, Default)]
pub(crate) struct Discard;

impl<R> Collector<R> for Discard {
    type Output = ();

    fn record(&mut self, _index: usize, _value: R) -> Flow {
        Flow::Continue
    }

    fn finish(self) {}
}

/// Writes each value at its key's position (`map`).
#[derive(Debug)]
pub(crate) struct Ordered<R> {
    slots: Vec<Option<R>>,
}

impl<R> Ordered<R> {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            slots: empty_slots(len),
        }
    }
}

impl<R> Collector<R> for Ordered<R> {
    type Output = Vec<R>;

    fn record(&mut self, index: usize, value: R) -> Flow {
        self.slots[index] = Some(value);
        Flow::Continue
    }

    fn finish(self) -> Vec<R> {
        self.slots.into_iter().flatten().collect()
    }
}

/// Writes each value under its original key (`map_values`).
#[derive(Debug)]
pub(crate) struct Keyed<K, R> {
    keys: Vec<K>,
    slots: Vec<Option<R>>,
}

impl<K, R> Keyed<K, R> {
    pub(crate) fn new(keys: Vec<K>) -> Self {
        let slots = empty_slots(keys.len());
        Self { keys, slots }
    }
}

impl<K: Hash + Eq, R> Collector<R> for Keyed<K, R> {
    type Output = IndexMap<K, R>;

    fn record(&mut self, index: usize, value: R) -> Flow {
        self.slots[index] = Some(value);
        Flow::Continue
    }

    fn finish(self) -> IndexMap<K, R> {
        self.keys
            .into_iter()
            .zip(self.slots)
            .filter_map(|(key, slot)| slot.map(|value| (key, value)))
            .collect()
    }
}

/// Keeps the items whose predicate matched `keep` (`filter` / `reject`).
///
/// Items whose key was never visited are dropped, so a vacuous run yields nothing.
#[derive(Debug)]
pub(crate) struct Partition<T> {
    items: Vec<T>,
    verdicts: Vec<Option<bool>>,
    keep: bool,
}

impl<T> Partition<T> {
    pub(crate) fn new(items: Vec<T>, keep: bool) -> Self {
        let verdicts = vec![None; items.len()];
        Self {
            items,
            verdicts,
            keep,
        }
    }
}

impl<T> Collector<bool> for Partition<T> {
    type Output = Vec<T>;

    fn record(&mut self, index: usize, value: bool) -> Flow {
        self.verdicts[index] = Some(value);
        Flow::Continue
    }

    fn finish(self) -> Vec<T> {
        let keep = self.keep;
        self.items
            .into_iter()
            .zip(self.verdicts)
            .filter_map(|(item, verdict)| (verdict == Some(keep)).then_some(item))
            .collect()
    }
}

/// Stops at the first item whose predicate holds (`detect`).
#[derive(Debug)]
pub(crate) struct Detect<T> {
    items: Vec<Option<T>>,
    found: Option<T>,
}

impl<T> Detect<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter().map(Some).collect(),
            found: None,
        }
    }
}

impl<T> Collector<bool> for Detect<T> {
    type Output = Option<T>;

    fn record(&mut self, index: usize, value: bool) -> Flow {
        if !value {
            return Flow::Continue;
        }
        self.found = self.items[index].take();
        Flow::Decided
    }

    fn finish(self) -> Option<T> {
        self.found
    }
}

/// Stops at the first predicate result equal to `decisive` (`some` / `every`).
///
/// `some` decides on `true`, `every` decides on `false`. Without a decisive result the
/// answer is the opposite of `decisive`, which makes empty input `false` for `some` and
/// `true` for `every`.
#[derive(Debug)]
pub(crate) struct Verdict {
    decisive: bool,
    seen: bool,
}

impl Verdict {
    pub(crate) fn some() -> Self {
        Self {
            decisive: true,
            seen: false,
        }
    }

    pub(crate) fn every() -> Self {
        Self {
            decisive: false,
            seen: false,
        }
    }
}

impl Collector<bool> for Verdict {
    type Output = bool;

    fn record(&mut self, _index: usize, value: bool) -> Flow {
        if value == self.decisive {
            self.seen = true;
            Flow::Decided
        } else {
            Flow::Continue
        }
    }

    fn finish(self) -> bool {
        if self.seen {
            self.decisive
        } else {
            !self.decisive
        }
    }
}

/// Flattens sub-sequences in key order (`concat`).
#[derive(Debug)]
pub(crate) struct Concat<R> {
    slots: Vec<Option<Vec<R>>>,
}

impl<R> Concat<R> {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            slots: empty_slots(len),
        }
    }
}

impl<R> Collector<Vec<R>> for Concat<R> {
    type Output = Vec<R>;

    fn record(&mut self, index: usize, value: Vec<R>) -> Flow {
        self.slots[index] = Some(value);
        Flow::Continue
    }

    fn finish(self) -> Vec<R> {
        self.slots.into_iter().flatten().flatten().collect()
    }
}

/// Buckets items by the value their iteratee produced (`group_by`).
///
/// Groups appear in the key order of their first member; members keep key order.
#[derive(Debug)]
pub(crate) struct Grouped<T, G> {
    items: Vec<T>,
    groups: Vec<Option<G>>,
}

impl<T, G> Grouped<T, G> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        let groups = empty_slots(items.len());
        Self { items, groups }
    }
}

impl<T, G: Hash + Eq> Collector<G> for Grouped<T, G> {
    type Output = IndexMap<G, Vec<T>>;

    fn record(&mut self, index: usize, value: G) -> Flow {
        self.groups[index] = Some(value);
        Flow::Continue
    }

    fn finish(self) -> IndexMap<G, Vec<T>> {
        let mut grouped: IndexMap<G, Vec<T>> = IndexMap::new();
        for (item, group) in self.items.into_iter().zip(self.groups) {
            if let Some(group) = group {
                grouped.entry(group).or_default().push(item);
            }
        }
        grouped
    }
}

/// Orders items by the criterion their iteratee produced (`sort_by`), stable on ties.
#[derive(Debug)]
pub(crate) struct Sorted<T, C> {
    items: Vec<T>,
    criteria: Vec<Option<C>>,
}

impl<T, C> Sorted<T, C> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        let criteria = empty_slots(items.len());
        Self { items, criteria }
    }
}

impl<T, C: Ord> Collector<C> for Sorted<T, C> {
    type Output = Vec<T>;

    fn record(&mut self, index: usize, value: C) -> Flow {
        self.criteria[index] = Some(value);
        Flow::Continue
    }

    fn finish(self) -> Vec<T> {
        let mut ranked: Vec<(C, T)> = self
            .criteria
            .into_iter()
            .zip(self.items)
            .filter_map(|(criterion, item)| criterion.map(|c| (c, item)))
            .collect();
        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        ranked.into_iter().map(|(_, item)| item).collect()
    }
}

/// Takes the first value to settle (`race`).
#[derive(Debug)]
pub(crate) struct First<R> {
    winner: Option<R>,
}

impl<R> Default for First<R> {
    fn default() -> Self {
        Self { winner: None }
    }
}

impl<R> Collector<R> for First<R> {
    type Output = Option<R>;

    fn record(&mut self, _index: usize, value: R) -> Flow {
        self.winner = Some(value);
        Flow::Decided
    }

    fn finish(self) -> Option<R> {
        self.winner
    }
}
