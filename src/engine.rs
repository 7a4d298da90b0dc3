//! Concurrency-limited iteration engine.
//!
//! Every collection combinator is a projection over [`drive`]: it admits keys in order
//! into a bounded set of in-flight slots, replenishes a slot as soon as one frees, and
//! stops admitting on the first error or on a decisive result reported by the
//! [`Collector`].
//!
//! The scheduler is an explicit loop rather than recursive continuations:
//!
//! 1. admit keys while [`Admission::admit`] grants a slot
//! 2. wait for the next in-flight slot to settle
//! 3. release its slot and route the outcome to the collector
//!
//! Admission and replenishment happen between two polls of the in-flight set, so no
//! other completion can interleave between a slot freeing and the next key being
//! chosen. This is what makes admission order equal key order.
//!
//! A panicking iteratee is a terminal outcome too. Admission halts, the leftover slots
//! are settled like after an error, and the panic is then resumed on the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::future::{BoxFuture, CatchUnwind};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::collect::{Collector, Flow};
use crate::types::{Limit, Spawner};

/// One in-flight operation, tagged with the position of its key.
pub(crate) type Slot<'a, R, E> = BoxFuture<'a, (usize, Result<R, E>)>;

/// A slot that reports a panic as its output instead of unwinding through the engine.
pub(crate) type Guarded<'a, R, E> = CatchUnwind<AssertUnwindSafe<Slot<'a, R, E>>>;

/// The set of in-flight slots left behind when a terminal outcome is decided early.
pub(crate) type InFlight<'a, R, E> = FuturesUnordered<Guarded<'a, R, E>>;

/// Payload of a caught panic.
pub(crate) type Panic = Box<dyn Any + Send + 'static>;

/// Slot accounting for one combinator call.
///
/// Tracks the next key to admit, the number of occupied slots and whether admission
/// has been halted by a terminal outcome. Keeps the admission invariant checkable on
/// its own: `running` never exceeds the limit and nothing is admitted after `halt`.
#[derive(Debug)]
pub(crate) struct Admission {
    next: usize,
    len: usize,
    running: usize,
    limit: Limit,
    halted: bool,
}

impl Admission {
    pub(crate) fn new(len: usize, limit: Limit) -> Self {
        Self {
            next: 0,
            len,
            running: 0,
            limit,
            halted: false,
        }
    }

    /// Claim a slot for the next key, if one is free and admission is still open.
    pub(crate) fn admit(&mut self) -> Option<usize> {
        if self.halted || self.next >= self.len || !self.limit.admits(self.running) {
            return None;
        }
        let index = self.next;
        self.next += 1;
        self.running += 1;
        Some(index)
    }

    pub(crate) fn release(&mut self) {
        debug_assert!(self.running > 0, "released a slot that was never admitted");
        self.running -= 1;
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) fn running(&self) -> usize {
        self.running
    }

    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) fn admitted(&self) -> usize {
        self.next
    }

    #[cfg(test)]
    pub(crate) fn is_halted(&self) -> bool {
        self.halted
    }
}

/// Terminal outcome of [`drive`] plus the slots still running when it was decided.
///
/// `panic` holds the payload of an iteratee that panicked; `outcome` is then only the
/// partial result and must not be handed to the caller.
pub(crate) struct Settled<'a, O, R, E> {
    pub(crate) outcome: Result<O, E>,
    pub(crate) in_flight: InFlight<'a, R, E>,
    pub(crate) panic: Option<Panic>,
}

/// Run `len` keys from `source` through `invoke` with at most `limit` in flight.
///
/// `invoke` receives the key position and the item and returns the slot future. The
/// outcome is decided by the first error (fail-fast), the first panic, the first
/// [`Flow::Decided`] from the collector, or exhaustion of the keys. Slots that are still
/// running when an early outcome is decided are returned untouched in
/// [`Settled::in_flight`]; they are never dropped here.
pub(crate) async fn drive<'a, X, R, E, C, I, F>(
    source: I,
    limit: Limit,
    mut invoke: F,
    mut collector: C,
) -> Settled<'a, C::Output, R, E>
where
    I: IntoIterator<Item = X>,
    I::IntoIter: ExactSizeIterator,
    F: FnMut(usize, X) -> Slot<'a, R, E>,
    C: Collector<R>,
{
    let mut source = source.into_iter();
    let mut admission = Admission::new(source.len(), limit);
    let mut in_flight: InFlight<'a, R, E> = FuturesUnordered::new();

    #[cfg(feature = "tracing")]
    debug!(keys = source.len(), %limit, "starting limited iteration");

    loop {
        while let Some(index) = admission.admit() {
            let Some(item) = source.next() else {
                admission.halt();
                break;
            };

            #[cfg(feature = "tracing")]
            trace!(index, running = admission.running(), "admitting key");

            // The iteratee is called here, at admission, and may panic before it
            // produces a future.
            match panic::catch_unwind(AssertUnwindSafe(|| invoke(index, item))) {
                Ok(slot) => in_flight.push(AssertUnwindSafe(slot).catch_unwind()),
                Err(payload) => {
                    admission.release();
                    admission.halt();
                    return panicked(admission.admitted(), payload, collector, in_flight);
                }
            }
        }

        let Some(settled) = in_flight.next().await else {
            break;
        };
        admission.release();

        let (index, result) = match settled {
            Ok(slot) => slot,
            Err(payload) => {
                admission.halt();
                return panicked(admission.admitted(), payload, collector, in_flight);
            }
        };

        match result {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                trace!(index, "slot settled");

                if let Flow::Decided = collector.record(index, value) {
                    admission.halt();

                    #[cfg(feature = "tracing")]
                    debug!(
                        index,
                        in_flight = in_flight.len(),
                        "decisive result, admission halted"
                    );

                    return Settled {
                        outcome: Ok(collector.finish()),
                        in_flight,
                        panic: None,
                    };
                }
            }
            Err(error) => {
                admission.halt();

                #[cfg(feature = "tracing")]
                tracing::error!(
                    index,
                    admitted = admission.admitted(),
                    in_flight = in_flight.len(),
                    "iteratee failed, admission halted"
                );

                return Settled {
                    outcome: Err(error),
                    in_flight,
                    panic: None,
                };
            }
        }
    }

    #[cfg(feature = "tracing")]
    debug!(admitted = admission.admitted(), "limited iteration complete");

    Settled {
        outcome: Ok(collector.finish()),
        in_flight,
        panic: None,
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn panicked<'a, R, E, C>(
    admitted: usize,
    payload: Panic,
    collector: C,
    in_flight: InFlight<'a, R, E>,
) -> Settled<'a, C::Output, R, E>
where
    C: Collector<R>,
{
    #[cfg(feature = "tracing")]
    tracing::error!(
        admitted,
        in_flight = in_flight.len(),
        "iteratee panicked, admission halted"
    );

    Settled {
        outcome: Ok(collector.finish()),
        in_flight,
        panic: Some(payload),
    }
}

/// What happens to in-flight slots once a terminal outcome has been decided.
///
/// Implemented by [`Drain`] and [`Detach`]; not meant to be implemented outside this
/// crate.
pub trait Settle<'a, R, E>: Send {
    #[doc(hidden)]
    fn settle(self, in_flight: InFlight<'a, R, E>) -> BoxFuture<'a, ()>;
}

/// Poll leftover slots to completion in place before returning the outcome.
///
/// This is the default policy. In-flight work always runs to completion; its outcomes
/// are observed and discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Drain;

impl<'a, R: 'a, E: 'a> Settle<'a, R, E> for Drain {
    fn settle(self, mut in_flight: InFlight<'a, R, E>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            #[cfg(feature = "tracing")]
            if !in_flight.is_empty() {
                debug!(in_flight = in_flight.len(), "draining in-flight slots");
            }

            while in_flight.next().await.is_some() {}
        })
    }
}

/// Return the outcome immediately and hand leftover slots to a [`Spawner`].
///
/// Only available for `'static` iteratee futures, since the leftovers outlive the
/// combinator call.
#[derive(Debug, Clone)]
pub struct Detach {
    spawner: Spawner,
}

impl Detach {
    pub(crate) fn new(spawner: Spawner) -> Self {
        Self { spawner }
    }
}

impl<R: Send + 'static, E: Send + 'static> Settle<'static, R, E> for Detach {
    fn settle(self, mut in_flight: InFlight<'static, R, E>) -> BoxFuture<'static, ()> {
        if !in_flight.is_empty() {
            #[cfg(feature = "tracing")]
            debug!(in_flight = in_flight.len(), "detaching in-flight slots");

            self.spawner
                .spawn(Box::pin(async move { while in_flight.next().await.is_some() {} }));
        }
        Box::pin(futures::future::ready(()))
    }
}

/// Drive a collection to completion and apply the settle policy.
///
/// A panic caught from an iteratee is resumed once the leftover slots are settled.
pub(crate) async fn run<'a, X, R, E, C, I, F, S>(
    source: I,
    limit: Limit,
    invoke: F,
    collector: C,
    settle: S,
) -> Result<C::Output, E>
where
    I: IntoIterator<Item = X>,
    I::IntoIter: ExactSizeIterator,
    F: FnMut(usize, X) -> Slot<'a, R, E>,
    C: Collector<R>,
    S: Settle<'a, R, E>,
{
    let Settled {
        outcome,
        in_flight,
        panic: caught,
    } = drive(source, limit, invoke, collector).await;
    settle.settle(in_flight).await;
    if let Some(payload) = caught {
        panic::resume_unwind(payload);
    }
    outcome
}
