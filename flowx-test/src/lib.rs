//! Helpers for internal use in flowx tests and benchmarks.
//!
//! This crate is not meant for public use and offers no stability guarantees.

#![cfg(not(tarpaulin_include))]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flowx::Spawner;
use parking_lot::Mutex;

/// Shared, append-only log of events observed by concurrently running operations.
#[derive(Debug)]
pub struct Recorder<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: T) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<T> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Tracks how many operations are in flight and the highest count seen.
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one operation as started; it counts as finished when the guard drops.
    pub fn enter(&self) -> GaugeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard {
            current: Arc::clone(&self.current),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct GaugeGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resolve with `value` after `ms` milliseconds of tokio time.
pub fn delayed<T>(ms: u64, value: T) -> impl Future<Output = T> {
    async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        value
    }
}

/// Spawner handing futures to the ambient tokio runtime.
pub fn tokio_spawner() -> Spawner {
    Spawner::new(|fut| {
        tokio::spawn(fut);
    })
}
