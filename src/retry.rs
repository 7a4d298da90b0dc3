//! Retrying failed operations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

type IntervalFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;
type ErrorFilter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Wait between two attempts.
#[derive(Clone)]
pub enum Interval {
    /// The same wait after every failed attempt.
    Fixed(Duration),
    /// A wait computed from the number of attempts made so far, right before waiting.
    Computed(IntervalFn),
}

impl Interval {
    /// An interval computed by `f` from the 1-based number of the attempt that failed.
    ///
    /// ```
    /// use std::time::Duration;
    /// use flowx::Interval;
    ///
    /// let backoff = Interval::with(|attempt| Duration::from_millis(50 * 2u64.pow(attempt)));
    /// assert_eq!(backoff.after(1), Duration::from_millis(100));
    /// assert_eq!(backoff.after(3), Duration::from_millis(400));
    /// ```
    pub fn with(f: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        Interval::Computed(Arc::new(f))
    }

    /// The wait after `attempt` attempts have failed.
    pub fn after(&self, attempt: u32) -> Duration {
        match self {
            Interval::Fixed(wait) => *wait,
            Interval::Computed(f) => f(attempt),
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Fixed(Duration::ZERO)
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Fixed(wait) => f.debug_tuple("Fixed").field(wait).finish(),
            Interval::Computed(_) => f.write_str("Computed"),
        }
    }
}

impl From<Duration> for Interval {
    fn from(wait: Duration) -> Self {
        Interval::Fixed(wait)
    }
}

/// How [`retry`] repeats a failing operation.
///
/// Defaults to 5 attempts with no wait in between and every error retried.
pub struct RetryOptions<E> {
    times: u32,
    interval: Interval,
    error_filter: Option<ErrorFilter<E>>,
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self {
            times: 5,
            interval: Interval::default(),
            error_filter: None,
        }
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            times: self.times,
            interval: self.interval.clone(),
            error_filter: self.error_filter.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("times", &self.times)
            .field("interval", &self.interval)
            .field("error_filter", &self.error_filter.is_some())
            .finish()
    }
}

impl<E> RetryOptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of attempts. The operation always runs at least once.
    pub fn times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }

    pub fn interval(mut self, interval: impl Into<Interval>) -> Self {
        self.interval = interval.into();
        self
    }

    /// Only retry errors for which `filter` returns `true`; any other error is
    /// returned immediately.
    pub fn error_filter(mut self, filter: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.error_filter = Some(Arc::new(filter));
        self
    }

    fn should_retry(&self, attempt: u32, error: &E) -> bool {
        attempt < self.times && self.error_filter.as_ref().map_or(true, |filter| filter(error))
    }
}

/// Call `task` until it succeeds, up to `options.times` attempts.
///
/// Resolves with the first success, or the error of the last attempt made. Waiting
/// between attempts uses the tokio timer, so a non-zero interval needs a tokio runtime.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use flowx::{retry, RetryOptions};
///
/// # futures::executor::block_on(async {
/// let calls = &AtomicU32::new(0);
/// let result = retry(&RetryOptions::new().times(5), || async move {
///     match calls.fetch_add(1, Ordering::SeqCst) {
///         0 | 1 => Err("not yet"),
///         _ => Ok("done"),
///     }
/// })
/// .await;
///
/// assert_eq!(result, Ok("done"));
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # });
/// ```
pub async fn retry<R, E, F, Fut>(options: &RetryOptions<E>, mut task: F) -> Result<R, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut attempt = 1;
    loop {
        let error = match task().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !options.should_retry(attempt, &error) {
            return Err(error);
        }

        let wait = options.interval.after(attempt);

        #[cfg(feature = "tracing")]
        debug!(attempt, times = options.times, ?wait, "attempt failed, retrying");

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        attempt += 1;
    }
}

/// A function whose every call is retried with the same options.
///
/// ```
/// use flowx::{Retryable, RetryOptions};
///
/// # futures::executor::block_on(async {
/// let parse = Retryable::new(RetryOptions::new().times(2), |s: &str| {
///     let parsed = s.parse::<u8>();
///     async move { parsed }
/// });
/// assert_eq!(parse.call("7").await, Ok(7));
/// assert!(parse.call("x").await.is_err());
/// # });
/// ```
pub struct Retryable<F, E> {
    f: F,
    options: RetryOptions<E>,
}

impl<F, E> Retryable<F, E> {
    pub fn new(options: RetryOptions<E>, f: F) -> Self {
        Self { f, options }
    }

    /// Call the wrapped function with `input`, retrying on failure.
    pub async fn call<A, R, Fut>(&self, input: A) -> Result<R, E>
    where
        A: Clone,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        retry(&self.options, || (self.f)(input.clone())).await
    }
}

impl<F, E> fmt::Debug for Retryable<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retryable")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Wrap `f` so every call is retried according to `options`.
pub fn retryable<F, E>(options: RetryOptions<E>, f: F) -> Retryable<F, E> {
    Retryable::new(options, f)
}
