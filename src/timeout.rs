//! Opt-in time limits.

use std::future::Future;
use std::time::Duration;

use futures::channel::oneshot;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::{Timeout, TimeoutError};
use crate::types::Spawner;

/// Resolve with `fut`'s outcome, or a [`Timeout`] error named `name` if it takes longer
/// than `limit`.
///
/// On timeout `fut` is dropped. Use [`timeout_detached`] to let it keep running.
/// Requires a tokio runtime with the timer enabled.
pub async fn timeout<F, R, E>(
    name: impl Into<String>,
    limit: Duration,
    fut: F,
) -> Result<R, TimeoutError<E>>
where
    F: Future<Output = Result<R, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(outcome) => outcome.map_err(TimeoutError::Inner),
        Err(_) => {
            let name = name.into();

            #[cfg(feature = "tracing")]
            debug!(%name, ?limit, "operation timed out");

            Err(TimeoutError::Elapsed(Timeout::new(name)))
        }
    }
}

/// Like [`timeout`], but `fut` runs on `spawner` and keeps running after the time
/// limit is hit. Its late outcome is discarded.
///
/// If the spawned operation is dropped before finishing (its executor shut down or it
/// panicked) the result is a [`Timeout`] whose [`info`](Timeout::info) says so.
pub async fn timeout_detached<F, R, E>(
    spawner: &Spawner,
    name: impl Into<String>,
    limit: Duration,
    fut: F,
) -> Result<R, TimeoutError<E>>
where
    F: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    spawner.spawn(Box::pin(async move {
        // The receiver is gone once the time limit was hit.
        let _ = tx.send(fut.await);
    }));

    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(outcome)) => outcome.map_err(TimeoutError::Inner),
        Ok(Err(oneshot::Canceled)) => Err(TimeoutError::Elapsed(
            Timeout::new(name).with_info("operation dropped before completing"),
        )),
        Err(_) => {
            let name = name.into();

            #[cfg(feature = "tracing")]
            debug!(%name, ?limit, "operation timed out, left running");

            Err(TimeoutError::Elapsed(Timeout::new(name)))
        }
    }
}
