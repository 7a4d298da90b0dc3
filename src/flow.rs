//! Sequential composition.
//!
//! Single-threaded chains: each step starts only after the previous one resolved, and
//! the first error ends the chain.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

#[cfg(feature = "tracing")]
use tracing::trace;

/// One step of a [`waterfall`]: receives the previous step's output (`None` for the
/// first step).
pub type Step<'a, T, E> = Box<dyn FnOnce(Option<T>) -> BoxFuture<'a, Result<T, E>> + Send + 'a>;

/// A reusable unary async function, the unit of [`seq`] and [`compose`].
pub type Unary<'a, T, E> = Box<dyn Fn(T) -> BoxFuture<'a, Result<T, E>> + Send + Sync + 'a>;

/// Box an async closure as a [`Step`].
pub fn step<'a, T, E, F, Fut>(f: F) -> Step<'a, T, E>
where
    F: FnOnce(Option<T>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<T, E>> + Send + 'a,
{
    Box::new(move |input| f(input).boxed())
}

/// Box an async closure as a [`Unary`].
pub fn unary<'a, T, E, F, Fut>(f: F) -> Unary<'a, T, E>
where
    F: Fn(T) -> Fut + Send + Sync + 'a,
    Fut: Future<Output = Result<T, E>> + Send + 'a,
{
    Box::new(move |input| f(input).boxed())
}

/// Run `steps` in order, threading each output into the next step.
///
/// Resolves with the last step's output, or `None` for an empty list without calling
/// anything.
///
/// # Examples
///
/// ```
/// use flowx::{step, waterfall};
///
/// # futures::executor::block_on(async {
/// let total = waterfall(vec![
///     step(|_| async { Ok::<_, ()>(1) }),
///     step(|prev: Option<i32>| async move { Ok(prev.unwrap_or(0) + 10) }),
/// ])
/// .await;
///
/// assert_eq!(total, Ok(Some(11)));
/// # });
/// ```
pub async fn waterfall<'a, T, E>(steps: Vec<Step<'a, T, E>>) -> Result<Option<T>, E> {
    let mut carried = None;
    for (_index, step) in steps.into_iter().enumerate() {
        #[cfg(feature = "tracing")]
        trace!(step = _index, "waterfall step");

        carried = Some(step(carried).await?);
    }
    Ok(carried)
}

/// Compose `fns` left to right: the result calls each function on the previous
/// function's output.
///
/// An empty list composes to the identity.
pub fn seq<'a, T, E>(fns: Vec<Unary<'a, T, E>>) -> impl Fn(T) -> BoxFuture<'a, Result<T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
{
    let fns = Arc::new(fns);
    move |input| {
        let fns = Arc::clone(&fns);
        async move {
            let mut value = input;
            for f in fns.iter() {
                value = f(value).await?;
            }
            Ok(value)
        }
        .boxed()
    }
}

/// Compose `fns` right to left: `compose(vec![f, g])(x)` is `f(g(x))`.
pub fn compose<'a, T, E>(mut fns: Vec<Unary<'a, T, E>>) -> impl Fn(T) -> BoxFuture<'a, Result<T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
{
    fns.reverse();
    seq(fns)
}

/// Call `body` while `test` holds, checking before every call.
///
/// Resolves with the last body output, or `None` if `test` failed up front.
pub async fn whilst<R, E, P, F, Fut>(mut test: P, mut body: F) -> Result<Option<R>, E>
where
    P: FnMut() -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut last = None;
    while test() {
        last = Some(body().await?);
    }
    Ok(last)
}

/// Call `body` once, then again while `test` holds for its latest output.
pub async fn do_whilst<R, E, P, F, Fut>(mut body: F, mut test: P) -> Result<R, E>
where
    P: FnMut(&R) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    loop {
        let output = body().await?;
        if !test(&output) {
            return Ok(output);
        }
    }
}

/// Call `body` until `test` holds, checking before every call.
pub async fn until<R, E, P, F, Fut>(mut test: P, body: F) -> Result<Option<R>, E>
where
    P: FnMut() -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    whilst(move || !test(), body).await
}

/// Call `body` once, then again until `test` holds for its latest output.
pub async fn do_until<R, E, P, F, Fut>(body: F, mut test: P) -> Result<R, E>
where
    P: FnMut(&R) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    do_whilst(body, move |output| !test(output)).await
}

/// Like [`whilst`], with an async predicate. A predicate error ends the loop.
pub async fn during<R, E, P, PFut, F, Fut>(mut test: P, mut body: F) -> Result<Option<R>, E>
where
    P: FnMut() -> PFut,
    PFut: Future<Output = Result<bool, E>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut last = None;
    while test().await? {
        last = Some(body().await?);
    }
    Ok(last)
}

/// Like [`do_whilst`], with an async predicate over the latest body output.
pub async fn do_during<R, E, P, PFut, F, Fut>(mut body: F, mut test: P) -> Result<R, E>
where
    P: FnMut(&R) -> PFut,
    PFut: Future<Output = Result<bool, E>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    loop {
        let output = body().await?;
        if !test(&output).await? {
            return Ok(output);
        }
    }
}

/// Call `body` over and over until it fails, resolving with the error.
pub async fn forever<E, F, Fut>(mut body: F) -> E
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    loop {
        if let Err(error) = body().await {
            return error;
        }
    }
}

/// Try `tasks` in order until one succeeds.
///
/// Resolves with the first success, the last error if every task fails, or `None` for
/// an empty list.
pub async fn try_each<I, Task, R, E, Fut>(tasks: I) -> Result<Option<R>, E>
where
    I: IntoIterator<Item = Task>,
    Task: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut last_error = None;
    for task in tasks {
        match task().await {
            Ok(value) => return Ok(Some(value)),
            Err(error) => last_error = Some(error),
        }
    }
    match last_error {
        Some(error) => Err(error),
        None => Ok(None),
    }
}
