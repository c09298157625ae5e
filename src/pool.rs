//! Fixed-size worker pool for independent async jobs.

use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Run `job` for every item with at most `workers` jobs in flight.
///
/// Every item is spawned immediately and waits on the semaphore for its
/// turn. `results[i]` always belongs to `items[i]`, whatever the completion
/// order. A panicking job yields `Err(JoinError)` in its own slot only.
pub async fn map_bounded<T, R, F, Fut>(items: Vec<T>, workers: usize, job: F) -> Vec<Result<R, JoinError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));

    let tasks: Vec<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = Arc::clone(&semaphore);
            let fut = job(item);
            tokio::spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire().await.ok();
                fut.await
            })
        })
        .collect();

    join_all(tasks).await
}
