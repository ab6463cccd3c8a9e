//! Bounded worker pool: concurrency-limited parallel execution preserving
//! input order.
//!
//! Used for batch job fan-out and per-page rasterization. The window is
//! sliding: as each worker finishes, the next queued item starts
//! immediately, rather than running in batched rounds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Outcome of a single pooled worker.
enum WorkerOutcome<T> {
    Done(T),
    /// The worker was never started because an earlier worker had already
    /// failed by the time a slot opened up.
    Skipped,
}

/// Run `worker` over `items` with at most `limit` invocations in flight.
///
/// Results are returned in input order regardless of completion order. The
/// pool fails fast: the first worker error fails the whole call. Workers
/// already in flight at that point are not interrupted; they run to
/// completion on detached tasks and their results are discarded. Workers
/// that have not yet started are skipped.
///
/// A `limit` of 0 is treated as 1.
pub async fn run_bounded<I, T, F, Fut>(items: Vec<I>, limit: usize, worker: F) -> Result<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let limit = limit.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let failed = Arc::new(AtomicBool::new(false));
    let worker = Arc::new(worker);

    let mut handles = Vec::with_capacity(total);
    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let failed = Arc::clone(&failed);
        let worker = Arc::clone(&worker);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("pool semaphore closed");

            if failed.load(Ordering::SeqCst) {
                return Ok(WorkerOutcome::Skipped);
            }

            let result = worker(item).await;
            if result.is_err() {
                failed.store(true, Ordering::SeqCst);
            }
            result.map(WorkerOutcome::Done)
        }));
    }

    // Join handles as they finish so the first failure surfaces without
    // waiting for slower siblings. Detached tasks keep running after an
    // early return; only their results are lost.
    let mut pending = FuturesUnordered::new();
    for (index, handle) in handles.into_iter().enumerate() {
        pending.push(async move { (index, handle.await) });
    }

    let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
    while let Some((index, joined)) = pending.next().await {
        match joined {
            Ok(Ok(WorkerOutcome::Done(value))) => results[index] = Some(value),
            // A skipped slot implies some worker failed; its error is still
            // in flight and will end the loop when it arrives.
            Ok(Ok(WorkerOutcome::Skipped)) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(Error::internal(format!("pool worker panicked: {e}"))),
        }
    }

    results
        .into_iter()
        .map(|slot| slot.ok_or_else(|| Error::internal("pool worker produced no result")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn results_preserve_input_order() {
        // Later items finish first; the result array must still line up
        // with the input array.
        let results = run_bounded(vec![1u64, 2, 3, 4, 5], 5, |n| async move {
            tokio::time::sleep(Duration::from_millis(60 - n * 10)).await;
            Ok(n * 10)
        })
        .await
        .unwrap();

        assert_eq!(results, vec![10, 20, 30, 40, 50]);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_limit() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&current);
        let p = Arc::clone(&peak);
        run_bounded(vec![(); 8], 2, move |_| {
            let current = Arc::clone(&c);
            let peak = Arc::clone(&p);
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2, "limit exceeded");
        assert!(peak.load(Ordering::SeqCst) >= 2, "pool never ran concurrently");
    }

    #[tokio::test]
    async fn first_failure_fails_the_pool() {
        let result = run_bounded(vec![1, 2, 3, 4], 2, |n| async move {
            if n == 2 {
                Err(Error::engine("test", "boom"))
            } else {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(n)
            }
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Engine { .. }), "unexpected: {err}");
    }

    #[tokio::test]
    async fn unstarted_workers_are_skipped_after_failure() {
        let started = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&started);
        let result = run_bounded((0..32).collect(), 1, move |n: i32| {
            let started = Arc::clone(&s);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(Error::engine("test", "early failure"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert!(result.is_err());
        // With limit 1, the failing first worker should prevent most of the
        // remaining 31 from ever starting.
        assert!(started.load(Ordering::SeqCst) < 32);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let results: Vec<i32> = run_bounded(Vec::<i32>::new(), 4, |n| async move { Ok(n) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_is_clamped() {
        let results = run_bounded(vec![7], 0, |n| async move { Ok(n) })
            .await
            .unwrap();
        assert_eq!(results, vec![7]);
    }
}
