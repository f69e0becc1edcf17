//! Bounded-concurrency task runner shared by the listing and execution stages.
//!
//! A semaphore gates a single admission loop that walks the input list in
//! order. Each admitted item is spawned as its own task holding one permit
//! for its whole lifetime, so at most `concurrency` tasks are in flight and
//! the next item is admitted only when a permit comes back.
//!
//! The runner watches completions while it is still admitting. The first
//! failure is returned to the caller straight away, but tasks that were
//! already admitted are never aborted: they keep running on the runtime and
//! their side effects still land. Items that were not admitted yet are never
//! started.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, mpsc};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Highest accepted concurrency ceiling.
const MAX_CONCURRENCY_UPPER_BOUND: usize = 64;

/// Lowest accepted concurrency ceiling; zero is treated as one.
const MAX_CONCURRENCY_LOWER_BOUND: usize = 1;

/// Clamps a caller-supplied ceiling to the accepted range.
#[must_use]
pub const fn clamp_concurrency(concurrency: usize) -> usize {
    if concurrency < MAX_CONCURRENCY_LOWER_BOUND {
        MAX_CONCURRENCY_LOWER_BOUND
    } else if concurrency > MAX_CONCURRENCY_UPPER_BOUND {
        MAX_CONCURRENCY_UPPER_BOUND
    } else {
        concurrency
    }
}

type BeginHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type EndHook<T, R> = Arc<dyn Fn(&T, &R, Duration) + Send + Sync>;
type Settled<R> = (usize, SyncResult<R>);

/// Runs a fixed list of async tasks with at most `concurrency` in flight.
///
/// ```ignore
/// let runner = TaskRunner::new(4).on_end(|key: &String, _: &u64, elapsed| {
///     println!("{key} took {elapsed:?}");
/// });
/// let sizes = runner.run(keys, |key| async move { fetch_size(&key).await }).await?;
/// ```
pub struct TaskRunner<T, R> {
    concurrency: usize,
    on_begin: Option<BeginHook<T>>,
    on_end: Option<EndHook<T, R>>,
}

impl<T, R> TaskRunner<T, R>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
{
    /// Creates a runner with the given ceiling, clamped to `[1, 64]`.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: clamp_concurrency(concurrency),
            on_begin: None,
            on_end: None,
        }
    }

    /// Effective concurrency ceiling.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Sets the callback fired when a task is admitted, before it starts.
    #[must_use]
    pub fn on_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_begin = Some(Arc::new(hook));
        self
    }

    /// Sets the callback fired when a task succeeds, with its elapsed time.
    ///
    /// The callback runs before the task gives back its permit, so with a
    /// ceiling of one it always precedes the next task's `begin`.
    #[must_use]
    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T, &R, Duration) + Send + Sync + 'static,
    {
        self.on_end = Some(Arc::new(hook));
        self
    }

    /// Runs `task` over every item and returns the results in item order.
    ///
    /// Fails with [`SyncError::NothingToDo`] when `items` is empty, and with
    /// the first task error observed otherwise.
    pub async fn run<F, Fut>(&self, items: Vec<T>, task: F) -> SyncResult<Vec<R>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = SyncResult<R>> + Send + 'static,
    {
        if items.is_empty() {
            return Err(SyncError::NothingToDo);
        }

        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel::<Settled<R>>();
        let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();

        for (index, item) in items.into_iter().enumerate() {
            let permit = loop {
                tokio::select! {
                    biased;
                    Some((done, result)) = rx.recv() => {
                        results[done] = Some(result?);
                    }
                    permit = Arc::clone(&semaphore).acquire_owned() => {
                        break permit.map_err(|error| SyncError::Runtime(error.to_string()))?;
                    }
                }
            };

            debug!(target: "treesync::run", index, total, "task admitted");
            if let Some(hook) = &self.on_begin {
                hook(&item);
            }
            let started = Instant::now();
            let future = task(item.clone());
            let on_end = self.on_end.clone();
            let settle = Settle::new(index, tx.clone());

            // Detached: the handle is dropped, never aborted.
            tokio::spawn(async move {
                let _permit = permit;
                let settle = settle;
                let result = future.await;
                if let (Ok(value), Some(hook)) = (&result, &on_end) {
                    hook(&item, value, started.elapsed());
                }
                settle.send(result);
            });
        }

        drop(tx);
        while let Some((done, result)) = rx.recv().await {
            results[done] = Some(result?);
        }
        debug!(target: "treesync::run", total, "all tasks settled");

        results
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or_else(|| SyncError::Runtime("task result lost".to_owned()))
    }
}

impl<T, R> fmt::Debug for TaskRunner<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("concurrency", &self.concurrency)
            .field("on_begin", &self.on_begin.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

/// Reports a task's result exactly once, even if the task panics.
struct Settle<R> {
    index: usize,
    tx: Option<mpsc::UnboundedSender<Settled<R>>>,
}

impl<R> Settle<R> {
    const fn new(index: usize, tx: mpsc::UnboundedSender<Settled<R>>) -> Self {
        Self {
            index,
            tx: Some(tx),
        }
    }

    fn send(mut self, result: SyncResult<R>) {
        if let Some(tx) = self.tx.take() {
            // The runner may already have returned on an earlier failure.
            let _ = tx.send((self.index, result));
        }
    }
}

impl<R> Drop for Settle<R> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send((
                self.index,
                Err(SyncError::Runtime(format!("task {} panicked", self.index))),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn concurrency_is_clamped() {
        assert_eq!(clamp_concurrency(0), 1);
        assert_eq!(clamp_concurrency(1), 1);
        assert_eq!(clamp_concurrency(8), 8);
        assert_eq!(clamp_concurrency(10_000), MAX_CONCURRENCY_UPPER_BOUND);
        assert_eq!(TaskRunner::<u32, u32>::new(0).concurrency(), 1);
    }

    #[tokio::test]
    async fn empty_list_is_nothing_to_do() {
        let runner = TaskRunner::<u32, u32>::new(4);
        let error = runner
            .run(Vec::new(), |n| async move { Ok(n) })
            .await
            .expect_err("empty input");
        assert!(error.is_nothing_to_do());
    }

    #[tokio::test]
    async fn results_come_back_in_item_order() {
        let runner = TaskRunner::new(3);
        let results = runner
            .run(vec![30_u64, 10, 20, 0], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(delay * 2)
            })
            .await
            .expect("run");
        assert_eq!(results, vec![60, 20, 40, 0]);
    }

    #[tokio::test]
    async fn begin_fires_in_admission_order() {
        let begun = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&begun);
        let runner = TaskRunner::new(2).on_begin(move |n: &u64| {
            log.lock().expect("lock").push(*n);
        });
        runner
            .run(vec![40, 5, 20, 1, 3], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(())
            })
            .await
            .expect("run");
        assert_eq!(*begun.lock().expect("lock"), vec![40, 5, 20, 1, 3]);
    }

    #[tokio::test]
    async fn failed_task_has_no_end_callback() {
        let ended = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ended);
        let runner = TaskRunner::new(1).on_end(move |_: &u32, _: &(), _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let error = runner
            .run(vec![1, 2, 3], |n| async move {
                if n == 2 {
                    Err(SyncError::RootMissing)
                } else {
                    Ok(())
                }
            })
            .await
            .expect_err("second task fails");
        assert!(matches!(error, SyncError::RootMissing));
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_task_is_reported_as_error() {
        let runner = TaskRunner::new(2);
        let error = runner
            .run(vec![1_u32, 2], |n| async move {
                assert_ne!(n, 2, "boom");
                Ok(n)
            })
            .await
            .expect_err("panic surfaces");
        assert!(matches!(error, SyncError::Runtime(ref message) if message.contains("panicked")));
    }
}
