//! Operation execution stage.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::error::SyncResult;
use crate::operation::Operation;
use crate::runner::TaskRunner;

/// Outcome of one executed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    /// Wall time spent in the operation's job.
    pub duration: Duration,
}

type OperationHook = Arc<dyn Fn(&Operation) + Send + Sync>;
type OperationEndHook = Arc<dyn Fn(&Operation, &OperationResult) + Send + Sync>;

/// Options for [`run_operations`].
#[derive(Clone)]
pub struct RunOptions {
    concurrency: usize,
    on_begin: Option<OperationHook>,
    on_end: Option<OperationEndHook>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RunOptions {
    /// Serial execution without callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            concurrency: 1,
            on_begin: None,
            on_end: None,
        }
    }

    /// Maximum number of jobs in flight.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Callback fired before an operation's job starts.
    #[must_use]
    pub fn on_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Operation) + Send + Sync + 'static,
    {
        self.on_begin = Some(Arc::new(hook));
        self
    }

    /// Callback fired after an operation's job succeeds.
    #[must_use]
    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Operation, &OperationResult) + Send + Sync + 'static,
    {
        self.on_end = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Executes every operation's job, returning one result per operation in input order.
///
/// Fails with [`SyncError::NothingToDo`](crate::SyncError::NothingToDo) for an
/// empty list, or with the first job error. Jobs already running when a
/// failure is observed are not cancelled.
pub async fn run_operations(
    operations: Vec<Operation>,
    options: &RunOptions,
) -> SyncResult<Vec<OperationResult>> {
    let total = operations.len();
    let mut runner = TaskRunner::<Operation, OperationResult>::new(options.concurrency);
    if let Some(hook) = options.on_begin.clone() {
        runner = runner.on_begin(move |operation| hook(operation));
    }
    if let Some(hook) = options.on_end.clone() {
        runner = runner.on_end(move |operation, result, _| hook(operation, result));
    }

    let started = Instant::now();
    let results = runner
        .run(operations, |operation| async move {
            let started = Instant::now();
            operation.execute().await?;
            Ok(OperationResult {
                duration: started.elapsed(),
            })
        })
        .await?;
    info!(
        target: "treesync::run",
        operations = total,
        elapsed = ?started.elapsed(),
        "operations complete"
    );
    Ok(results)
}
