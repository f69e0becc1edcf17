//! Synchronization planner: the diff between an origin and a target provider.
//!
//! Planning is a straight pipeline with no retries:
//!
//! 1. List origin and target through [`list_entries`].
//! 2. Reconcile every origin entry against the target listing on a
//!    [`TaskRunner`] bounded by `compare_concurrency`. A matched target key is
//!    removed from the target listing, so whatever is left afterwards is an
//!    orphan.
//! 3. When `delete_orphans` is set, build one delete per orphan on the same
//!    ceiling.
//!
//! Operations are returned in the order their tasks completed, not in origin
//! listing order. Callers that need a stable order sort downstream.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, trace};

use crate::compare::Compare;
use crate::entry::{Entry, EntryMap};
use crate::error::{SyncError, SyncResult};
use crate::listing::{ListOptions, list_entries};
use crate::operation::{Operation, OperationKind, Reason, SkipEvent, SkipHook};
use crate::provider::{EntryHook, Provider};
use crate::runner::TaskRunner;

/// Side-channel callbacks for [`SyncPlanner::plan`].
#[derive(Clone, Default)]
pub struct PlanOptions {
    on_ignore: Option<EntryHook>,
    on_skip: Option<SkipHook>,
}

impl PlanOptions {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every entry either provider excludes while listing.
    #[must_use]
    pub fn on_ignore<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<Entry>) + Send + Sync + 'static,
    {
        self.on_ignore = Some(Arc::new(hook));
        self
    }

    /// Called for every origin entry that produces no operation.
    #[must_use]
    pub fn on_skip<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SkipEvent) + Send + Sync + 'static,
    {
        self.on_skip = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for PlanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanOptions")
            .field("on_ignore", &self.on_ignore.is_some())
            .field("on_skip", &self.on_skip.is_some())
            .finish()
    }
}

/// Plans the operations that mirror `origin` onto `target`.
///
/// # Example
///
/// ```ignore
/// let planner = SyncPlanner::new(origin, target)
///     .delete_orphans(true)
///     .compare_concurrency(8);
/// let operations = planner.plan(&PlanOptions::new()).await?;
/// ```
#[derive(Clone)]
pub struct SyncPlanner {
    origin: Arc<dyn Provider>,
    target: Arc<dyn Provider>,
    add_missing: bool,
    delete_orphans: bool,
    compare: Compare,
    compare_concurrency: usize,
    list_concurrency: usize,
}

impl SyncPlanner {
    /// Creates a planner with default policy: add missing entries, keep
    /// orphans, compare content hashes, everything serial.
    pub fn new(origin: Arc<dyn Provider>, target: Arc<dyn Provider>) -> Self {
        Self {
            origin,
            target,
            add_missing: true,
            delete_orphans: false,
            compare: Compare::default(),
            compare_concurrency: 1,
            list_concurrency: 1,
        }
    }

    /// Upload origin entries that have no target counterpart.
    #[must_use]
    pub const fn add_missing(mut self, add_missing: bool) -> Self {
        self.add_missing = add_missing;
        self
    }

    /// Delete target entries that have no origin counterpart.
    #[must_use]
    pub const fn delete_orphans(mut self, delete_orphans: bool) -> Self {
        self.delete_orphans = delete_orphans;
        self
    }

    /// Change-detection policy for matched pairs.
    #[must_use]
    pub fn compare(mut self, compare: Compare) -> Self {
        self.compare = compare;
        self
    }

    /// Ceiling for concurrent reconciliation (and orphan) tasks.
    #[must_use]
    pub const fn compare_concurrency(mut self, concurrency: usize) -> Self {
        self.compare_concurrency = concurrency;
        self
    }

    /// Ceiling for concurrent listing requests.
    #[must_use]
    pub const fn list_concurrency(mut self, concurrency: usize) -> Self {
        self.list_concurrency = concurrency;
        self
    }

    /// Origin provider.
    #[must_use]
    pub fn origin(&self) -> &Arc<dyn Provider> {
        &self.origin
    }

    /// Target provider.
    #[must_use]
    pub fn target(&self) -> &Arc<dyn Provider> {
        &self.target
    }

    /// Lists both sides and returns the operations needed to mirror them.
    ///
    /// Provider errors, including [`SyncError::MissingHash`] from the default
    /// comparator, are returned unchanged.
    pub async fn plan(&self, options: &PlanOptions) -> SyncResult<Vec<Operation>> {
        let listing = ListOptions::new()
            .concurrency(self.list_concurrency)
            .on_ignore(options.on_ignore.clone());
        let providers = [Arc::clone(&self.origin), Arc::clone(&self.target)];
        let mut listed = list_entries(&providers, &listing).await?.into_iter();
        let (Some(origin_list), Some(target_list)) = (listed.next(), listed.next()) else {
            return Err(SyncError::Runtime(
                "listing returned fewer results than providers".to_owned(),
            ));
        };

        let reconciler = Arc::new(Reconciler {
            origin_protocol: self.origin.protocol().to_owned(),
            target: Arc::clone(&self.target),
            add_missing: self.add_missing,
            compare: self.compare.clone(),
            on_skip: options.on_skip.clone(),
            remaining: Mutex::new(target_list.entries),
            operations: Mutex::new(Vec::new()),
        });
        let runner = TaskRunner::<Arc<Entry>, ()>::new(self.compare_concurrency);

        let origin_entries = origin_list.entries.into_entries();
        if !origin_entries.is_empty() {
            runner
                .run(origin_entries, |entry| {
                    let reconciler = Arc::clone(&reconciler);
                    async move { reconciler.reconcile(entry).await }
                })
                .await?;
        }

        let orphans = reconciler.take_remaining();
        if self.delete_orphans && !orphans.is_empty() {
            runner
                .run(orphans.into_entries(), |entry| {
                    let reconciler = Arc::clone(&reconciler);
                    async move { reconciler.delete(entry).await }
                })
                .await?;
        }

        let operations = reconciler.take_operations();
        info!(
            target: "treesync::plan",
            origin = self.origin.root(),
            target = self.target.root(),
            operations = operations.len(),
            deletes = operations
                .iter()
                .filter(|op| op.kind() == OperationKind::Delete)
                .count(),
            "plan complete"
        );
        Ok(operations)
    }
}

impl fmt::Debug for SyncPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncPlanner")
            .field("origin", &self.origin.root())
            .field("target", &self.target.root())
            .field("add_missing", &self.add_missing)
            .field("delete_orphans", &self.delete_orphans)
            .field("compare", &self.compare)
            .field("compare_concurrency", &self.compare_concurrency)
            .field("list_concurrency", &self.list_concurrency)
            .finish()
    }
}

/// State shared by the reconciliation tasks of one `plan` call.
///
/// `remaining` is only touched for a synchronous lookup-and-remove, never
/// across an await.
struct Reconciler {
    origin_protocol: String,
    target: Arc<dyn Provider>,
    add_missing: bool,
    compare: Compare,
    on_skip: Option<SkipHook>,
    remaining: Mutex<EntryMap>,
    operations: Mutex<Vec<Operation>>,
}

impl Reconciler {
    async fn reconcile(&self, entry: Arc<Entry>) -> SyncResult<()> {
        let target_key = self.target.remap_key(&entry).await?;
        match self.take_target(&target_key) {
            None if !self.add_missing => {
                trace!(target: "treesync::plan", key = entry.key(), "skip missing entry");
                self.skip(SkipEvent {
                    entry,
                    target_entry: None,
                    reason: Reason::Add,
                });
            }
            None => {
                trace!(target: "treesync::plan", key = entry.key(), "add");
                self.upload(&entry, Reason::Add).await?;
            }
            Some(target_entry) => {
                if self.compare.unchanged(&entry, &target_entry).await? {
                    trace!(target: "treesync::plan", key = entry.key(), "unchanged");
                    self.skip(SkipEvent {
                        entry,
                        target_entry: Some(target_entry),
                        reason: Reason::Change,
                    });
                } else {
                    trace!(target: "treesync::plan", key = entry.key(), "change");
                    self.upload(&entry, Reason::Change).await?;
                }
            }
        }
        Ok(())
    }

    async fn upload(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<()> {
        let operation = if self.origin_protocol == self.target.protocol() {
            self.target.build_copy(entry, reason).await?
        } else {
            self.target.build_put(entry, reason).await?
        };
        self.push(operation);
        Ok(())
    }

    async fn delete(&self, entry: Arc<Entry>) -> SyncResult<()> {
        trace!(target: "treesync::plan", key = entry.key(), "delete orphan");
        let operation = self.target.build_delete(&entry).await?;
        self.push(operation);
        Ok(())
    }

    fn skip(&self, event: SkipEvent) {
        if let Some(hook) = &self.on_skip {
            hook(&event);
        }
    }

    fn take_target(&self, key: &str) -> Option<Arc<Entry>> {
        self.remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    fn take_remaining(&self) -> EntryMap {
        mem::take(&mut *self.remaining.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, operation: Operation) {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation);
    }

    fn take_operations(&self) -> Vec<Operation> {
        mem::take(&mut *self.operations.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
