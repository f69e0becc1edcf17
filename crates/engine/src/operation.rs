//! Planned operations and skip events.
//!
//! An [`Operation`] is a command value: constructing one performs no I/O.
//! The work happens only when [`Operation::execute`] runs its [`Job`], which
//! keeps previewing a plan and executing it fully decoupled.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::entry::Entry;
use crate::error::SyncResult;

/// What an operation does to the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Stream the origin entry's bytes into the target.
    Put,
    /// Copy within one backend using a copy-source descriptor.
    Copy,
    /// Remove an orphaned target entry.
    Delete,
}

impl OperationKind {
    /// Upper-case label used in rendered output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Copy => "COPY",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an upload (or skip) was decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// The entry has no counterpart at the target.
    Add,
    /// The entry exists at the target with different content.
    Change,
}

impl Reason {
    /// Upper-case label used in rendered output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Change => "CHANGE",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred action performing an operation's I/O.
#[async_trait]
pub trait Job: Send + Sync {
    /// Performs the action.
    async fn run(&self) -> SyncResult<()>;
}

/// [`Job`] backed by a closure returning a future.
pub struct FnJob<F>(F);

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = SyncResult<()>> + Send,
{
    async fn run(&self) -> SyncResult<()> {
        (self.0)().await
    }
}

/// Wraps a closure as a shareable [`Job`].
pub fn job_fn<F, Fut>(f: F) -> Arc<dyn Job>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SyncResult<()>> + Send + 'static,
{
    Arc::new(FnJob(f))
}

/// A planned, not-yet-executed action against the target.
#[derive(Clone)]
pub struct Operation {
    kind: OperationKind,
    reason: Option<Reason>,
    entry: Arc<Entry>,
    params: serde_json::Value,
    job: Arc<dyn Job>,
}

impl Operation {
    /// Creates an operation of any kind.
    pub fn new(
        kind: OperationKind,
        reason: Option<Reason>,
        entry: Arc<Entry>,
        job: Arc<dyn Job>,
    ) -> Self {
        Self {
            kind,
            reason,
            entry,
            params: serde_json::Value::Null,
            job,
        }
    }

    /// Creates a put operation for `entry`.
    pub fn put(entry: Arc<Entry>, reason: Reason, job: Arc<dyn Job>) -> Self {
        Self::new(OperationKind::Put, Some(reason), entry, job)
    }

    /// Creates a copy operation for `entry`.
    pub fn copy(entry: Arc<Entry>, reason: Reason, job: Arc<dyn Job>) -> Self {
        Self::new(OperationKind::Copy, Some(reason), entry, job)
    }

    /// Creates a delete operation for `entry`.
    pub fn delete(entry: Arc<Entry>, job: Arc<dyn Job>) -> Self {
        Self::new(OperationKind::Delete, None, entry, job)
    }

    /// Attaches the backend request description.
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    /// Operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Reason for uploads; `None` for deletes.
    #[must_use]
    pub const fn reason(&self) -> Option<Reason> {
        self.reason
    }

    /// Subject entry.
    #[must_use]
    pub const fn entry(&self) -> &Arc<Entry> {
        &self.entry
    }

    /// Shorthand for the subject entry's key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.entry.key()
    }

    /// Backend-specific request description. Not interpreted by the planner.
    #[must_use]
    pub const fn params(&self) -> &serde_json::Value {
        &self.params
    }

    /// Runs the deferred job.
    pub async fn execute(&self) -> SyncResult<()> {
        self.job.run().await
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("key", &self.entry.key())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Operation", 5)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("reason", &self.reason)?;
        state.serialize_field("key", self.entry.key())?;
        state.serialize_field("size", &self.entry.size())?;
        state.serialize_field("params", &self.params)?;
        state.end()
    }
}

/// An entry the planner considered but produced no operation for.
#[derive(Clone, Debug)]
pub struct SkipEvent {
    /// Origin entry.
    pub entry: Arc<Entry>,
    /// Matched target entry; `None` when `reason` is [`Reason::Add`].
    pub target_entry: Option<Arc<Entry>>,
    /// [`Reason::Add`] for excluded uploads, [`Reason::Change`] for unchanged pairs.
    pub reason: Reason,
}

impl Serialize for SkipEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SkipEvent", 3)?;
        state.serialize_field("key", self.entry.key())?;
        state.serialize_field("target_key", &self.target_entry.as_ref().map(|e| e.key()))?;
        state.serialize_field("reason", &self.reason)?;
        state.end()
    }
}

/// Callback fired for each skip event.
pub type SkipHook = Arc<dyn Fn(&SkipEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use std::sync::Weak;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::provider::tests::NullProvider;

    fn entry(key: &str) -> Arc<Entry> {
        Arc::new(Entry::new(key, Weak::<NullProvider>::new()).with_size(10))
    }

    #[tokio::test]
    async fn construction_does_not_run_job() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let op = Operation::put(
            entry("a.txt"),
            Reason::Add,
            job_fn(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        op.execute().await.expect("job");
        op.clone().execute().await.expect("job");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn delete_has_no_reason() {
        let op = Operation::delete(entry("c.txt"), job_fn(|| async { Ok(()) }));
        assert_eq!(op.kind(), OperationKind::Delete);
        assert!(op.reason().is_none());
        assert_eq!(op.key(), "c.txt");
    }

    #[test]
    fn operation_serializes_for_display() {
        let op = Operation::copy(entry("a.txt"), Reason::Change, job_fn(|| async { Ok(()) }))
            .with_params(serde_json::json!({ "to": "/target/a.txt" }));
        let json = serde_json::to_value(&op).expect("serialize");
        assert_eq!(json["kind"], "COPY");
        assert_eq!(json["reason"], "CHANGE");
        assert_eq!(json["key"], "a.txt");
        assert_eq!(json["size"], 10);
        assert_eq!(json["params"]["to"], "/target/a.txt");
    }

    #[test]
    fn skip_event_serializes_keys() {
        let event = SkipEvent {
            entry: entry("b.txt"),
            target_entry: None,
            reason: Reason::Add,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["key"], "b.txt");
        assert!(json["target_key"].is_null());
        assert_eq!(json["reason"], "ADD");
    }

    #[test]
    fn labels_match_display() {
        assert_eq!(OperationKind::Put.to_string(), "PUT");
        assert_eq!(Reason::Change.to_string(), "CHANGE");
    }
}
