//! Entry listing stage.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::entry::EntryMap;
use crate::error::SyncResult;
use crate::provider::{EntryHook, Provider};
use crate::runner::TaskRunner;

/// Entries enumerated from one provider and the time it took.
#[derive(Clone, Debug, Default)]
pub struct ListResult {
    /// Entries in enumeration order.
    pub entries: EntryMap,
    /// Wall time spent enumerating (and hashing, when requested).
    pub duration: Duration,
}

type ProviderHook = Arc<dyn Fn(&Arc<dyn Provider>) + Send + Sync>;
type ListEndHook = Arc<dyn Fn(&Arc<dyn Provider>, &ListResult) + Send + Sync>;

/// Options for [`list_entries`].
#[derive(Clone)]
pub struct ListOptions {
    concurrency: usize,
    compute_hashes: bool,
    on_ignore: Option<EntryHook>,
    on_begin: Option<ProviderHook>,
    on_end: Option<ListEndHook>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ListOptions {
    /// Serial listing without hash pre-computation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            concurrency: 1,
            compute_hashes: false,
            on_ignore: None,
            on_begin: None,
            on_end: None,
        }
    }

    /// Maximum number of providers enumerated at once.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Resolves every entry's content hash after enumeration.
    #[must_use]
    pub const fn compute_hashes(mut self, compute: bool) -> Self {
        self.compute_hashes = compute;
        self
    }

    /// Callback for entries a provider excludes.
    #[must_use]
    pub fn on_ignore(mut self, hook: Option<EntryHook>) -> Self {
        self.on_ignore = hook;
        self
    }

    /// Callback fired before a provider is enumerated.
    #[must_use]
    pub fn on_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<dyn Provider>) + Send + Sync + 'static,
    {
        self.on_begin = Some(Arc::new(hook));
        self
    }

    /// Callback fired after a provider is enumerated.
    #[must_use]
    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<dyn Provider>, &ListResult) + Send + Sync + 'static,
    {
        self.on_end = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ListOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListOptions")
            .field("concurrency", &self.concurrency)
            .field("compute_hashes", &self.compute_hashes)
            .field("on_ignore", &self.on_ignore.is_some())
            .finish_non_exhaustive()
    }
}

/// Enumerates `providers`, returning one [`ListResult`] per provider in input order.
///
/// Fails with [`SyncError::NothingToDo`](crate::SyncError::NothingToDo) when
/// `providers` is empty. Provider errors are returned unchanged.
pub async fn list_entries(
    providers: &[Arc<dyn Provider>],
    options: &ListOptions,
) -> SyncResult<Vec<ListResult>> {
    let mut runner = TaskRunner::<Arc<dyn Provider>, ListResult>::new(options.concurrency);
    if let Some(hook) = options.on_begin.clone() {
        runner = runner.on_begin(move |provider| hook(provider));
    }
    if let Some(hook) = options.on_end.clone() {
        runner = runner.on_end(move |provider, result, _| hook(provider, result));
    }

    let compute_hashes = options.compute_hashes;
    let on_ignore = options.on_ignore.clone();
    runner
        .run(providers.to_vec(), move |provider| {
            let on_ignore = on_ignore.clone();
            async move {
                let started = Instant::now();
                let entries = provider.enumerate(on_ignore.as_ref()).await?;
                if compute_hashes {
                    for entry in entries.iter() {
                        provider.content_hash(entry).await?;
                    }
                }
                let duration = started.elapsed();
                info!(
                    target: "treesync::list",
                    root = provider.root(),
                    entries = entries.len(),
                    ?duration,
                    "listed provider"
                );
                Ok(ListResult { entries, duration })
            }
        })
        .await
}
