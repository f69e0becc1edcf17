#![deny(unsafe_code)]

//! Shared fixtures for the treesync workspace tests.
//!
//! [`MockProvider`] is an in-memory [`Provider`] with a configurable protocol,
//! listing latency, ignore predicate and key remapping. Jobs built by it do no
//! I/O; they record what ran in [`MockProvider::executed`].
//!
//! [`a`], [`b`] and [`c`] are the three entries most planner tests are
//! written against.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use engine::{
    ByteStream, Entry, EntryHook, EntryMap, Operation, OperationKind, Provider, Reason, SyncError,
    SyncResult, job_fn,
};
use tempfile::TempDir;

/// Hash shared by fixture `A`.
pub const A_HASH: &str = "d41d8cd98f00b204e9800998ecf8427e";

/// Hash shared by fixtures `B` and `C`.
pub const BC_HASH: &str = "e4995362f4cbc0c00bea8c662b891e42";

/// Description of an entry a [`MockProvider`] will enumerate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockFile {
    /// Entry key.
    pub key: String,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Last-modified timestamp.
    pub last_modified: Option<SystemTime>,
    /// Precomputed content hash; `None` makes hashing fail with `MissingHash`.
    pub hash: Option<String>,
}

impl MockFile {
    /// A file with only a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
            last_modified: None,
            hash: None,
        }
    }

    /// Replaces the size.
    #[must_use]
    pub const fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Replaces the hash.
    #[must_use]
    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Removes the hash.
    #[must_use]
    pub fn without_hash(mut self) -> Self {
        self.hash = None;
        self
    }

    /// Replaces the modification time with `secs` after the Unix epoch.
    #[must_use]
    pub fn modified_at(mut self, secs: u64) -> Self {
        self.last_modified = Some(UNIX_EPOCH + Duration::from_secs(secs));
        self
    }

    fn to_entry(&self, source: Weak<dyn Provider>) -> Entry {
        let mut entry = Entry::new(self.key.clone(), source);
        if let Some(size) = self.size {
            entry = entry.with_size(size);
        }
        if let Some(modified) = self.last_modified {
            entry = entry.with_last_modified(modified);
        }
        if let Some(hash) = &self.hash {
            entry = entry.with_hash(hash.clone());
        }
        entry
    }
}

/// `A.txt`, 122 bytes.
pub fn a() -> MockFile {
    MockFile::new("A.txt")
        .size(122)
        .modified_at(1_577_850_137)
        .hash(A_HASH)
}

/// `B.txt`, 1 MiB.
pub fn b() -> MockFile {
    MockFile::new("B.txt")
        .size(1024 * 1024)
        .modified_at(1_585_734_137)
        .hash(BC_HASH)
}

/// `C.md`, 1 KiB.
pub fn c() -> MockFile {
    MockFile::new("C.md")
        .size(1024)
        .modified_at(1_585_734_137)
        .hash(BC_HASH)
}

/// One job run recorded by a [`MockProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executed {
    /// Kind of the operation that ran.
    pub kind: OperationKind,
    /// Reason, absent for deletes.
    pub reason: Option<Reason>,
    /// Key of the operation's subject entry.
    pub key: String,
}

type EntryPredicate = Arc<dyn Fn(&Entry) -> bool + Send + Sync>;
type KeyRemap = Arc<dyn Fn(&Entry) -> String + Send + Sync>;
type EntryObserver = Arc<dyn Fn(&Entry) + Send + Sync>;

/// Builder for [`MockProvider`].
pub struct MockProviderBuilder {
    protocol: String,
    root: String,
    files: Vec<MockFile>,
    list_delay: Duration,
    job_delay: Duration,
    ignores: Option<EntryPredicate>,
    remap: Option<KeyRemap>,
    on_hash: Option<EntryObserver>,
    failing_keys: Vec<String>,
}

impl MockProviderBuilder {
    /// Sets the protocol tag (default `"mock"`).
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Entries returned by every enumeration, in this order.
    #[must_use]
    pub fn files(mut self, files: impl IntoIterator<Item = MockFile>) -> Self {
        self.files = files.into_iter().collect();
        self
    }

    /// Sleeps this long at the start of every enumeration.
    #[must_use]
    pub const fn list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Sleeps this long inside every job.
    #[must_use]
    pub const fn job_delay(mut self, delay: Duration) -> Self {
        self.job_delay = delay;
        self
    }

    /// Entries matching `predicate` are reported as ignored.
    #[must_use]
    pub fn ignores<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Entry) -> bool + Send + Sync + 'static,
    {
        self.ignores = Some(Arc::new(predicate));
        self
    }

    /// Overrides `remap_key`.
    #[must_use]
    pub fn remap_key<F>(mut self, remap: F) -> Self
    where
        F: Fn(&Entry) -> String + Send + Sync + 'static,
    {
        self.remap = Some(Arc::new(remap));
        self
    }

    /// Observes every `content_hash` call.
    #[must_use]
    pub fn on_hash<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Entry) + Send + Sync + 'static,
    {
        self.on_hash = Some(Arc::new(observer));
        self
    }

    /// Jobs for `key` fail immediately instead of recording.
    #[must_use]
    pub fn fail_job(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.push(key.into());
        self
    }

    /// Builds the provider; its entries point back at it.
    pub fn build(self) -> Arc<MockProvider> {
        Arc::new_cyclic(|weak: &Weak<MockProvider>| {
            let source: Weak<dyn Provider> = weak.clone();
            let entries = self
                .files
                .iter()
                .map(|file| Arc::new(file.to_entry(source.clone())))
                .collect();
            MockProvider {
                protocol: self.protocol,
                root: self.root,
                entries,
                list_delay: self.list_delay,
                job_delay: self.job_delay,
                ignores: self.ignores,
                remap: self.remap,
                on_hash: self.on_hash,
                failing_keys: Arc::new(self.failing_keys),
                executed: Arc::new(Mutex::new(Vec::new())),
            }
        })
    }
}

/// In-memory [`Provider`] for tests.
pub struct MockProvider {
    protocol: String,
    root: String,
    entries: EntryMap,
    list_delay: Duration,
    job_delay: Duration,
    ignores: Option<EntryPredicate>,
    remap: Option<KeyRemap>,
    on_hash: Option<EntryObserver>,
    failing_keys: Arc<Vec<String>>,
    executed: Arc<Mutex<Vec<Executed>>>,
}

impl MockProvider {
    /// Starts a provider rooted at `root` with protocol `"mock"` and no files.
    pub fn builder(root: impl Into<String>) -> MockProviderBuilder {
        MockProviderBuilder {
            protocol: "mock".to_owned(),
            root: root.into(),
            files: Vec::new(),
            list_delay: Duration::ZERO,
            job_delay: Duration::ZERO,
            ignores: None,
            remap: None,
            on_hash: None,
            failing_keys: Vec::new(),
        }
    }

    /// Every entry this provider was built with, including ignored ones.
    pub const fn entries(&self) -> &EntryMap {
        &self.entries
    }

    /// Jobs that have run so far, in completion order.
    pub fn executed(&self) -> Vec<Executed> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn operation(
        &self,
        kind: OperationKind,
        reason: Option<Reason>,
        entry: &Arc<Entry>,
        key: String,
    ) -> Operation {
        let log = Arc::clone(&self.executed);
        let failing = self.failing_keys.contains(&key);
        let delay = self.job_delay;
        let record = Executed {
            kind,
            reason,
            key: key.clone(),
        };
        let job = job_fn(move || {
            let log = Arc::clone(&log);
            let record = record.clone();
            async move {
                if failing {
                    return Err(SyncError::provider(io::Error::other(format!(
                        "mock failure for {}",
                        record.key
                    ))));
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                log.lock().unwrap_or_else(PoisonError::into_inner).push(record);
                Ok(())
            }
        });
        Operation::new(kind, reason, Arc::clone(entry), job).with_params(serde_json::json!({
            "root": self.root,
            "key": key,
        }))
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("protocol", &self.protocol)
            .field("root", &self.root)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn root(&self) -> &str {
        &self.root
    }

    async fn enumerate(&self, on_ignore: Option<&EntryHook>) -> SyncResult<EntryMap> {
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        if self.root.is_empty() {
            return Err(SyncError::RootMissing);
        }
        let Some(ignores) = &self.ignores else {
            return Ok(self.entries.clone());
        };
        let mut listed = EntryMap::new();
        for entry in self.entries.iter() {
            if ignores(entry) {
                if let Some(hook) = on_ignore {
                    hook(entry);
                }
            } else {
                listed.insert(Arc::clone(entry));
            }
        }
        Ok(listed)
    }

    async fn open_stream(&self, entry: &Entry) -> SyncResult<ByteStream> {
        Ok(Box::pin(io::Cursor::new(entry.key().as_bytes().to_vec())))
    }

    async fn copy_source(&self, entry: &Entry) -> SyncResult<String> {
        Ok(entry.key().to_owned())
    }

    async fn content_hash(&self, entry: &Entry) -> SyncResult<String> {
        if let Some(observer) = &self.on_hash {
            observer(entry);
        }
        entry
            .hash_or_try_init(|| async {
                Err(SyncError::MissingHash {
                    key: entry.key().to_owned(),
                })
            })
            .await
    }

    async fn remap_key(&self, entry: &Entry) -> SyncResult<String> {
        Ok(self
            .remap
            .as_ref()
            .map_or_else(|| entry.key().to_owned(), |remap| remap(entry)))
    }

    async fn build_put(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
        let key = self.remap_key(entry).await?;
        Ok(self.operation(OperationKind::Put, Some(reason), entry, key))
    }

    async fn build_copy(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
        let key = self.remap_key(entry).await?;
        Ok(self.operation(OperationKind::Copy, Some(reason), entry, key))
    }

    async fn build_delete(&self, entry: &Arc<Entry>) -> SyncResult<Operation> {
        Ok(self.operation(OperationKind::Delete, None, entry, entry.key().to_owned()))
    }
}

/// Creates a temporary directory populated with `files` (relative path, contents).
pub fn temp_tree(files: &[(&str, &[u8])]) -> io::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    for (relative, contents) in files {
        write_file(dir.path(), relative, contents)?;
    }
    Ok(dir)
}

/// Writes `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> io::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}
