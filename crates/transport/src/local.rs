//! Provider for directory trees on the local filesystem.
//!
//! Keys are forward-slash paths relative to the root. Content hashes are the
//! lowercase hex MD5 of the file bytes, the same value an object store
//! reports as the ETag of a single-part upload, so a local tree compares
//! cleanly against a bucket.

mod staging;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use engine::{
    ByteStream, Entry, EntryHook, EntryMap, IoResultExt, Operation, OperationKind, Provider,
    Reason, SyncError, SyncResult, job_fn,
};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};
use walk::{WalkBuilder, WalkEntry, WalkError};

use self::staging::StagedFile;
use crate::options::ProviderOptions;
use crate::resolve::FILE_PROTOCOL;

/// [`Provider`] serving a directory tree under the `file` protocol.
pub struct FsProvider {
    root: String,
    root_path: PathBuf,
    options: ProviderOptions,
    this: Weak<Self>,
}

impl FsProvider {
    /// Creates a provider for `root`.
    ///
    /// Relative roots are resolved against the current directory. An empty
    /// root is accepted here and reported as [`SyncError::RootMissing`] on
    /// enumeration.
    pub fn new(root: impl Into<String>, options: ProviderOptions) -> Arc<Self> {
        let root = root.into();
        let root_path = std::path::absolute(&root).unwrap_or_else(|_| PathBuf::from(&root));
        Arc::new_cyclic(|this| Self {
            root,
            root_path,
            options,
            this: this.clone(),
        })
    }

    /// Absolute directory this provider serves.
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Settings this provider was created with.
    #[must_use]
    pub const fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Absolute path of `key` below the root.
    #[must_use]
    pub fn path_of(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root_path.clone(), |path, part| path.join(part))
    }

    fn source(&self) -> Weak<dyn Provider> {
        self.this.clone()
    }

    fn walk_error(&self, error: WalkError) -> SyncError {
        if error.is_root_missing() {
            return SyncError::RootNotFound {
                root: self.root.clone(),
            };
        }
        let (path, source) = error.into_parts();
        SyncError::io(path, source)
    }

    fn scan(&self, on_ignore: Option<&EntryHook>) -> SyncResult<EntryMap> {
        let mut walker = WalkBuilder::new(&self.root_path)
            .follow_symlinks(self.options.follow_symlinks)
            .build()
            .map_err(|error| self.walk_error(error))?;

        let ignores = &self.options.ignores;
        let mut entries = EntryMap::new();
        while let Some(item) = walker.next() {
            let found = item.map_err(|error| self.walk_error(error))?;

            if found.is_lossy() {
                // The key cannot be turned back into the path it came from.
                if found.is_dir() {
                    walker.skip_current_dir();
                }
                debug!(target: "treesync::list", key = found.key(), "name is not valid UTF-8");
                self.report_ignored(&found, on_ignore);
                continue;
            }

            if found.is_dir() {
                if ignores.is_ignored(found.key(), true) {
                    walker.skip_current_dir();
                    trace!(target: "treesync::list", key = found.key(), "ignored directory");
                    self.report_ignored(&found, on_ignore);
                }
                continue;
            }
            if !found.is_file() {
                trace!(target: "treesync::list", key = found.key(), "not a regular file");
                self.report_ignored(&found, on_ignore);
                continue;
            }

            let entry = Arc::new(self.entry_for(&found));
            if ignores.is_ignored(found.key(), false) {
                trace!(target: "treesync::list", key = found.key(), "ignored file");
                if let Some(hook) = on_ignore {
                    hook(&entry);
                }
            } else {
                entries.insert(entry);
            }
        }
        Ok(entries)
    }

    fn entry_for(&self, found: &WalkEntry) -> Entry {
        let mut entry = Entry::new(found.key(), self.source());
        if found.is_file() {
            entry = entry.with_size(found.len());
        }
        if let Some(modified) = found.modified() {
            entry = entry.with_last_modified(modified);
        }
        entry
    }

    fn report_ignored(&self, found: &WalkEntry, on_ignore: Option<&EntryHook>) {
        if let Some(hook) = on_ignore {
            hook(&Arc::new(self.entry_for(found)));
        }
    }

    fn params(
        &self,
        kind: OperationKind,
        entry: &Entry,
        key: &str,
        source: Option<&Path>,
    ) -> serde_json::Value {
        let mut params = serde_json::json!({
            "root": self.root,
            "key": key,
            "path": self.path_of(key).to_string_lossy(),
        });
        if let Some(source) = source {
            params["source"] = serde_json::Value::from(source.to_string_lossy());
        }
        self.options.apply_hook(kind, entry, &mut params);
        params
    }
}

impl fmt::Debug for FsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsProvider")
            .field("root", &self.root)
            .field("root_path", &self.root_path)
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl Provider for FsProvider {
    fn protocol(&self) -> &str {
        FILE_PROTOCOL
    }

    fn root(&self) -> &str {
        &self.root
    }

    async fn enumerate(&self, on_ignore: Option<&EntryHook>) -> SyncResult<EntryMap> {
        if self.root.is_empty() {
            return Err(SyncError::RootMissing);
        }
        let this = self.this.upgrade().ok_or_else(|| SyncError::ProviderGone {
            key: self.root.clone(),
        })?;
        let on_ignore = on_ignore.cloned();

        let entries = tokio::task::spawn_blocking(move || this.scan(on_ignore.as_ref()))
            .await
            .map_err(|error| {
                SyncError::Runtime(format!("enumeration of {} failed: {error}", self.root))
            })??;

        debug!(target: "treesync::list", root = %self.root, entries = entries.len(), "walked tree");
        Ok(entries)
    }

    async fn open_stream(&self, entry: &Entry) -> SyncResult<ByteStream> {
        let path = self.path_of(entry.key());
        let file = File::open(&path).await.with_path(&path)?;
        Ok(Box::pin(file))
    }

    async fn copy_source(&self, entry: &Entry) -> SyncResult<String> {
        Ok(self.path_of(entry.key()).to_string_lossy().into_owned())
    }

    async fn content_hash(&self, entry: &Entry) -> SyncResult<String> {
        entry
            .hash_or_try_init(|| async {
                let path = self.path_of(entry.key());
                let file = File::open(&path).await.with_path(&path)?;
                let hash = checksums::md5_hex_async(file).await.with_path(&path)?;
                trace!(target: "treesync::list", key = entry.key(), %hash, "hashed file");
                Ok(hash)
            })
            .await
    }

    async fn remap_key(&self, entry: &Entry) -> SyncResult<String> {
        Ok(self.options.target_key(entry).to_owned())
    }

    async fn build_put(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
        let key = self.remap_key(entry).await?;
        let destination = self.path_of(&key);
        let params = self.params(OperationKind::Put, entry, &key, None);
        let origin = Arc::clone(entry);

        let job = job_fn(move || {
            let origin = Arc::clone(&origin);
            let destination = destination.clone();
            async move {
                let mut reader = origin.open_stream().await?;
                let (staged, mut file) = StagedFile::create(&destination).await?;
                tokio::io::copy(&mut reader, &mut file)
                    .await
                    .with_path(&destination)?;
                file.flush().await.with_path(&destination)?;
                drop(file);
                staged.commit().await
            }
        });
        Ok(Operation::put(Arc::clone(entry), reason, job).with_params(params))
    }

    async fn build_copy(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
        let key = self.remap_key(entry).await?;
        let destination = self.path_of(&key);
        let source = PathBuf::from(entry.copy_source().await?);
        let params = self.params(OperationKind::Copy, entry, &key, Some(&source));

        let job = job_fn(move || {
            let source = source.clone();
            let destination = destination.clone();
            async move {
                let (staged, file) = StagedFile::create(&destination).await?;
                drop(file);
                fs::copy(&source, staged.path()).await.with_path(&source)?;
                staged.commit().await
            }
        });
        Ok(Operation::copy(Arc::clone(entry), reason, job).with_params(params))
    }

    async fn build_delete(&self, entry: &Arc<Entry>) -> SyncResult<Operation> {
        let path = self.path_of(entry.key());
        let params = self.params(OperationKind::Delete, entry, entry.key(), None);

        let job = job_fn(move || {
            let path = path.clone();
            async move {
                match fs::remove_file(&path).await {
                    Ok(()) => Ok(()),
                    Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(error) => Err(SyncError::io(path, error)),
                }
            }
        });
        Ok(Operation::delete(Arc::clone(entry), job).with_params(params))
    }
}
