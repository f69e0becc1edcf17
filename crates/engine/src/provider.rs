//! The storage provider capability contract.
//!
//! Origin and target are both [`Provider`] implementations. The planner only
//! ever talks to a backend through this trait, so a filesystem tree and an
//! object-store bucket look identical from its point of view. Operations are
//! built by the *target* provider from an *origin* entry: a put streams the
//! origin entry's bytes through [`Entry::open_stream`], a copy hands the
//! backend the origin's [`Entry::copy_source`] descriptor.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::entry::{Entry, EntryMap};
use crate::error::SyncResult;
use crate::operation::{Operation, Reason};

/// Byte stream returned by [`Provider::open_stream`].
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Callback fired for each entry a provider excludes during enumeration.
pub type EntryHook = Arc<dyn Fn(&Arc<Entry>) + Send + Sync>;

/// A storage backend that can enumerate, stream, hash and mutate a content tree.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend kind tag (`"file"`, `"s3"`). Compared for equality only.
    fn protocol(&self) -> &str;

    /// Backend-specific base location, used for display and grouping.
    fn root(&self) -> &str;

    /// Enumerates every entry under the root, in enumeration order.
    ///
    /// Excluded entries are reported once through `on_ignore` and left out of
    /// the returned map. Fails with [`SyncError::RootMissing`] when no root is
    /// configured and [`SyncError::RootNotFound`] when it does not exist.
    ///
    /// [`SyncError::RootMissing`]: crate::SyncError::RootMissing
    /// [`SyncError::RootNotFound`]: crate::SyncError::RootNotFound
    async fn enumerate(&self, on_ignore: Option<&EntryHook>) -> SyncResult<EntryMap>;

    /// Opens the content of `entry`.
    async fn open_stream(&self, entry: &Entry) -> SyncResult<ByteStream>;

    /// Descriptor a same-protocol copy can consume without streaming bytes.
    async fn copy_source(&self, entry: &Entry) -> SyncResult<String>;

    /// Returns the content hash of `entry`, memoizing it on the entry.
    async fn content_hash(&self, entry: &Entry) -> SyncResult<String>;

    /// Key `entry` should occupy when this provider is the target.
    async fn remap_key(&self, entry: &Entry) -> SyncResult<String> {
        Ok(entry.key().to_owned())
    }

    /// Builds an operation that streams `entry` from its own provider into this one.
    async fn build_put(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation>;

    /// Builds an operation that copies `entry` within the backend.
    async fn build_copy(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation>;

    /// Builds an operation that removes `entry` from this provider.
    async fn build_delete(&self, entry: &Arc<Entry>) -> SyncResult<Operation>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::operation::job_fn;

    /// Provider with no entries, used to mint detached entries in unit tests.
    pub(crate) struct NullProvider;

    #[async_trait]
    impl Provider for NullProvider {
        fn protocol(&self) -> &str {
            "null"
        }

        fn root(&self) -> &str {
            ""
        }

        async fn enumerate(&self, _on_ignore: Option<&EntryHook>) -> SyncResult<EntryMap> {
            Ok(EntryMap::new())
        }

        async fn open_stream(&self, _entry: &Entry) -> SyncResult<ByteStream> {
            Ok(Box::pin(tokio::io::empty()))
        }

        async fn copy_source(&self, entry: &Entry) -> SyncResult<String> {
            Ok(entry.key().to_owned())
        }

        async fn content_hash(&self, entry: &Entry) -> SyncResult<String> {
            entry
                .hash_or_try_init(|| async {
                    Err(SyncError::MissingHash {
                        key: entry.key().to_owned(),
                    })
                })
                .await
        }

        async fn build_put(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
            Ok(Operation::put(Arc::clone(entry), reason, job_fn(|| async { Ok(()) })))
        }

        async fn build_copy(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
            Ok(Operation::copy(Arc::clone(entry), reason, job_fn(|| async { Ok(()) })))
        }

        async fn build_delete(&self, entry: &Arc<Entry>) -> SyncResult<Operation> {
            Ok(Operation::delete(Arc::clone(entry), job_fn(|| async { Ok(()) })))
        }
    }

    #[tokio::test]
    async fn remap_key_defaults_to_identity() {
        let provider: Arc<dyn Provider> = Arc::new(NullProvider);
        let entry = Entry::new("dir/a.txt.gz", Arc::downgrade(&provider));
        let key = provider.remap_key(&entry).await.expect("remap");
        assert_eq!(key, "dir/a.txt.gz");
    }

    #[tokio::test]
    async fn entry_dispatches_to_live_provider() {
        let provider: Arc<dyn Provider> = Arc::new(NullProvider);
        let entry = Entry::new("a.txt", Arc::downgrade(&provider)).with_hash("abc");
        assert_eq!(entry.content_hash().await.expect("hash"), "abc");
        assert_eq!(entry.copy_source().await.expect("source"), "a.txt");
    }

    #[tokio::test]
    async fn missing_hash_is_reported_by_key() {
        let provider: Arc<dyn Provider> = Arc::new(NullProvider);
        let entry = Entry::new("a.txt", Arc::downgrade(&provider));
        let error = entry.content_hash().await.expect_err("no hash");
        assert_eq!(error.to_string(), "Missing ETag for a.txt");
    }
}
