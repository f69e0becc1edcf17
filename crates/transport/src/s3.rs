//! Provider for objects below a bucket prefix, under the `s3` protocol.
//!
//! Keys are object keys with the root prefix removed. Content hashes are the
//! ETags the listing reports, with their quotes stripped. For objects
//! uploaded in one part that is the hex MD5 of the body, so a bucket compares
//! against a local tree without downloading anything. Entries without an
//! ETag cannot be hashed and fail with [`SyncError::MissingHash`].
//!
//! Requests go through an [`S3Bridge`]. With the `s3` feature enabled,
//! `AwsBridge` sends them with the AWS SDK, configured from the usual
//! environment and profile files.

#[cfg(feature = "s3")]
mod aws;
mod bridge;
mod root;

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use engine::{
    ByteStream, Entry, EntryHook, EntryMap, Operation, OperationKind, Provider, Reason, SyncError,
    SyncResult, job_fn,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

#[cfg(feature = "s3")]
pub use self::aws::AwsBridge;
pub use self::bridge::{
    CopyRequest, DeleteRequest, GetRequest, ListPage, ListRequest, PutRequest, S3Bridge, S3Object,
};
pub use self::root::{S3_PROTOCOL, S3Root};
use crate::TransportError;
use crate::options::ProviderOptions;

/// [`Provider`] serving the objects below an `s3://bucket/prefix` root.
pub struct S3Provider {
    root: String,
    location: S3Root,
    bridge: Arc<dyn S3Bridge>,
    options: ProviderOptions,
    this: Weak<Self>,
}

impl S3Provider {
    /// Creates a provider for `root` that sends its requests through `bridge`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRoot`] when `root` is not of the form
    /// `s3://bucket[/prefix]`.
    pub fn new(
        root: impl Into<String>,
        bridge: Arc<dyn S3Bridge>,
        options: ProviderOptions,
    ) -> Result<Arc<Self>, TransportError> {
        let root = root.into();
        let location = S3Root::parse(&root).ok_or_else(|| TransportError::InvalidRoot {
            root: root.clone(),
            expected: "s3://bucket[/prefix]",
        })?;
        Ok(Arc::new_cyclic(|this| Self {
            root,
            location,
            bridge,
            options,
            this: this.clone(),
        }))
    }

    /// Bucket and prefix this provider serves.
    #[must_use]
    pub const fn location(&self) -> &S3Root {
        &self.location
    }

    /// Settings this provider was created with.
    #[must_use]
    pub const fn options(&self) -> &ProviderOptions {
        &self.options
    }

    fn source(&self) -> Weak<dyn Provider> {
        self.this.clone()
    }

    fn entry_for(&self, object: &S3Object) -> Option<Entry> {
        let key = self.location.relative_key(&object.key)?;
        let mut entry = Entry::new(key, self.source());
        if let Some(size) = object.size {
            entry = entry.with_size(size);
        }
        if let Some(modified) = object.last_modified {
            entry = entry.with_last_modified(modified);
        }
        let e_tag = object.e_tag.as_deref().map(|tag| tag.replace('"', ""));
        if let Some(e_tag) = e_tag.filter(|tag| !tag.is_empty()) {
            entry = entry.with_hash(e_tag);
        }
        Some(entry)
    }

    /// Origin MD5 as the base64 `Content-MD5` header value.
    ///
    /// A hash already known for the entry is always used. Otherwise one is
    /// only computed when checksums are enabled. Multipart ETags carry no
    /// body digest and are left out.
    async fn content_md5(&self, entry: &Entry) -> SyncResult<Option<String>> {
        let hash = match entry.cached_hash() {
            Some(hash) => hash.to_owned(),
            None if self.options.checksum => entry.content_hash().await?,
            None => return Ok(None),
        };
        Ok(hex::decode(&hash)
            .ok()
            .filter(|digest| digest.len() == 16)
            .map(|digest| STANDARD.encode(digest)))
    }

    /// Runs `request` through the params hook and returns the request to send
    /// together with the parameters to report.
    fn finish<T>(
        &self,
        kind: OperationKind,
        entry: &Entry,
        request: T,
    ) -> SyncResult<(T, serde_json::Value)>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut params = serde_json::to_value(&request).map_err(SyncError::provider)?;
        if self.options.params_hook.is_none() {
            return Ok((request, params));
        }
        self.options.apply_hook(kind, entry, &mut params);
        let request = serde_json::from_value(params.clone()).map_err(SyncError::provider)?;
        Ok((request, params))
    }
}

impl fmt::Debug for S3Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Provider")
            .field("root", &self.root)
            .field("location", &self.location)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for S3Provider {
    fn protocol(&self) -> &str {
        S3_PROTOCOL
    }

    fn root(&self) -> &str {
        &self.root
    }

    async fn enumerate(&self, on_ignore: Option<&EntryHook>) -> SyncResult<EntryMap> {
        let request = ListRequest {
            bucket: self.location.bucket.clone(),
            prefix: self.location.list_prefix(),
            max_keys: None,
        };
        let ignores = &self.options.ignores;
        let mut entries = EntryMap::new();
        let mut continuation = None;
        let mut pages = 0_usize;
        loop {
            let page = self.bridge.list_objects(&request, continuation).await?;
            pages += 1;
            for object in &page.objects {
                let Some(entry) = self.entry_for(object) else {
                    trace!(target: "treesync::list", key = %object.key, "skipped folder object");
                    continue;
                };
                let entry = Arc::new(entry);
                if ignores.is_ignored(entry.key(), false) {
                    trace!(target: "treesync::list", key = entry.key(), "ignored object");
                    if let Some(hook) = on_ignore {
                        hook(&entry);
                    }
                } else {
                    entries.insert(entry);
                }
            }
            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        let count = entries.len();
        debug!(target: "treesync::list", root = %self.root, entries = count, pages, "listed");
        Ok(entries)
    }

    async fn open_stream(&self, entry: &Entry) -> SyncResult<ByteStream> {
        let request = GetRequest {
            bucket: self.location.bucket.clone(),
            key: self.location.object_key(entry.key()),
        };
        self.bridge.get_object(&request).await
    }

    async fn copy_source(&self, entry: &Entry) -> SyncResult<String> {
        Ok(self.location.copy_source(entry.key()))
    }

    async fn content_hash(&self, entry: &Entry) -> SyncResult<String> {
        entry
            .cached_hash()
            .map(str::to_owned)
            .ok_or_else(|| SyncError::MissingHash {
                key: entry.key().to_owned(),
            })
    }

    async fn remap_key(&self, entry: &Entry) -> SyncResult<String> {
        Ok(self.options.target_key(entry).to_owned())
    }

    async fn build_put(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
        let key = self.remap_key(entry).await?;
        let request = PutRequest {
            bucket: self.location.bucket.clone(),
            key: self.location.object_key(&key),
            content_type: mime_guess::from_path(&key).first_raw().map(str::to_owned),
            content_md5: self.content_md5(entry).await?,
            content_length: entry.size(),
            ..PutRequest::default()
        };
        let (request, params) = self.finish(OperationKind::Put, entry, request)?;
        let bridge = Arc::clone(&self.bridge);
        let origin = Arc::clone(entry);

        let job = job_fn(move || {
            let bridge = Arc::clone(&bridge);
            let origin = Arc::clone(&origin);
            let request = request.clone();
            async move {
                let body = origin.open_stream().await?;
                bridge.put_object(&request, body).await
            }
        });
        Ok(Operation::put(Arc::clone(entry), reason, job).with_params(params))
    }

    async fn build_copy(&self, entry: &Arc<Entry>, reason: Reason) -> SyncResult<Operation> {
        let key = self.remap_key(entry).await?;
        let request = CopyRequest {
            bucket: self.location.bucket.clone(),
            key: self.location.object_key(&key),
            copy_source: entry.copy_source().await?,
            ..CopyRequest::default()
        };
        let (request, params) = self.finish(OperationKind::Copy, entry, request)?;
        let bridge = Arc::clone(&self.bridge);

        let job = job_fn(move || {
            let bridge = Arc::clone(&bridge);
            let request = request.clone();
            async move { bridge.copy_object(&request).await }
        });
        Ok(Operation::copy(Arc::clone(entry), reason, job).with_params(params))
    }

    async fn build_delete(&self, entry: &Arc<Entry>) -> SyncResult<Operation> {
        // Orphans are target entries, so their keys are never remapped.
        let request = DeleteRequest {
            bucket: self.location.bucket.clone(),
            key: self.location.object_key(entry.key()),
        };
        let (request, params) = self.finish(OperationKind::Delete, entry, request)?;
        let bridge = Arc::clone(&self.bridge);

        let job = job_fn(move || {
            let bridge = Arc::clone(&bridge);
            let request = request.clone();
            async move { bridge.delete_object(&request).await }
        });
        Ok(Operation::delete(Arc::clone(entry), job).with_params(params))
    }
}
