//! Enumerated content items and the ordered collection that owns them.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tokio::sync::OnceCell;

use crate::error::{SyncError, SyncResult};
use crate::provider::{ByteStream, Provider};

/// One content item enumerated from a [`Provider`] root.
///
/// The `source` back-reference is non-owning: it is only used to dispatch
/// capability calls (streaming, hashing, copy sources) to the provider that
/// produced the entry. The entry itself is owned by whichever [`EntryMap`]
/// holds it.
///
/// The content hash is memoized in a [`OnceCell`]. Concurrent requests for the
/// same entry's hash share one computation, and a stored hash is never
/// overwritten.
pub struct Entry {
    key: String,
    size: Option<u64>,
    last_modified: Option<SystemTime>,
    hash: OnceCell<String>,
    source: Weak<dyn Provider>,
}

impl Entry {
    /// Creates an entry for `key` owned by the provider behind `source`.
    pub fn new(key: impl Into<String>, source: Weak<dyn Provider>) -> Self {
        Self {
            key: key.into(),
            size: None,
            last_modified: None,
            hash: OnceCell::new(),
            source,
        }
    }

    /// Sets the entry size in bytes.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the last-modified timestamp.
    #[must_use]
    pub const fn with_last_modified(mut self, last_modified: SystemTime) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Seeds the content hash, e.g. from an object store ETag.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = OnceCell::new_with(Some(hash.into()));
        self
    }

    /// Forward-slash path relative to the provider root.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Size in bytes, if known.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }

    /// Last-modified timestamp, if known.
    #[must_use]
    pub const fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Returns the memoized content hash without computing it.
    #[must_use]
    pub fn cached_hash(&self) -> Option<&str> {
        self.hash.get().map(String::as_str)
    }

    /// Returns the memoized hash, running `init` to compute it when absent.
    ///
    /// A failed `init` leaves the hash unset so a later call may retry.
    pub async fn hash_or_try_init<F, Fut>(&self, init: F) -> SyncResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SyncResult<String>>,
    {
        self.hash.get_or_try_init(init).await.cloned()
    }

    /// Upgrades the back-reference to the owning provider.
    pub fn provider(&self) -> SyncResult<Arc<dyn Provider>> {
        self.source.upgrade().ok_or_else(|| SyncError::ProviderGone {
            key: self.key.clone(),
        })
    }

    /// Content hash computed (and memoized) by the owning provider.
    pub async fn content_hash(&self) -> SyncResult<String> {
        self.provider()?.content_hash(self).await
    }

    /// Opens the entry's content through the owning provider.
    pub async fn open_stream(&self) -> SyncResult<ByteStream> {
        self.provider()?.open_stream(self).await
    }

    /// Descriptor a same-protocol copy can consume.
    pub async fn copy_source(&self) -> SyncResult<String> {
        self.provider()?.copy_source(self).await
    }

    /// Milliseconds since the Unix epoch for `last_modified`.
    #[must_use]
    pub fn last_modified_millis(&self) -> Option<u128> {
        self.last_modified
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_millis())
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("size", &self.size)
            .field("last_modified", &self.last_modified)
            .field("hash", &self.hash.get())
            .finish_non_exhaustive()
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Entry", 4)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("last_modified", &self.last_modified_millis())?;
        state.serialize_field("hash", &self.cached_hash())?;
        state.end()
    }
}

/// Insertion-ordered mapping from key to [`Entry`].
///
/// Iteration follows enumeration order. Removing a key leaves the relative
/// order of the remaining entries unchanged.
#[derive(Clone, Debug, Default)]
pub struct EntryMap {
    slots: Vec<Option<Arc<Entry>>>,
    index: FxHashMap<String, usize>,
}

impl EntryMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry`, replacing (in place) any entry with the same key.
    pub fn insert(&mut self, entry: Arc<Entry>) -> Option<Arc<Entry>> {
        if let Some(&slot) = self.index.get(entry.key()) {
            return self.slots[slot].replace(entry);
        }
        self.index.insert(entry.key().to_owned(), self.slots.len());
        self.slots.push(Some(entry));
        None
    }

    /// Looks up the entry stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<Entry>> {
        self.index
            .get(key)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    /// Returns `true` when `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Removes and returns the entry stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Arc<Entry>> {
        let slot = self.index.remove(key)?;
        self.slots[slot].take()
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` when the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates entries in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.slots.iter().flatten()
    }

    /// Iterates keys in enumeration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|entry| entry.key())
    }

    /// Consumes the map and returns its entries in enumeration order.
    #[must_use]
    pub fn into_entries(self) -> Vec<Arc<Entry>> {
        self.slots.into_iter().flatten().collect()
    }
}

impl FromIterator<Arc<Entry>> for EntryMap {
    fn from_iter<I: IntoIterator<Item = Arc<Entry>>>(iter: I) -> Self {
        let mut map = Self::new();
        for entry in iter {
            map.insert(entry);
        }
        map
    }
}

impl Extend<Arc<Entry>> for EntryMap {
    fn extend<I: IntoIterator<Item = Arc<Entry>>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl IntoIterator for EntryMap {
    type Item = Arc<Entry>;
    type IntoIter = std::iter::Flatten<std::vec::IntoIter<Option<Arc<Entry>>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter().flatten()
    }
}

impl Serialize for EntryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(AsRef::<Entry>::as_ref))
    }
}
