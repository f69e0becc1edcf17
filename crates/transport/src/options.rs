//! Settings shared by every provider backend.

use std::fmt;
use std::sync::Arc;

use engine::{Entry, OperationKind};
use filters::IgnoreSet;
use serde_json::Value;

/// Callback that rewrites the request parameters of an operation before it
/// is built.
///
/// It receives the kind of operation, the entry it was built for and the
/// parameters as JSON. The filesystem provider only reports its parameters,
/// while the S3 provider sends whatever the hook leaves behind, so setting
/// `ContentEncoding` to `gzip` on every put publishes pre-compressed files.
pub type ParamsHook = Arc<dyn Fn(OperationKind, &Entry, &mut Value) + Send + Sync>;

/// Per-provider settings shared by every backend.
#[derive(Clone)]
pub struct ProviderOptions {
    /// Entries matching these patterns are left out of enumeration.
    pub ignores: IgnoreSet,
    /// Suffix removed from origin keys when this provider is the target,
    /// e.g. `.gz` to publish `app.js.gz` as `app.js`.
    pub strip_suffix: Option<String>,
    /// Resolve symbolic links while walking. On by default.
    pub follow_symlinks: bool,
    /// Send the origin's MD5 with uploads so the store can reject corrupted
    /// bodies. On by default.
    pub checksum: bool,
    /// Rewrites operation parameters before they are attached.
    pub params_hook: Option<ParamsHook>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            ignores: IgnoreSet::default(),
            strip_suffix: None,
            follow_symlinks: true,
            checksum: true,
            params_hook: None,
        }
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("ignores", &self.ignores)
            .field("strip_suffix", &self.strip_suffix)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("checksum", &self.checksum)
            .field("params_hook", &self.params_hook.is_some())
            .finish()
    }
}

impl ProviderOptions {
    /// Replaces the ignore set.
    #[must_use]
    pub fn ignores(mut self, ignores: IgnoreSet) -> Self {
        self.ignores = ignores;
        self
    }

    /// Sets the suffix stripped from keys written to this provider.
    #[must_use]
    pub fn strip_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.strip_suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    /// Enables or disables symlink resolution.
    #[must_use]
    pub const fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Enables or disables upload checksums.
    #[must_use]
    pub const fn checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    /// Installs a parameter rewriting hook.
    #[must_use]
    pub fn params_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(OperationKind, &Entry, &mut Value) + Send + Sync + 'static,
    {
        self.params_hook = Some(Arc::new(hook));
        self
    }

    /// Key `entry` is written under, after suffix stripping.
    ///
    /// A strip that would leave an empty key or a key ending in `/` is not
    /// applied.
    #[must_use]
    pub fn target_key<'a>(&self, entry: &'a Entry) -> &'a str {
        let key = entry.key();
        self.strip_suffix
            .as_deref()
            .and_then(|suffix| key.strip_suffix(suffix))
            .filter(|stripped| !stripped.is_empty() && !stripped.ends_with('/'))
            .unwrap_or(key)
    }

    pub(crate) fn apply_hook(&self, kind: OperationKind, entry: &Entry, params: &mut Value) {
        if let Some(hook) = &self.params_hook {
            hook(kind, entry, params);
        }
    }
}
