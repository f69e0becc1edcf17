//! Error type shared by the listing, planning and execution stages.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while listing, planning or executing a sync.
///
/// Provider failures travel through the engine unchanged: the planner and the
/// runner never wrap them in additional context and never retry.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Listing or execution was invoked with an empty work list.
    #[error("Nothing to do")]
    NothingToDo,

    /// A provider was asked to enumerate without a configured root.
    #[error("Missing root")]
    RootMissing,

    /// The configured root does not exist.
    #[error("{root} not found")]
    RootNotFound {
        /// Root location that could not be found.
        root: String,
    },

    /// The default comparator needed a content hash the provider cannot produce.
    #[error("Missing ETag for {key}")]
    MissingHash {
        /// Key of the entry without a hash.
        key: String,
    },

    /// The provider that enumerated an entry has been dropped.
    #[error("provider for {key} is no longer available")]
    ProviderGone {
        /// Key of the orphaned entry.
        key: String,
    },

    /// I/O error raised by a provider.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Backend-specific failure reported by a provider.
    #[error(transparent)]
    Provider(Box<dyn StdError + Send + Sync>),

    /// A runner task panicked or the runtime refused to admit it.
    #[error("task runtime failure: {0}")]
    Runtime(String),
}

impl SyncError {
    /// Creates an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps a backend-specific error.
    pub fn provider<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Provider(Box::new(error))
    }

    /// Returns `true` when the error is the empty-input usage guard.
    #[must_use]
    pub const fn is_nothing_to_do(&self) -> bool {
        matches!(self, Self::NothingToDo)
    }
}

/// Extension trait for mapping I/O results to [`SyncError`] with path context.
pub trait IoResultExt<T> {
    /// Maps an I/O error to [`SyncError::Io`] with the given path.
    fn with_path(self, path: impl Into<PathBuf>) -> SyncResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> SyncResult<T> {
        self.map_err(|e| SyncError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display_includes_path() {
        let error = SyncError::io(
            "/path/to/file",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        let display = format!("{error}");
        assert!(display.contains("/path/to/file"));
        assert!(display.contains("not found"));
    }

    #[test]
    fn root_not_found_names_root() {
        let error = SyncError::RootNotFound {
            root: "./public".to_owned(),
        };
        assert_eq!(error.to_string(), "./public not found");
    }

    #[test]
    fn provider_error_is_transparent() {
        let inner = io::Error::other("bucket unreachable");
        let error = SyncError::provider(inner);
        assert_eq!(error.to_string(), "bucket unreachable");
    }

    #[test]
    fn nothing_to_do_is_detected() {
        assert!(SyncError::NothingToDo.is_nothing_to_do());
        assert!(!SyncError::RootMissing.is_nothing_to_do());
    }

    #[test]
    fn with_path_maps_io_errors() {
        let result: io::Result<()> = Err(io::Error::other("boom"));
        let error = result.with_path("/tmp/x").unwrap_err();
        assert!(matches!(error, SyncError::Io { .. }));
    }
}
