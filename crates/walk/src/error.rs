use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Error returned when traversal fails.
#[derive(Debug)]
pub struct WalkError {
    kind: WalkErrorKind,
}

impl WalkError {
    pub(crate) fn new(kind: WalkErrorKind) -> Self {
        Self { kind }
    }

    pub(crate) fn root_metadata(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::RootMetadata { path, source })
    }

    pub(crate) fn read_dir(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::ReadDir { path, source })
    }

    pub(crate) fn read_dir_entry(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::ReadDirEntry { path, source })
    }

    pub(crate) fn metadata(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::Metadata { path, source })
    }

    pub(crate) fn canonicalize(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::Canonicalize { path, source })
    }

    /// Returns the specific failure that terminated traversal.
    #[must_use]
    pub const fn kind(&self) -> &WalkErrorKind {
        &self.kind
    }

    /// Returns the filesystem path associated with the error.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk::WalkBuilder;
    ///
    /// let error = WalkBuilder::new("./definitely_missing_root")
    ///     .build()
    ///     .err()
    ///     .expect("missing root yields error");
    /// assert!(error.path().ends_with("definitely_missing_root"));
    /// assert!(error.is_root_missing());
    /// ```
    #[must_use]
    pub fn path(&self) -> &Path {
        self.kind.path()
    }

    /// Returns the underlying I/O error.
    #[must_use]
    pub fn io_error(&self) -> &io::Error {
        self.kind.io_error()
    }

    /// Whether the traversal root itself does not exist.
    #[must_use]
    pub fn is_root_missing(&self) -> bool {
        matches!(
            &self.kind,
            WalkErrorKind::RootMetadata { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }

    /// Consumes the error, returning the path and the underlying I/O error.
    #[must_use]
    pub fn into_parts(self) -> (PathBuf, io::Error) {
        match self.kind {
            WalkErrorKind::RootMetadata { path, source }
            | WalkErrorKind::ReadDir { path, source }
            | WalkErrorKind::ReadDirEntry { path, source }
            | WalkErrorKind::Metadata { path, source }
            | WalkErrorKind::Canonicalize { path, source } => (path, source),
        }
    }
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WalkErrorKind::RootMetadata { path, source } => {
                write!(f, "failed to inspect root '{}': {}", path.display(), source)
            }
            WalkErrorKind::ReadDir { path, source } => {
                write!(f, "failed to read directory '{}': {}", path.display(), source)
            }
            WalkErrorKind::ReadDirEntry { path, source } => {
                write!(f, "failed to read entry in '{}': {}", path.display(), source)
            }
            WalkErrorKind::Metadata { path, source } => {
                write!(
                    f,
                    "failed to inspect metadata for '{}': {}",
                    path.display(),
                    source
                )
            }
            WalkErrorKind::Canonicalize { path, source } => {
                write!(f, "failed to canonicalize '{}': {}", path.display(), source)
            }
        }
    }
}

impl Error for WalkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.kind.io_error())
    }
}

/// Classification of traversal failures.
#[derive(Debug)]
pub enum WalkErrorKind {
    /// Failed to query metadata for the traversal root.
    RootMetadata {
        /// Root path.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to list a directory.
    ReadDir {
        /// Directory whose contents could not be read.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to obtain a directory entry during iteration.
    ReadDirEntry {
        /// Directory containing the problematic entry.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to retrieve metadata for an entry.
    Metadata {
        /// Path whose metadata could not be retrieved.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to canonicalize a directory while tracking visited links.
    Canonicalize {
        /// Directory path that failed to canonicalize.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

impl WalkErrorKind {
    /// Returns the filesystem path tied to the failure.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::RootMetadata { path, .. }
            | Self::ReadDir { path, .. }
            | Self::ReadDirEntry { path, .. }
            | Self::Metadata { path, .. }
            | Self::Canonicalize { path, .. } => path,
        }
    }

    fn io_error(&self) -> &io::Error {
        match self {
            Self::RootMetadata { source, .. }
            | Self::ReadDir { source, .. }
            | Self::ReadDirEntry { source, .. }
            | Self::Metadata { source, .. }
            | Self::Canonicalize { source, .. } => source,
        }
    }
}
