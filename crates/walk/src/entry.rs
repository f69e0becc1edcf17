use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One filesystem object found below the traversal root.
#[derive(Debug)]
pub struct WalkEntry {
    pub(crate) full_path: PathBuf,
    pub(crate) key: String,
    pub(crate) metadata: fs::Metadata,
    pub(crate) depth: usize,
    pub(crate) lossy: bool,
}

impl WalkEntry {
    /// Absolute path of the entry.
    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Path relative to the root, with `/` separators on every platform.
    ///
    /// Names that are not valid UTF-8 are converted lossily; see
    /// [`is_lossy`](Self::is_lossy).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether [`key`](Self::key) was built from a name that is not valid
    /// UTF-8, here or in a parent directory. Such a key does not map back to
    /// the path it came from.
    #[must_use]
    pub const fn is_lossy(&self) -> bool {
        self.lossy
    }

    /// Metadata captured when the entry was visited.
    #[must_use]
    pub fn metadata(&self) -> &fs::Metadata {
        &self.metadata
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }

    /// Whether the entry is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.metadata.is_file()
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.metadata.len()
    }

    /// Whether the entry has zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.len() == 0
    }

    /// Last modification time, when the platform reports one.
    #[must_use]
    pub fn modified(&self) -> Option<SystemTime> {
        self.metadata.modified().ok()
    }

    /// Depth below the root; direct children of the root have depth `1`.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}
