use crate::error::WalkError;
use crate::walker::Walker;
use std::path::PathBuf;

/// Configures a traversal rooted at a specific directory.
#[derive(Clone, Debug)]
pub struct WalkBuilder {
    root: PathBuf,
    follow_symlinks: bool,
}

impl WalkBuilder {
    /// Creates a new builder that will traverse the provided root path.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
        }
    }

    /// Configures whether symbolic links are resolved.
    ///
    /// When enabled, a link is reported with the metadata of its target and
    /// links to directories are descended into. Canonical directory paths are
    /// tracked so a link back to an ancestor is visited only once.
    #[must_use]
    pub const fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Builds a [`Walker`], failing if the root cannot be inspected.
    pub fn build(self) -> Result<Walker, WalkError> {
        Walker::new(self.root, self.follow_symlinks)
    }
}
