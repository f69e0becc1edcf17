use crate::entry::WalkEntry;
use crate::error::WalkError;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::vec;
use tracing::{debug, trace};

/// Depth-first iterator over the entries below a root directory.
///
/// The root itself is never yielded. After the first error the iterator
/// is exhausted.
pub struct Walker {
    root: PathBuf,
    follow_symlinks: bool,
    stack: Vec<DirectoryState>,
    pending: Option<PendingDirectory>,
    finished: bool,
}

struct PendingDirectory {
    fs_path: PathBuf,
    key: String,
    depth: usize,
    lossy: bool,
}

impl Walker {
    pub(crate) fn new(root: PathBuf, follow_symlinks: bool) -> Result<Self, WalkError> {
        let root = absolutize(root)?;
        debug!(target: "treesync::walk", root = %root.display(), follow_symlinks, "walking tree");

        fs::metadata(&root).map_err(|error| WalkError::root_metadata(root.clone(), error))?;

        let mut walker = Self {
            root,
            follow_symlinks,
            stack: Vec::new(),
            pending: None,
            finished: false,
        };
        walker.push_directory(PendingDirectory {
            fs_path: walker.root.clone(),
            key: String::new(),
            depth: 0,
            lossy: false,
        })?;
        Ok(walker)
    }

    /// Root directory of the traversal, made absolute.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Prunes the directory yielded by the last call to `next`.
    ///
    /// Has no effect when the last entry was not a directory.
    pub fn skip_current_dir(&mut self) {
        if let Some(pending) = self.pending.take() {
            trace!(target: "treesync::walk", key = %pending.key, "pruned directory");
        }
    }

    fn push_directory(&mut self, directory: PendingDirectory) -> Result<(), WalkError> {
        // Only a directory that is its own ancestor is skipped, so two links
        // to the same directory are both descended.
        let canonical = if self.follow_symlinks {
            let canonical = fs::canonicalize(&directory.fs_path)
                .map_err(|error| WalkError::canonicalize(directory.fs_path.clone(), error))?;
            if self
                .stack
                .iter()
                .any(|ancestor| ancestor.canonical.as_ref() == Some(&canonical))
            {
                let path = directory.fs_path.display();
                trace!(target: "treesync::walk", path = %path, "symlink cycle");
                return Ok(());
            }
            Some(canonical)
        } else {
            None
        };

        let state = DirectoryState::new(directory, canonical)?;
        self.stack.push(state);
        Ok(())
    }

    fn prepare_entry(
        &mut self,
        full_path: PathBuf,
        key: String,
        depth: usize,
        lossy: bool,
    ) -> Result<WalkEntry, WalkError> {
        let mut metadata = fs::symlink_metadata(&full_path)
            .map_err(|error| WalkError::metadata(full_path.clone(), error))?;

        if metadata.file_type().is_symlink() && self.follow_symlinks {
            match fs::metadata(&full_path) {
                Ok(target) => metadata = target,
                Err(error) => {
                    trace!(target: "treesync::walk", key = %key, %error, "dangling link");
                }
            }
        }

        if metadata.is_dir() {
            self.pending = Some(PendingDirectory {
                fs_path: full_path.clone(),
                key: key.clone(),
                depth,
                lossy,
            });
        }

        Ok(WalkEntry {
            full_path,
            key,
            metadata,
            depth,
            lossy,
        })
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if let Some(directory) = self.pending.take() {
            if let Err(error) = self.push_directory(directory) {
                self.finished = true;
                return Some(Err(error));
            }
        }

        loop {
            let state = self.stack.last_mut()?;
            let Some(name) = state.next_name() else {
                self.stack.pop();
                continue;
            };
            let full_path = state.fs_path.join(&name);
            let (key, lossy) = state.child_key(&name);
            let depth = state.depth + 1;

            return match self.prepare_entry(full_path, key, depth, lossy) {
                Ok(entry) => Some(Ok(entry)),
                Err(error) => {
                    self.finished = true;
                    Some(Err(error))
                }
            };
        }
    }
}

struct DirectoryState {
    fs_path: PathBuf,
    canonical: Option<PathBuf>,
    key: String,
    entries: vec::IntoIter<OsString>,
    depth: usize,
    lossy: bool,
}

impl DirectoryState {
    fn new(directory: PendingDirectory, canonical: Option<PathBuf>) -> Result<Self, WalkError> {
        let PendingDirectory {
            fs_path,
            key,
            depth,
            lossy,
        } = directory;
        let read_dir =
            fs::read_dir(&fs_path).map_err(|error| WalkError::read_dir(fs_path.clone(), error))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|error| WalkError::read_dir_entry(fs_path.clone(), error))?;
            entries.push(entry.file_name());
        }
        entries.sort();

        let count = entries.len();
        trace!(target: "treesync::walk", path = %fs_path.display(), count, "read directory");

        Ok(Self {
            fs_path,
            canonical,
            key,
            entries: entries.into_iter(),
            depth,
            lossy,
        })
    }

    fn next_name(&mut self) -> Option<OsString> {
        self.entries.next()
    }

    /// Key of `name` below this directory, and whether any component of it
    /// had to be converted lossily.
    fn child_key(&self, name: &OsString) -> (String, bool) {
        let lossy = self.lossy || name.to_str().is_none();
        let name = name.to_string_lossy();
        let key = if self.key.is_empty() {
            name.into_owned()
        } else {
            format!("{}/{name}", self.key)
        };
        (key, lossy)
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf, WalkError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = env::current_dir()
            .map_err(|error| WalkError::canonicalize(PathBuf::from("."), error))?;
        Ok(cwd.join(path))
    }
}
