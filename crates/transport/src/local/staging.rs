use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use engine::{IoResultExt, SyncError, SyncResult};
use tokio::fs::{self, File, OpenOptions};

static NEXT_STAGING_ID: AtomicU64 = AtomicU64::new(0);

/// Write target that only appears at its final path once committed.
///
/// Dropping an uncommitted file removes the staging copy.
pub(super) struct StagedFile {
    final_path: PathBuf,
    temp_path: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Creates parent directories of `destination` and opens a fresh staging file beside it.
    pub(super) async fn create(destination: &Path) -> SyncResult<(Self, File)> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.with_path(parent)?;
        }

        loop {
            let unique = NEXT_STAGING_ID.fetch_add(1, Ordering::Relaxed);
            let temp_path = staging_path(destination, unique);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
                .await
            {
                Ok(file) => {
                    return Ok((
                        Self {
                            final_path: destination.to_path_buf(),
                            temp_path,
                            committed: false,
                        },
                        file,
                    ));
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => return Err(SyncError::io(temp_path, error)),
            }
        }
    }

    /// Path of the staging file.
    pub(super) fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Renames the staging file over the destination.
    pub(super) async fn commit(mut self) -> SyncResult<()> {
        fs::rename(&self.temp_path, &self.final_path)
            .await
            .with_path(&self.final_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            // Best effort; the original failure is what the caller reports.
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

fn staging_path(destination: &Path, unique: u64) -> PathBuf {
    let name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.treesync.{}.{unique}", process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn commit_moves_staged_bytes_into_place() {
        let temp = tempfile::tempdir().expect("tempdir");
        let destination = temp.path().join("nested/dir/out.txt");

        let (staged, mut file) = StagedFile::create(&destination).await.expect("stage");
        file.write_all(b"payload").await.expect("write");
        file.flush().await.expect("flush");
        drop(file);
        staged.commit().await.expect("commit");

        assert_eq!(std::fs::read(&destination).expect("read"), b"payload");
        let leftovers = std::fs::read_dir(destination.parent().expect("parent"))
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn dropped_stage_leaves_nothing_behind() {
        let temp = tempfile::tempdir().expect("tempdir");
        let destination = temp.path().join("out.txt");

        let (staged, file) = StagedFile::create(&destination).await.expect("stage");
        drop(file);
        drop(staged);

        assert_eq!(std::fs::read_dir(temp.path()).expect("read dir").count(), 0);
    }
}
