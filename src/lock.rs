use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Holds an exclusive advisory lock on the pid file, preventing two
/// processes from running the archive pass against the same store at once.
/// The lock is released when the guard is dropped.
pub struct InstanceLock {
    _file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for InstanceLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceLock").field("path", &self.path).finish()
    }
}

/// Try to take the instance lock without blocking. Fails with
/// [`Error::Locked`] when another process already holds it.
pub fn try_lock(path: &Path) -> Result<InstanceLock> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            debug!("acquired instance lock: {}", path.display());
            Ok(InstanceLock {
                _file: file,
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            Err(Error::Locked(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_and_relock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("instance.pid");

        let guard = try_lock(&path).unwrap();
        assert!(guard.path().exists());
        drop(guard);

        // Released on drop, so a second acquisition succeeds.
        let _guard = try_lock(&path).unwrap();
    }
}
