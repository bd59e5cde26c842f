//! Advisory per-workspace lock

use std::fs::{File, OpenOptions};

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Exclusive advisory lock on a lock file inside a workspace's git directory.
///
/// Held for the lifetime of a synchronizer so that two synchronizers, in this
/// process or another, never mutate the same working tree. The lock is
/// released when the value is dropped.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: NormalizedPath,
    file: File,
}

impl WorkspaceLock {
    /// Try to acquire the lock without blocking.
    ///
    /// Creates the lock file (and its parent directory) if needed.
    pub fn acquire(path: NormalizedPath) -> Result<Self> {
        let native = path.to_native();
        if let Some(parent) = native.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&native)
            .map_err(|e| Error::io(&native, e))?;

        file.try_lock_exclusive()
            .map_err(|_| Error::LockFailed { path: native.clone() })?;

        tracing::debug!(path = %path, "Acquired workspace lock");
        Ok(Self { path, file })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(path = %self.path, error = %e, "Failed to release workspace lock");
        }
    }
}
