//! Advisory file lock guarding multi-file writes.
//!
//! A batch commit touches several record files plus the index. The lock keeps
//! two processes (for example the server and a CLI invocation) from
//! interleaving those writes.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt as Fs4FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Holds the lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = Fs4FileExt::unlock(&self.file);
    }
}

/// Acquires exclusive advisory locks with a bounded wait.
///
/// # Examples
///
/// ```no_run
/// use campusfix::storage::FileLocker;
/// use std::path::Path;
/// use std::time::Duration;
///
/// let locker = FileLocker::new(Duration::from_secs(5));
/// let guard = locker.lock_exclusive(Path::new(".campusfix/data/.write.lock")).unwrap();
/// // ... write records ...
/// drop(guard);
/// ```
#[derive(Debug, Clone)]
pub struct FileLocker {
    timeout: Duration,
}

impl Default for FileLocker {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl FileLocker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Block until the lock is held or the timeout expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be opened or the lock is still
    /// held elsewhere after the timeout.
    pub fn lock_exclusive(&self, path: &Path) -> Result<LockGuard> {
        let file = open_or_create(path)?;
        let start = Instant::now();

        loop {
            match Fs4FileExt::try_lock_exclusive(&file) {
                Ok(true) => {
                    return Ok(LockGuard {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Ok(false) => {
                    if start.elapsed() >= self.timeout {
                        anyhow::bail!(
                            "Lock timeout: could not acquire exclusive lock on {} after {:?}",
                            path.display(),
                            self.timeout
                        );
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    anyhow::bail!("IO error while trying to lock {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Take the lock only if it is free right now.
    pub fn try_lock_exclusive(&self, path: &Path) -> Result<Option<LockGuard>> {
        let file = open_or_create(path)?;
        match Fs4FileExt::try_lock_exclusive(&file) {
            Ok(true) => Ok(Some(LockGuard {
                file,
                path: path.to_path_buf(),
            })),
            Ok(false) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn open_or_create(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open file for locking: {}", path.display()))
}
