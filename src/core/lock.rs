//! core::lock
//!
//! Exclusive publish lock for a working tree.
//!
//! # Architecture
//!
//! The remote branch pointer is force-moved without checking that the tip
//! read at the start of the run is still current. Two runs publishing from
//! the same repository at once would race on that pointer, so a run holds
//! this lock from before the first remote call until it exits.
//!
//! The lock only serializes runs that share a `.git` directory. Runs from
//! different machines or clones are not covered and must be serialized by
//! whoever schedules them.
//!
//! # Storage
//!
//! - `<git_dir>/gitsnap/publish.lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::core::lock::PublishLock;
//!
//! let lock = PublishLock::acquire(git.git_dir())?;
//! // ... publish ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Directory under the git dir holding gitsnap state.
const STATE_DIR: &str = "gitsnap";

/// Lock file name.
const LOCK_FILE: &str = "publish.lock";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("another gitsnap run is publishing from this repository")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive publish lock.
///
/// Released when dropped, even if the run panics.
#[derive(Debug)]
pub struct PublishLock {
    path: PathBuf,
    file: Option<File>,
}

impl PublishLock {
    /// Attempt to acquire the publish lock for the repository whose git
    /// directory is `git_dir`.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(git_dir: &Path) -> Result<Self, LockError> {
        let dir = git_dir.join(STATE_DIR);
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PublishLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_lock_file() {
        let temp = TempDir::new().unwrap();

        let lock = PublishLock::acquire(temp.path()).expect("acquire lock");

        assert!(lock.is_held());
        assert!(lock.path().exists());
        assert_eq!(lock.path(), temp.path().join("gitsnap/publish.lock"));
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let temp = TempDir::new().unwrap();

        let _first = PublishLock::acquire(temp.path()).expect("acquire lock");
        let second = PublishLock::acquire(temp.path());

        assert!(matches!(second, Err(LockError::AlreadyLocked)));
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().unwrap();

        {
            let _lock = PublishLock::acquire(temp.path()).expect("acquire lock");
        }

        let again = PublishLock::acquire(temp.path());
        assert!(again.is_ok());
    }
}
