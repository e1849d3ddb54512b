//! Advisory lock over a store root.
//!
//! The lock is an OS file lock (`flock(2)` on Unix, `LockFileEx` on
//! Windows) taken through [`fs2::FileExt`].  On Unix the store root
//! directory itself is locked, so the store needs no extra file.  Other
//! platforms cannot open a directory as a file and lock a
//! `.passvault.lock` file inside the root instead; the tree scan skips
//! it like any other dot-name.  Either way the OS drops the lock when
//! the process dies, so a crash never leaves the store locked.
//!
//! Acquisition polls for at most `timeout` and then gives up with
//! [`PassVaultError::LockContention`].  The lock is released when the
//! [`StoreLock`] guard is dropped, on every exit path.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use log::{debug, warn};

use crate::errors::{PassVaultError, Result};

/// Delay between two acquisition attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Lock file used where the root directory cannot be locked directly.
#[cfg(not(unix))]
const LOCK_FILE: &str = ".passvault.lock";

/// Kind of lock to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers: any number may hold it together.
    Shared,
    /// Writers: excludes every other holder.
    Exclusive,
}

/// RAII guard for a held store lock.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl StoreLock {
    /// Lock the store at `root`, waiting at most `timeout`.
    pub fn acquire(root: &Path, mode: LockMode, timeout: Duration) -> Result<Self> {
        let (file, path) = open_lock_target(root)?;
        let deadline = Instant::now() + timeout;
        loop {
            if try_lock(&file, mode)? {
                debug!("acquired {mode:?} lock on {}", path.display());
                return Ok(Self { file, path, mode });
            }
            if Instant::now() >= deadline {
                return Err(PassVaultError::LockContention(root.to_path_buf()));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Called through the trait: newer std has an inherent `File::unlock`.
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("could not unlock {}: {e}", self.path.display());
        }
        debug!("released {:?} lock on {}", self.mode, self.path.display());
    }
}

#[cfg(unix)]
fn open_lock_target(root: &Path) -> Result<(File, PathBuf)> {
    Ok((File::open(root)?, root.to_path_buf()))
}

#[cfg(not(unix))]
fn open_lock_target(root: &Path) -> Result<(File, PathBuf)> {
    use std::fs::OpenOptions;

    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )
        .into());
    }
    let path = root.join(LOCK_FILE);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    Ok((file, path))
}

/// One non-blocking attempt.  `Ok(false)` means someone else holds it.
fn try_lock(file: &File, mode: LockMode) -> Result<bool> {
    let attempt = match mode {
        LockMode::Shared => FileExt::try_lock_shared(file),
        LockMode::Exclusive => FileExt::try_lock_exclusive(file),
    };
    match attempt {
        Ok(()) => Ok(true),
        Err(e) if is_contended(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn is_contended(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    ) || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHORT: Duration = Duration::from_millis(100);

    #[test]
    fn exclusive_lock_blocks_second_exclusive() {
        let dir = TempDir::new().unwrap();
        let _held = StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT).unwrap();

        let err = StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT).unwrap_err();
        assert!(matches!(err, PassVaultError::LockContention(_)));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        {
            let _held = StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT).unwrap();
        }
        assert!(StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT).is_ok());
    }

    #[test]
    fn shared_locks_coexist_but_exclude_writers() {
        let dir = TempDir::new().unwrap();
        let a = StoreLock::acquire(dir.path(), LockMode::Shared, SHORT).unwrap();
        let b = StoreLock::acquire(dir.path(), LockMode::Shared, SHORT).unwrap();
        assert_eq!(a.mode(), LockMode::Shared);
        assert_eq!(b.mode(), LockMode::Shared);

        assert!(matches!(
            StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT),
            Err(PassVaultError::LockContention(_))
        ));
    }

    #[test]
    fn waiter_gets_lock_once_holder_releases() {
        let dir = TempDir::new().unwrap();
        let held = StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT).unwrap();

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(held);
        });

        let lock = StoreLock::acquire(dir.path(), LockMode::Exclusive, Duration::from_secs(5));
        releaser.join().unwrap();
        assert!(lock.is_ok());
    }

    #[test]
    fn leftover_lock_file_does_not_block() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".passvault.lock"), b"").unwrap();

        let held = StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT).unwrap();
        drop(held);
        assert!(StoreLock::acquire(dir.path(), LockMode::Exclusive, SHORT).is_ok());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = StoreLock::acquire(&dir.path().join("nope"), LockMode::Shared, SHORT);
        assert!(matches!(err, Err(PassVaultError::Io(_))));
    }
}
