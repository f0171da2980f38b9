use std::io;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::time::Duration;
use switchyard_fs::FileLock;
use thiserror::Error as ThisError;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, ThisError)]
pub enum LockError {
    #[error("timed out after {0:?} waiting for the switch lock")]
    Timeout(Duration),

    #[error("switch lock file error: {0}")]
    Io(#[from] io::Error),
}

impl From<LockError> for io::Error {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout(_) => io::Error::new(io::ErrorKind::TimedOut, err.to_string()),
            LockError::Io(e) => e,
        }
    }
}

/// Process-local async mutex plus a machine-wide advisory file lock.
///
/// The local mutex owns `T`, so whatever it guards can only be touched while
/// both locks are held. The local mutex is taken first; the blocking `flock`
/// then runs on tokio's blocking pool so the async scheduler never stalls.
#[derive(Debug)]
pub struct DualLock<T> {
    local: Mutex<T>,
    lock_path: PathBuf,
    timeout: Option<Duration>,
}

impl<T> DualLock<T> {
    pub fn new(value: T, lock_path: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            local: Mutex::new(value),
            lock_path,
            timeout,
        }
    }

    /// Wait for both locks. With a timeout configured, the whole acquisition is
    /// bounded; a file lock granted after the deadline is dropped (and thereby
    /// released) by the blocking task that obtained it.
    pub async fn acquire(&self) -> Result<DualLockGuard<'_, T>, LockError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.acquire_unbounded())
                .await
                .map_err(|_| LockError::Timeout(limit))?,
            None => self.acquire_unbounded().await,
        }
    }

    async fn acquire_unbounded(&self) -> Result<DualLockGuard<'_, T>, LockError> {
        let local = self.local.lock().await;

        let path = self.lock_path.clone();
        let file = tokio::task::spawn_blocking(move || FileLock::acquire_blocking(&path))
            .await
            .map_err(io::Error::other)??;

        Ok(DualLockGuard {
            file: Some(file),
            local,
        })
    }
}

/// Both locks held. Dropping releases the file lock first, then the local mutex.
#[derive(Debug)]
pub struct DualLockGuard<'a, T> {
    file: Option<FileLock>,
    local: MutexGuard<'a, T>,
}

impl<T> Deref for DualLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.local
    }
}

impl<T> DerefMut for DualLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.local
    }
}

impl<T> Drop for DualLockGuard<'_, T> {
    fn drop(&mut self) {
        // `local` is released by field drop glue right after this.
        drop(self.file.take());
    }
}
