//! Cross-process save lock.
//!
//! The lock is an advisory exclusive lock on a sibling `<file>.lock` that is
//! held only for the duration of one save. Dropping the guard closes the
//! handle and releases the lock on every exit path.

use crate::error::{PrefsError, PrefsResult};
use fs4::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Shared flag that aborts a save waiting for the lock.
///
/// Setting the flag makes the next wait fail with
/// [`PrefsError::Interrupted`]. The flag stays set until [`clear`](Self::clear)
/// is called.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Held exclusive lock on a lock file.
#[derive(Debug)]
pub struct SaveLock {
    file: File,
    path: PathBuf,
}

impl SaveLock {
    /// Acquire the lock, retrying every `retry_delay` until `timeout` elapses.
    pub fn acquire(
        path: &Path,
        timeout: Duration,
        retry_delay: Duration,
        interrupt: &InterruptFlag,
    ) -> PrefsResult<SaveLock> {
        trace!("Acquiring exclusive lock on {}", path.display());
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| PrefsError::io(path, e))?;

        let started = Instant::now();
        let mut retries = 0u32;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    trace!("Lock acquired after {} retries", retries);
                    return Ok(SaveLock {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if is_contended(&err) => {}
                Err(err) => return Err(PrefsError::io(path, err)),
            }

            if interrupt.is_interrupted() {
                debug!("Interrupted while waiting for lock on {}", path.display());
                return Err(PrefsError::Interrupted {
                    path: path.to_path_buf(),
                });
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(
                    "Failed to acquire file lock on {} within {} ms timeout after {} retries",
                    path.display(),
                    timeout.as_millis(),
                    retries
                );
                return Err(PrefsError::LockTimeout {
                    path: path.to_path_buf(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            thread::sleep(retry_delay.min(timeout - elapsed));
            retries += 1;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SaveLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    #[cfg(windows)]
    {
        const ERROR_LOCK_VIOLATION: i32 = 33;
        if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION) {
            return true;
        }
    }
    false
}
