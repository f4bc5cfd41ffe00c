//! Helpers shared by unit tests.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serializes tests that read or change the process-wide working directory.
pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Restores the working directory captured at construction when dropped.
pub(crate) struct CwdGuard {
    saved: PathBuf,
}

impl CwdGuard {
    pub(crate) fn new() -> Self {
        Self {
            saved: std::env::current_dir().expect("cwd"),
        }
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.saved);
    }
}
