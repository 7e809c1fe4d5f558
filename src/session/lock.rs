//! Session-scoped insert lock.
//!
//! Raised while the session applies an engine reply to the document, so that
//! change notifications caused by its own edits are not mistaken for typing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag; clones observe the same lock.
#[derive(Debug, Clone, Default)]
pub struct InsertLock {
    held: Arc<AtomicBool>,
}

impl InsertLock {
    /// Unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the lock until the returned guard is dropped.
    #[must_use]
    pub fn acquire(&self) -> InsertLockGuard {
        self.held.store(true, Ordering::SeqCst);
        InsertLockGuard {
            held: Arc::clone(&self.held),
        }
    }

    /// Whether a reply is being applied right now.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

/// Releases the [`InsertLock`] on drop, on every exit path.
#[derive(Debug)]
pub struct InsertLockGuard {
    held: Arc<AtomicBool>,
}

impl Drop for InsertLockGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::SeqCst);
    }
}
