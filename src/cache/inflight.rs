//! Per-key miss coalescing.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::keys::CacheKey;

/// Registry of per-key locks held while a miss is being filled.
#[derive(Default, Clone)]
pub struct KeyLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task is filling `key`, then claim it.
    ///
    /// [`KeyGuard::waited`] tells whether another holder had to finish first.
    pub async fn acquire(&self, key: &CacheKey) -> KeyGuard {
        let lock = self
            .locks
            .entry(key.as_str().to_string())
            .or_default()
            .value()
            .clone();
        let (guard, waited) = match Arc::clone(&lock).try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => (lock.lock_owned().await, true),
        };
        KeyGuard {
            key: key.as_str().to_string(),
            locks: Arc::clone(&self.locks),
            waited,
            _guard: guard,
        }
    }

    /// Keys with a fill in progress or waiters queued.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct KeyGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    waited: bool,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    /// Whether the claim queued behind another holder of the same key.
    pub fn waited(&self) -> bool {
        self.waited
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // One reference is the registry's, one is held by `_guard`; anything
        // beyond that is a waiter that still needs the entry.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}
