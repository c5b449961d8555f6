use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Acquire a shared guard on a local cache table, recovering from poisoning.
///
/// Entries are disposable, so a table poisoned by a panicking writer keeps
/// serving.
pub(crate) fn read_table<'a, T>(
    lock: &'a RwLock<T>,
    table: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(
            table,
            op,
            lock_kind = "rwlock.read",
            result = "poisoned_recovered",
            "Recovered from poisoned local cache lock"
        );
        poisoned.into_inner()
    })
}

/// Acquire an exclusive guard on a local cache table, recovering from poisoning.
pub(crate) fn write_table<'a, T>(
    lock: &'a RwLock<T>,
    table: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(
            table,
            op,
            lock_kind = "rwlock.write",
            result = "poisoned_recovered",
            "Recovered from poisoned local cache lock"
        );
        poisoned.into_inner()
    })
}
