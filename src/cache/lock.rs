//! Poison-tolerant lock acquisition for the in-memory document store.
//!
//! A panic in another thread poisons the lock but leaves the map itself
//! usable; for cached documents the worst case is one stale entry, so both
//! sides recover instead of propagating the poison.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn read_recovered<'a, T>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(target = "cache::store", op, "reading through poisoned lock");
        poisoned.into_inner()
    })
}

pub(crate) fn write_recovered<'a, T>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(target = "cache::store", op, "writing through poisoned lock");
        poisoned.into_inner()
    })
}
