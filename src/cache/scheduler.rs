//! In-flight rebuild tracking.
//!
//! Deduplicates background rebuild scheduling without a distributed lock:
//! the rebuild job itself is idempotent, so a duplicate that slips through a
//! race is harmless, and the common case is suppressed by a process-local
//! key set.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use super::keys::SitemapKey;

/// Tracks cache keys that currently have an in-flight rebuild task.
#[derive(Default, Clone)]
pub struct InFlightRebuilds {
    keys: Arc<DashMap<SitemapKey, ()>>,
}

#[derive(Debug, Error)]
pub enum AlreadyScheduled {
    #[error("rebuild already in flight for sitemap key {key}")]
    InFlight { key: SitemapKey },
}

impl InFlightRebuilds {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(DashMap::new()),
        }
    }

    /// Claim a key for rebuilding. The returned guard releases the claim on
    /// drop, whether the rebuild succeeds or panics out of the task.
    pub fn acquire(&self, key: SitemapKey) -> Result<RebuildGuard, AlreadyScheduled> {
        use dashmap::mapref::entry::Entry;

        match self.keys.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(RebuildGuard {
                    key,
                    keys: Arc::clone(&self.keys),
                })
            }
            Entry::Occupied(_) => Err(AlreadyScheduled::InFlight { key }),
        }
    }
}

pub struct RebuildGuard {
    key: SitemapKey,
    keys: Arc<DashMap<SitemapKey, ()>>,
}

impl Drop for RebuildGuard {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}
