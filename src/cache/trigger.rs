//! Cache invalidation entry point for content mutations.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::SitemapCacheConfig;
use super::keys::Scope;
use super::store::DocumentCacheStore;

/// Invalidates cached sitemaps when content changes.
///
/// Every create, update, or delete of an inventory item drops both tiers for
/// every page of that item's type plus the index scope; the next read is
/// cold and repopulates lazily, or eagerly via the rebuild scheduler.
pub struct CacheTrigger {
    config: SitemapCacheConfig,
    store: Arc<dyn DocumentCacheStore>,
}

impl CacheTrigger {
    pub fn new(config: SitemapCacheConfig, store: Arc<dyn DocumentCacheStore>) -> Self {
        Self { config, store }
    }

    pub async fn content_changed(&self, content_type: &str) {
        if !self.config.enabled {
            debug!(
                target = "cache::trigger",
                content_type, "cache disabled, skipping invalidation"
            );
            return;
        }

        for scope in [
            Scope::ContentType(content_type.to_string()),
            Scope::Index,
        ] {
            if let Err(err) = self.store.delete_scope(&scope).await {
                // Worst case a reader sees one more stale copy; the tiers
                // stay consistent once a delete lands.
                warn!(
                    target = "cache::trigger",
                    scope = %scope,
                    error = %err,
                    "failed to invalidate cache scope"
                );
            }
        }

        info!(
            target = "cache::trigger",
            content_type, "invalidated sitemap cache"
        );
    }
}
