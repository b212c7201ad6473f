//! The cached sitemap read path: cold, fresh, and stale-while-revalidate.

use std::sync::Arc;

use metrics::{counter, histogram};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::sitemap::{SitemapDocument, SitemapError, SitemapService};

use super::config::SitemapCacheConfig;
use super::keys::{Scope, SitemapKey};
use super::scheduler::InFlightRebuilds;
use super::store::{CachedDocument, DocumentCacheStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedTier {
    Fresh,
    Stale,
}

#[derive(Debug, Clone)]
pub struct ServedDocument {
    pub document: CachedDocument,
    pub tier: ServedTier,
}

/// Serves sitemap documents through the two-tier cache.
///
/// Reads never block on regeneration once a stale copy exists: the stale
/// document is returned immediately and a rebuild runs out-of-band. Only a
/// fully cold key pays the generation cost inline.
#[derive(Clone)]
pub struct CachedSitemaps {
    config: SitemapCacheConfig,
    store: Arc<dyn DocumentCacheStore>,
    generator: Arc<SitemapService>,
    inflight: InFlightRebuilds,
}

impl CachedSitemaps {
    pub fn new(
        config: SitemapCacheConfig,
        store: Arc<dyn DocumentCacheStore>,
        generator: Arc<SitemapService>,
    ) -> Self {
        Self {
            config,
            store,
            generator,
            inflight: InFlightRebuilds::new(),
        }
    }

    /// Read one document, `None` meaning not-found (unknown or excluded
    /// type, or a page with no eligible items).
    pub async fn read(&self, key: &SitemapKey) -> Result<Option<ServedDocument>, SitemapError> {
        if !self.config.enabled {
            let document = self.generate(key).await?;
            return Ok(document.map(|document| ServedDocument {
                document: materialize(document),
                tier: ServedTier::Fresh,
            }));
        }

        match self.store.get_fresh(key).await {
            Ok(Some(document)) => {
                counter!("rotta_sitemap_cache_fresh_hit_total").increment(1);
                return Ok(Some(ServedDocument {
                    document,
                    tier: ServedTier::Fresh,
                }));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target = "cache::service",
                    key = %key,
                    error = %err,
                    "fresh tier read failed, treating as miss"
                );
            }
        }

        match self.store.get_stale(key).await {
            Ok(Some(document)) => {
                counter!("rotta_sitemap_cache_stale_hit_total").increment(1);
                self.schedule_rebuild(key.clone());
                return Ok(Some(ServedDocument {
                    document,
                    tier: ServedTier::Stale,
                }));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target = "cache::service",
                    key = %key,
                    error = %err,
                    "stale tier read failed, treating as miss"
                );
            }
        }

        counter!("rotta_sitemap_cache_miss_total").increment(1);
        let Some(generated) = self.generate(key).await? else {
            return Ok(None);
        };
        let document = materialize(generated);
        if let Err(err) = self.store.put_both(key, &document, self.config.ttl()).await {
            // Serving beats bookkeeping; the next read regenerates.
            warn!(
                target = "cache::service",
                key = %key,
                error = %err,
                "failed to populate cache tiers"
            );
        }
        Ok(Some(ServedDocument {
            document,
            tier: ServedTier::Fresh,
        }))
    }

    /// Enqueue a background rebuild unless one is already pending for the
    /// key. Fire-and-forget: the scheduling read never awaits the job.
    fn schedule_rebuild(&self, key: SitemapKey) {
        let guard = match self.inflight.acquire(key.clone()) {
            Ok(guard) => guard,
            Err(_) => {
                debug!(
                    target = "cache::service",
                    key = %key,
                    "rebuild already pending"
                );
                return;
            }
        };

        let service = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            service.rebuild(&key).await;
        });
    }

    async fn rebuild(&self, key: &SitemapKey) {
        counter!("rotta_sitemap_rebuild_total").increment(1);
        match self.generate(key).await {
            Ok(Some(generated)) => {
                let document = materialize(generated);
                match self.store.put_both(key, &document, self.config.ttl()).await {
                    Ok(()) => info!(
                        target = "cache::service",
                        key = %key,
                        "background rebuild refreshed both tiers"
                    ),
                    Err(err) => warn!(
                        target = "cache::service",
                        key = %key,
                        error = %err,
                        "background rebuild failed to write tiers"
                    ),
                }
            }
            Ok(None) => {
                // The scope emptied out since the stale copy was written.
                if let Err(err) = self.store.delete_key(key).await {
                    warn!(
                        target = "cache::service",
                        key = %key,
                        error = %err,
                        "failed to drop tiers for emptied key"
                    );
                }
            }
            Err(err) => {
                warn!(
                    target = "cache::service",
                    key = %key,
                    error = %err,
                    "background rebuild failed, stale tier retained"
                );
            }
        }
    }

    async fn generate(&self, key: &SitemapKey) -> Result<Option<SitemapDocument>, SitemapError> {
        let started = std::time::Instant::now();
        let result = match &key.scope {
            Scope::Index => {
                if key.page != 1 {
                    return Ok(None);
                }
                self.generator.generate_index().await.map(Some)
            }
            Scope::ContentType(content_type) => {
                self.generator.generate_page(content_type, key.page).await
            }
        };
        histogram!("rotta_sitemap_generate_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

fn materialize(document: SitemapDocument) -> CachedDocument {
    CachedDocument {
        xml: document.xml,
        last_modified: document.last_modified,
        generated_at: OffsetDateTime::now_utc(),
    }
}
