//! Sitemap cache configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 900;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SitemapCacheConfig {
    /// Enable the two-tier cache. When disabled every read regenerates the
    /// document synchronously.
    pub enabled: bool,
    /// Lifetime of the fresh tier.
    pub ttl_seconds: u64,
}

impl Default for SitemapCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl SitemapCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.max(1))
    }
}
