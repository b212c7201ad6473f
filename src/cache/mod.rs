//! Two-tier sitemap document cache.
//!
//! Every cache key holds up to two copies of a rendered sitemap:
//!
//! - **fresh**: TTL-bound; served directly while it lasts
//! - **stale**: durable; served immediately after the fresh copy expires
//!   while a background rebuild recomputes both tiers
//!
//! Content mutations invalidate both tiers for every page of the affected
//! type plus the index. Rebuild jobs are idempotent and deduplicated with an
//! in-flight key set, so duplicate scheduling under races is harmless.
//!
//! ## Configuration
//!
//! ```toml
//! [sitemap]
//! cache_enabled = true
//! cache_ttl_seconds = 900
//! ```

mod config;
mod keys;
mod lock;
mod scheduler;
mod service;
mod store;
mod trigger;

pub use config::SitemapCacheConfig;
pub use keys::{Scope, SitemapKey};
pub use scheduler::{AlreadyScheduled, InFlightRebuilds, RebuildGuard};
pub use service::{CachedSitemaps, ServedDocument, ServedTier};
pub use store::{CachedDocument, DocumentCacheStore, MemoryDocumentStore};
pub use trigger::CacheTrigger;
