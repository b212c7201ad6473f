//! Cache storage: the two-tier document store contract and an in-memory
//! implementation.
//!
//! Production deployments use the Postgres-backed store so cached documents
//! survive restarts and are shared by every request worker; the in-memory
//! store backs tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::RepoError;

use super::keys::{Scope, SitemapKey};
use super::lock::{read_recovered, write_recovered};

/// A rendered sitemap as held by either cache tier.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub xml: String,
    /// Most recently modified eligible item at generation time; drives the
    /// Last-Modified response header.
    pub last_modified: Option<OffsetDateTime>,
    pub generated_at: OffsetDateTime,
}

#[async_trait]
pub trait DocumentCacheStore: Send + Sync {
    /// The fresh tier entry, absent once its TTL has lapsed.
    async fn get_fresh(&self, key: &SitemapKey) -> Result<Option<CachedDocument>, RepoError>;

    /// The durable stale tier entry.
    async fn get_stale(&self, key: &SitemapKey) -> Result<Option<CachedDocument>, RepoError>;

    /// Rewrite both tiers with a newly generated document.
    async fn put_both(
        &self,
        key: &SitemapKey,
        document: &CachedDocument,
        ttl: Duration,
    ) -> Result<(), RepoError>;

    /// Drop both tiers for one key.
    async fn delete_key(&self, key: &SitemapKey) -> Result<(), RepoError>;

    /// Drop both tiers for every page of a scope.
    async fn delete_scope(&self, scope: &Scope) -> Result<(), RepoError>;
}

#[derive(Default)]
struct TieredEntry {
    fresh: Option<(CachedDocument, OffsetDateTime)>,
    stale: Option<CachedDocument>,
}

/// In-memory two-tier store.
#[derive(Default)]
pub struct MemoryDocumentStore {
    entries: RwLock<HashMap<SitemapKey, TieredEntry>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentCacheStore for MemoryDocumentStore {
    async fn get_fresh(&self, key: &SitemapKey) -> Result<Option<CachedDocument>, RepoError> {
        let now = OffsetDateTime::now_utc();
        let entries = read_recovered(&self.entries, "get_fresh");
        Ok(entries.get(key).and_then(|entry| {
            entry
                .fresh
                .as_ref()
                .filter(|(_, expires_at)| *expires_at > now)
                .map(|(document, _)| document.clone())
        }))
    }

    async fn get_stale(&self, key: &SitemapKey) -> Result<Option<CachedDocument>, RepoError> {
        let entries = read_recovered(&self.entries, "get_stale");
        Ok(entries.get(key).and_then(|entry| entry.stale.clone()))
    }

    async fn put_both(
        &self,
        key: &SitemapKey,
        document: &CachedDocument,
        ttl: Duration,
    ) -> Result<(), RepoError> {
        let expires_at = OffsetDateTime::now_utc() + ttl;
        let mut entries = write_recovered(&self.entries, "put_both");
        let entry = entries.entry(key.clone()).or_default();
        entry.fresh = Some((document.clone(), expires_at));
        entry.stale = Some(document.clone());
        Ok(())
    }

    async fn delete_key(&self, key: &SitemapKey) -> Result<(), RepoError> {
        write_recovered(&self.entries, "delete_key").remove(key);
        Ok(())
    }

    async fn delete_scope(&self, scope: &Scope) -> Result<(), RepoError> {
        write_recovered(&self.entries, "delete_scope").retain(|key, _| key.scope != *scope);
        Ok(())
    }
}
