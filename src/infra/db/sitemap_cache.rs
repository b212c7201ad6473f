use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::RepoError,
    cache::{CachedDocument, DocumentCacheStore, Scope, SitemapKey},
};

use super::{PostgresRepositories, map_sqlx_error};

const TIER_FRESH: &str = "fresh";
const TIER_STALE: &str = "stale";

#[derive(sqlx::FromRow)]
struct CachedDocumentRow {
    xml: String,
    last_modified: Option<OffsetDateTime>,
    generated_at: OffsetDateTime,
}

impl From<CachedDocumentRow> for CachedDocument {
    fn from(row: CachedDocumentRow) -> Self {
        Self {
            xml: row.xml,
            last_modified: row.last_modified,
            generated_at: row.generated_at,
        }
    }
}

fn page_as_i32(page: u32) -> i32 {
    i32::try_from(page).unwrap_or(i32::MAX)
}

#[async_trait]
impl DocumentCacheStore for PostgresRepositories {
    async fn get_fresh(&self, key: &SitemapKey) -> Result<Option<CachedDocument>, RepoError> {
        let row = sqlx::query_as::<_, CachedDocumentRow>(
            r#"
            SELECT xml, last_modified, generated_at
            FROM sitemap_cache
            WHERE scope = $1 AND page = $2 AND tier = $3 AND expires_at > now()
            "#,
        )
        .bind(key.scope.as_str())
        .bind(page_as_i32(key.page))
        .bind(TIER_FRESH)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CachedDocument::from))
    }

    async fn get_stale(&self, key: &SitemapKey) -> Result<Option<CachedDocument>, RepoError> {
        let row = sqlx::query_as::<_, CachedDocumentRow>(
            r#"
            SELECT xml, last_modified, generated_at
            FROM sitemap_cache
            WHERE scope = $1 AND page = $2 AND tier = $3
            "#,
        )
        .bind(key.scope.as_str())
        .bind(page_as_i32(key.page))
        .bind(TIER_STALE)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CachedDocument::from))
    }

    async fn put_both(
        &self,
        key: &SitemapKey,
        document: &CachedDocument,
        ttl: Duration,
    ) -> Result<(), RepoError> {
        let expires_at = OffsetDateTime::now_utc() + ttl;

        // Single-key upserts per tier; no cross-row atomicity is needed
        // because readers tolerate one tier lagging the other briefly.
        sqlx::query(
            r#"
            INSERT INTO sitemap_cache (scope, page, tier, xml, last_modified, generated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (scope, page, tier) DO UPDATE SET
                xml = EXCLUDED.xml,
                last_modified = EXCLUDED.last_modified,
                generated_at = EXCLUDED.generated_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key.scope.as_str())
        .bind(page_as_i32(key.page))
        .bind(TIER_FRESH)
        .bind(&document.xml)
        .bind(document.last_modified)
        .bind(document.generated_at)
        .bind(expires_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO sitemap_cache (scope, page, tier, xml, last_modified, generated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL)
            ON CONFLICT (scope, page, tier) DO UPDATE SET
                xml = EXCLUDED.xml,
                last_modified = EXCLUDED.last_modified,
                generated_at = EXCLUDED.generated_at,
                expires_at = NULL
            "#,
        )
        .bind(key.scope.as_str())
        .bind(page_as_i32(key.page))
        .bind(TIER_STALE)
        .bind(&document.xml)
        .bind(document.last_modified)
        .bind(document.generated_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_key(&self, key: &SitemapKey) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM sitemap_cache WHERE scope = $1 AND page = $2")
            .bind(key.scope.as_str())
            .bind(page_as_i32(key.page))
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_scope(&self, scope: &Scope) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM sitemap_cache WHERE scope = $1")
            .bind(scope.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
