use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        ContentInventory, ContentInventoryWrite, EligibilityFilter, RepoError,
        UpsertContentItemParams,
    },
    domain::entities::ContentItemRecord,
    domain::types::ContentStatus,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ContentItemRow {
    id: Uuid,
    content_type: String,
    address: String,
    status: ContentStatus,
    noindex: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ContentItemRow> for ContentItemRecord {
    fn from(row: ContentItemRow) -> Self {
        Self {
            id: row.id,
            content_type: row.content_type,
            address: row.address,
            status: row.status,
            noindex: row.noindex,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn apply_eligibility(qb: &mut QueryBuilder<'_, Postgres>, filter: &EligibilityFilter) {
    if filter.published_only {
        qb.push(" AND status = ");
        qb.push_bind(ContentStatus::Published);
    }
    if filter.exclude_noindex {
        qb.push(" AND noindex = FALSE");
    }
    if let Some(cutoff) = filter.modified_after {
        qb.push(" AND updated_at >= ");
        qb.push_bind(cutoff);
    }
}

fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}

#[async_trait]
impl ContentInventory for PostgresRepositories {
    async fn list_types(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT content_type FROM content_items ORDER BY content_type",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_items(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM content_items WHERE content_type = ");
        qb.push_bind(content_type);
        apply_eligibility(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn page_items(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError> {
        if page == 0 {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::new(
            "SELECT id, content_type, address, status, noindex, created_at, updated_at \
             FROM content_items WHERE content_type = ",
        );
        qb.push_bind(content_type);
        apply_eligibility(&mut qb, filter);
        qb.push(" ORDER BY updated_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(page_size));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(page - 1) * i64::from(page_size));

        let rows: Vec<ContentItemRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ContentItemRecord::from).collect())
    }

    async fn most_recently_modified(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
    ) -> Result<Option<OffsetDateTime>, RepoError> {
        let mut qb =
            QueryBuilder::new("SELECT MAX(updated_at) FROM content_items WHERE content_type = ");
        qb.push_bind(content_type);
        apply_eligibility(&mut qb, filter);

        qb.build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ContentInventoryWrite for PostgresRepositories {
    async fn find_item(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError> {
        let row = sqlx::query_as::<_, ContentItemRow>(
            r#"
            SELECT id, content_type, address, status, noindex, created_at, updated_at
            FROM content_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ContentItemRecord::from))
    }

    async fn upsert_item(
        &self,
        params: UpsertContentItemParams,
    ) -> Result<ContentItemRecord, RepoError> {
        let row = sqlx::query_as::<_, ContentItemRow>(
            r#"
            INSERT INTO content_items (id, content_type, address, status, noindex)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                content_type = EXCLUDED.content_type,
                address = EXCLUDED.address,
                status = EXCLUDED.status,
                noindex = EXCLUDED.noindex,
                updated_at = now()
            RETURNING id, content_type, address, status, noindex, created_at, updated_at
            "#,
        )
        .bind(params.id)
        .bind(&params.content_type)
        .bind(&params.address)
        .bind(params.status)
        .bind(params.noindex)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ContentItemRecord::from(row))
    }

    async fn delete_item(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError> {
        let row = sqlx::query_as::<_, ContentItemRow>(
            r#"
            DELETE FROM content_items
            WHERE id = $1
            RETURNING id, content_type, address, status, noindex, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ContentItemRecord::from))
    }
}
