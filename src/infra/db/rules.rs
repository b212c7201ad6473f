use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{NewRedirectRule, RepoError, RuleStore},
    domain::entities::RedirectRuleRecord,
    domain::types::RedirectStatus,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct RedirectRuleRow {
    id: i64,
    source: String,
    destination: Option<String>,
    status_code: i16,
    is_regex: bool,
    hit_count: i64,
    created_at: OffsetDateTime,
}

impl From<RedirectRuleRow> for RedirectRuleRecord {
    fn from(row: RedirectRuleRow) -> Self {
        Self {
            id: row.id,
            source: row.source,
            destination: row.destination,
            status: RedirectStatus::from_persisted(row.status_code),
            is_regex: row.is_regex,
            hit_count: row.hit_count,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl RuleStore for PostgresRepositories {
    async fn find_exact(&self, source: &str) -> Result<Option<RedirectRuleRecord>, RepoError> {
        let row = sqlx::query_as::<_, RedirectRuleRow>(
            r#"
            SELECT id, source, destination, status_code, is_regex, hit_count, created_at
            FROM redirect_rules
            WHERE source = $1 AND is_regex = FALSE
            "#,
        )
        .bind(source)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(RedirectRuleRecord::from))
    }

    async fn list_regex_rules(&self) -> Result<Vec<RedirectRuleRecord>, RepoError> {
        let rows = sqlx::query_as::<_, RedirectRuleRow>(
            r#"
            SELECT id, source, destination, status_code, is_regex, hit_count, created_at
            FROM redirect_rules
            WHERE is_regex = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RedirectRuleRecord::from).collect())
    }

    async fn list_rules(&self) -> Result<Vec<RedirectRuleRecord>, RepoError> {
        let rows = sqlx::query_as::<_, RedirectRuleRow>(
            r#"
            SELECT id, source, destination, status_code, is_regex, hit_count, created_at
            FROM redirect_rules
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RedirectRuleRecord::from).collect())
    }

    async fn insert_rule(&self, rule: NewRedirectRule) -> Result<RedirectRuleRecord, RepoError> {
        let row = sqlx::query_as::<_, RedirectRuleRow>(
            r#"
            INSERT INTO redirect_rules (source, destination, status_code, is_regex)
            VALUES ($1, $2, $3, $4)
            RETURNING id, source, destination, status_code, is_regex, hit_count, created_at
            "#,
        )
        .bind(&rule.source)
        .bind(&rule.destination)
        .bind(rule.status.as_code() as i16)
        .bind(rule.is_regex)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(RedirectRuleRecord::from(row))
    }

    async fn delete_rule(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM redirect_rules WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_hit(&self, id: i64) -> Result<(), RepoError> {
        // Increment in place; concurrent resolutions of the same rule must
        // not lose updates.
        let result = sqlx::query("UPDATE redirect_rules SET hit_count = hit_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
