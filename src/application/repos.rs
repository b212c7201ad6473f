//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{ContentItemRecord, RedirectRuleRecord};
use crate::domain::types::{ContentStatus, RedirectStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct NewRedirectRule {
    pub source: String,
    pub destination: Option<String>,
    pub status: RedirectStatus,
    pub is_regex: bool,
}

/// Eligibility criteria applied to every sitemap inventory query.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityFilter {
    pub published_only: bool,
    pub exclude_noindex: bool,
    /// Freshness window cutoff; items last modified before this instant are
    /// excluded.
    pub modified_after: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct UpsertContentItemParams {
    pub id: Uuid,
    pub content_type: String,
    pub address: String,
    pub status: ContentStatus,
    pub noindex: bool,
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Indexed point lookup over non-regex rules by normalized source.
    async fn find_exact(&self, source: &str) -> Result<Option<RedirectRuleRecord>, RepoError>;

    /// All regex rules in insertion (id) order.
    async fn list_regex_rules(&self) -> Result<Vec<RedirectRuleRecord>, RepoError>;

    async fn list_rules(&self) -> Result<Vec<RedirectRuleRecord>, RepoError>;

    async fn insert_rule(&self, rule: NewRedirectRule) -> Result<RedirectRuleRecord, RepoError>;

    async fn delete_rule(&self, id: i64) -> Result<bool, RepoError>;

    /// Increment the rule's hit counter in place at the store. Must be a
    /// single atomic update, never a read-modify-write round trip.
    async fn record_hit(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ContentInventory: Send + Sync {
    /// Distinct content types present in the inventory, in name order.
    async fn list_types(&self) -> Result<Vec<String>, RepoError>;

    async fn count_items(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
    ) -> Result<u64, RepoError>;

    /// One page of eligible items, ordered by modification time descending
    /// with the item id as a stable tie-break. Pages are 1-based.
    async fn page_items(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError>;

    async fn most_recently_modified(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
    ) -> Result<Option<OffsetDateTime>, RepoError>;
}

#[async_trait]
pub trait ContentInventoryWrite: Send + Sync {
    async fn find_item(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError>;

    async fn upsert_item(
        &self,
        params: UpsertContentItemParams,
    ) -> Result<ContentItemRecord, RepoError>;

    /// Remove an item, returning the deleted record so callers can
    /// invalidate the right scope.
    async fn delete_item(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError>;
}
