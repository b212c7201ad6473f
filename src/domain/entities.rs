//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ContentStatus, RedirectStatus};

/// A stored redirect rule.
///
/// `source` is a normalized literal path when `is_regex` is false, otherwise
/// a raw pattern that gets anchored at match time. `destination` is only
/// absent for 410 rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedirectRuleRecord {
    pub id: i64,
    pub source: String,
    pub destination: Option<String>,
    pub status: RedirectStatus,
    pub is_regex: bool,
    pub hit_count: i64,
    pub created_at: OffsetDateTime,
}

/// A content inventory item as seen by sitemap generation and the rename
/// event source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItemRecord {
    pub id: Uuid,
    pub content_type: String,
    pub address: String,
    pub status: ContentStatus,
    pub noindex: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
