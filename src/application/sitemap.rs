//! Sitemap generation: the paginated per-type documents and the index that
//! ties them together.
//!
//! Output is deterministic for an unchanged inventory: types are listed in
//! name order, items in modification-time order with the item id as a stable
//! tie-break, so repeated generation is byte-identical. The cache layer
//! depends on that.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::application::repos::{ContentInventory, EligibilityFilter, RepoError};

/// Fixed sitemap-protocol page size.
pub const SITEMAP_PAGE_SIZE: u32 = 1000;

/// Binary attachments never appear in sitemaps, independent of configuration.
pub const ATTACHMENT_TYPE: &str = "attachment";

const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapDocument {
    pub xml: String,
    pub last_modified: Option<OffsetDateTime>,
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to read content inventory: {0}")]
    Inventory(#[from] RepoError),
}

/// Generation inputs resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct SitemapOptions {
    pub public_url: String,
    pub excluded_types: Vec<String>,
    /// Freshness window in months; 0 means unlimited.
    pub freshness_window_months: u32,
}

pub struct SitemapService {
    inventory: Arc<dyn ContentInventory>,
    options: SitemapOptions,
}

impl SitemapService {
    pub fn new(inventory: Arc<dyn ContentInventory>, options: SitemapOptions) -> Self {
        Self { inventory, options }
    }

    /// Generate the sitemap index: one `<sitemap>` entry per page of every
    /// eligible content type. Types with no eligible items are omitted
    /// entirely.
    pub async fn generate_index(&self) -> Result<SitemapDocument, SitemapError> {
        let filter = self.eligibility_filter();
        let mut entries = String::new();
        let mut index_last_modified: Option<OffsetDateTime> = None;

        for content_type in self.inventory.list_types().await? {
            if self.is_excluded(&content_type) {
                continue;
            }
            let count = self.inventory.count_items(&content_type, &filter).await?;
            let total_pages = total_pages(count);
            if total_pages == 0 {
                continue;
            }

            let last_modified = self
                .inventory
                .most_recently_modified(&content_type, &filter)
                .await?;
            if let Some(ts) = last_modified {
                index_last_modified = Some(match index_last_modified {
                    Some(current) => current.max(ts),
                    None => ts,
                });
            }

            for page in 1..=total_pages {
                let loc = self.page_url(&content_type, page, total_pages);
                entries.push_str(&index_entry(&loc, last_modified));
            }
        }

        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</sitemapindex>\n"
        );
        Ok(SitemapDocument {
            xml,
            last_modified: index_last_modified,
        })
    }

    /// Generate one page of a per-type sitemap.
    ///
    /// Returns `None` for excluded or unknown types, out-of-range pages, and
    /// pages with no eligible items — callers surface that as not-found
    /// rather than publishing a hollow document.
    pub async fn generate_page(
        &self,
        content_type: &str,
        page: u32,
    ) -> Result<Option<SitemapDocument>, SitemapError> {
        if page == 0 || self.is_excluded(content_type) {
            return Ok(None);
        }

        let filter = self.eligibility_filter();
        let items = self
            .inventory
            .page_items(content_type, &filter, page, SITEMAP_PAGE_SIZE)
            .await?;
        if items.is_empty() {
            return Ok(None);
        }

        let last_modified = items.iter().map(|item| item.updated_at).max();
        let mut entries = String::new();
        for item in &items {
            let loc = canonical_url(&self.options.public_url, &item.address);
            entries.push_str(&url_entry(&loc, Some(item.updated_at)));
        }

        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</urlset>\n"
        );
        Ok(Some(SitemapDocument { xml, last_modified }))
    }

    /// Generate robots.txt content pointing crawlers at the sitemap index.
    pub fn robots_txt(&self) -> String {
        let base = self.options.public_url.trim_end_matches('/');
        format!("User-agent: *\nAllow: /\nSitemap: {base}/sitemap.xml\n")
    }

    fn eligibility_filter(&self) -> EligibilityFilter {
        let modified_after = (self.options.freshness_window_months > 0).then(|| {
            OffsetDateTime::now_utc()
                - time::Duration::days(DAYS_PER_MONTH * i64::from(self.options.freshness_window_months))
        });
        EligibilityFilter {
            published_only: true,
            exclude_noindex: true,
            modified_after,
        }
    }

    fn is_excluded(&self, content_type: &str) -> bool {
        content_type == ATTACHMENT_TYPE
            || self
                .options
                .excluded_types
                .iter()
                .any(|excluded| excluded == content_type)
    }

    fn page_url(&self, content_type: &str, page: u32, total_pages: u32) -> String {
        let base = self.options.public_url.trim_end_matches('/');
        if total_pages <= 1 {
            format!("{base}/sitemaps/{content_type}.xml")
        } else {
            format!("{base}/sitemaps/{content_type}-{page}.xml")
        }
    }
}

pub(crate) fn total_pages(count: u64) -> u32 {
    u32::try_from(count.div_ceil(u64::from(SITEMAP_PAGE_SIZE))).unwrap_or(u32::MAX)
}

fn index_entry(loc: &str, lastmod: Option<OffsetDateTime>) -> String {
    let loc = escape_xml(loc);
    match format_lastmod(lastmod) {
        Some(lastmod) => {
            format!("  <sitemap><loc>{loc}</loc><lastmod>{lastmod}</lastmod></sitemap>\n")
        }
        None => format!("  <sitemap><loc>{loc}</loc></sitemap>\n"),
    }
}

fn url_entry(loc: &str, lastmod: Option<OffsetDateTime>) -> String {
    let loc = escape_xml(loc);
    match format_lastmod(lastmod) {
        Some(lastmod) => format!("  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod></url>\n"),
        None => format!("  <url><loc>{loc}</loc></url>\n"),
    }
}

fn format_lastmod(lastmod: Option<OffsetDateTime>) -> Option<String> {
    lastmod.and_then(|dt| dt.format(&Rfc3339).ok())
}

pub(crate) fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{trimmed}")
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
