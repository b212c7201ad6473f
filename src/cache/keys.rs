//! Cache key definitions.

use std::fmt;

/// The document family a cache entry belongs to: the sitemap index or one
/// content type's paginated sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Index,
    ContentType(String),
}

impl Scope {
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Index => "index",
            Scope::ContentType(content_type) => content_type,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cached document: a scope plus a 1-based page number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SitemapKey {
    pub scope: Scope,
    pub page: u32,
}

impl SitemapKey {
    pub fn index() -> Self {
        Self {
            scope: Scope::Index,
            page: 1,
        }
    }

    pub fn for_type(content_type: impl Into<String>, page: u32) -> Self {
        Self {
            scope: Scope::ContentType(content_type.into()),
            page,
        }
    }
}

impl fmt::Display for SitemapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.page)
    }
}
