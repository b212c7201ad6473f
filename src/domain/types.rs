//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_status", rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

/// HTTP outcome of a redirect rule.
///
/// Persisted as a smallint status code; any value outside the supported set
/// is coerced to 301 when read back, so a row corrupted out-of-band can never
/// fail a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectStatus {
    MovedPermanently,
    Found,
    TemporaryRedirect,
    Gone,
}

impl RedirectStatus {
    pub fn as_code(self) -> u16 {
        match self {
            RedirectStatus::MovedPermanently => 301,
            RedirectStatus::Found => 302,
            RedirectStatus::TemporaryRedirect => 307,
            RedirectStatus::Gone => 410,
        }
    }

    /// Map a stored or submitted status code, coercing anything unsupported
    /// to a permanent redirect.
    pub fn from_code(code: u16) -> Self {
        match code {
            302 => RedirectStatus::Found,
            307 => RedirectStatus::TemporaryRedirect,
            410 => RedirectStatus::Gone,
            _ => RedirectStatus::MovedPermanently,
        }
    }

    pub fn from_persisted(code: i16) -> Self {
        u16::try_from(code)
            .map(Self::from_code)
            .unwrap_or(RedirectStatus::MovedPermanently)
    }

    pub fn is_gone(self) -> bool {
        matches!(self, RedirectStatus::Gone)
    }

    /// Every status except 410 must carry a destination.
    pub fn requires_destination(self) -> bool {
        !self.is_gone()
    }
}
