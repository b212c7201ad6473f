//! Automatic rule creation when a published item's address changes.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{NewRedirectRule, RepoError, RuleStore};
use crate::domain::rules::normalize_path;
use crate::domain::types::{ContentStatus, RedirectStatus};

/// A content rename delivered synchronously by the content write surface.
#[derive(Debug, Clone)]
pub struct RenameEvent {
    pub item_id: Uuid,
    pub address_before: String,
    pub address_after: String,
    pub status_before: ContentStatus,
    pub status_after: ContentStatus,
}

pub struct AutoRedirector {
    rules: Arc<dyn RuleStore>,
    enabled: bool,
    public_url: String,
}

impl AutoRedirector {
    pub fn new(rules: Arc<dyn RuleStore>, enabled: bool, public_url: impl Into<String>) -> Self {
        Self {
            rules,
            enabled,
            public_url: public_url.into(),
        }
    }

    /// Insert a permanent redirect from the old address to the new one.
    ///
    /// Fires only for published-to-published renames where the normalized
    /// addresses actually differ, and is idempotent: an existing rule for
    /// the old address leaves the store untouched.
    pub async fn on_rename(&self, event: &RenameEvent) -> Result<(), RepoError> {
        if !self.enabled {
            debug!(
                target = "application::auto_redirect",
                item_id = %event.item_id,
                "auto redirect disabled, skipping rename"
            );
            return Ok(());
        }

        if event.status_before != ContentStatus::Published
            || event.status_after != ContentStatus::Published
        {
            return Ok(());
        }

        let source = normalize_path(&event.address_before);
        if source == normalize_path(&event.address_after) {
            return Ok(());
        }

        if self.rules.find_exact(&source).await?.is_some() {
            debug!(
                target = "application::auto_redirect",
                item_id = %event.item_id,
                source = %source,
                "rule already exists for old address"
            );
            return Ok(());
        }

        let destination = absolute_destination(&self.public_url, &event.address_after);
        let rule = self
            .rules
            .insert_rule(NewRedirectRule {
                source: source.clone(),
                destination: Some(destination),
                status: RedirectStatus::MovedPermanently,
                is_regex: false,
            })
            .await?;

        info!(
            target = "application::auto_redirect",
            item_id = %event.item_id,
            rule_id = rule.id,
            source = %source,
            "created redirect for renamed item"
        );
        Ok(())
    }
}

fn absolute_destination(public_url: &str, address: &str) -> String {
    let base = public_url.trim_end_matches('/');
    let path = normalize_path(address);
    if path == "/" {
        format!("{base}/")
    } else {
        format!("{base}{path}")
    }
}
