//! Write-path validation and CRUD for redirect rules (management surface).

use std::sync::Arc;

use thiserror::Error;

use crate::application::repos::{NewRedirectRule, RepoError, RuleStore};
use crate::domain::entities::RedirectRuleRecord;
use crate::domain::error::ValidationError;
use crate::domain::rules::{RulePattern, normalize_path};
use crate::domain::types::RedirectStatus;

#[derive(Debug, Error)]
pub enum RuleWriteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A rule as submitted by the management surface, before validation.
#[derive(Debug, Clone)]
pub struct RuleSubmission {
    pub source: String,
    pub destination: Option<String>,
    pub status_code: u16,
    pub is_regex: bool,
}

#[derive(Clone)]
pub struct RuleService {
    rules: Arc<dyn RuleStore>,
}

impl RuleService {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }

    /// Validate and store a rule.
    ///
    /// Non-regex sources are normalized before storage so the resolver's
    /// exact phase can rely on a point lookup. Unsupported status codes are
    /// coerced to 301. Regex patterns are trial-compiled with the same
    /// anchoring the resolver uses; a pattern that fails to compile is
    /// rejected and never stored.
    pub async fn add_rule(
        &self,
        submission: RuleSubmission,
    ) -> Result<RedirectRuleRecord, RuleWriteError> {
        let status = RedirectStatus::from_code(submission.status_code);

        let source = submission.source.trim();
        if source.is_empty() {
            return Err(ValidationError::new("rule source must not be empty").into());
        }
        let source = if submission.is_regex {
            RulePattern::new(source).validate()?;
            source.to_string()
        } else {
            normalize_path(source)
        };

        let destination = submission
            .destination
            .map(|destination| destination.trim().to_string())
            .filter(|destination| !destination.is_empty());
        if status.requires_destination() && destination.is_none() {
            return Err(ValidationError::new(
                "destination is required unless the rule responds 410",
            )
            .into());
        }

        let record = self
            .rules
            .insert_rule(NewRedirectRule {
                source,
                destination,
                status,
                is_regex: submission.is_regex,
            })
            .await?;
        Ok(record)
    }

    pub async fn delete_rule(&self, id: i64) -> Result<bool, RepoError> {
        self.rules.delete_rule(id).await
    }

    pub async fn list_rules(&self) -> Result<Vec<RedirectRuleRecord>, RepoError> {
        self.rules.list_rules().await
    }

    /// Look up a non-regex rule by its normalized source.
    pub async fn find_by_source(
        &self,
        source: &str,
    ) -> Result<Option<RedirectRuleRecord>, RepoError> {
        self.rules.find_exact(&normalize_path(source)).await
    }
}
