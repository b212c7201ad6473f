//! Request-time redirect resolution.
//!
//! Resolution runs in two phases: an indexed exact lookup over normalized
//! non-regex sources, then the regex rules in insertion order with anchored
//! full-string matching. The exact phase always wins; within the regex phase
//! the first registered rule wins.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, warn};

use crate::application::repos::RuleStore;
use crate::domain::entities::RedirectRuleRecord;
use crate::domain::rules::{RulePattern, normalize_path, substitute_captures};
use crate::domain::types::RedirectStatus;

/// Outcome of resolving a request path against the rule store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectAction {
    Redirect {
        destination: String,
        status: RedirectStatus,
    },
    /// 410: the caller must short-circuit with an empty body.
    Gone,
    /// Fall through to normal content handling.
    NoMatch,
}

#[derive(Clone)]
pub struct RedirectResolver {
    rules: Arc<dyn RuleStore>,
}

impl RedirectResolver {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }

    /// Resolve a request path to a redirect action.
    ///
    /// Never fails the request: store read failures and malformed stored
    /// patterns degrade to `NoMatch` / skipped rules, and a failed hit-count
    /// write is logged while the redirect is still served.
    pub async fn resolve(&self, path: &str) -> RedirectAction {
        let normalized = normalize_path(path);

        match self.rules.find_exact(&normalized).await {
            Ok(Some(rule)) => return self.apply(rule, &normalized).await,
            Ok(None) => {}
            Err(err) => {
                error!(
                    target = "application::resolver",
                    path = %normalized,
                    error = %err,
                    "exact rule lookup failed, passing request through"
                );
                counter!("rotta_redirect_pass_total").increment(1);
                return RedirectAction::NoMatch;
            }
        }

        let regex_rules = match self.rules.list_regex_rules().await {
            Ok(rules) => rules,
            Err(err) => {
                error!(
                    target = "application::resolver",
                    path = %normalized,
                    error = %err,
                    "regex rule listing failed, passing request through"
                );
                counter!("rotta_redirect_pass_total").increment(1);
                return RedirectAction::NoMatch;
            }
        };

        for rule in regex_rules {
            let compiled = match RulePattern::new(&rule.source).compile() {
                Ok(compiled) => compiled,
                Err(err) => {
                    // Write-path validation should have rejected this rule;
                    // treat it as non-matching rather than failing the request.
                    warn!(
                        target = "application::resolver",
                        rule_id = rule.id,
                        pattern = %rule.source,
                        error = %err,
                        "skipping malformed stored regex rule"
                    );
                    continue;
                }
            };

            if let Some(caps) = compiled.captures(&normalized) {
                let destination = rule
                    .destination
                    .as_deref()
                    .map(|destination| substitute_captures(destination, &caps));
                return self.finish(rule, destination).await;
            }
        }

        counter!("rotta_redirect_pass_total").increment(1);
        RedirectAction::NoMatch
    }

    async fn apply(&self, rule: RedirectRuleRecord, path: &str) -> RedirectAction {
        debug!(
            target = "application::resolver",
            rule_id = rule.id,
            path = %path,
            "exact rule matched"
        );
        let destination = rule.destination.clone();
        self.finish(rule, destination).await
    }

    async fn finish(
        &self,
        rule: RedirectRuleRecord,
        destination: Option<String>,
    ) -> RedirectAction {
        if let Err(err) = self.rules.record_hit(rule.id).await {
            // Bookkeeping must not fail the redirect.
            warn!(
                target = "application::resolver",
                rule_id = rule.id,
                error = %err,
                "failed to record rule hit"
            );
        }

        if rule.status.is_gone() {
            counter!("rotta_redirect_gone_total").increment(1);
            return RedirectAction::Gone;
        }

        let destination = match destination.filter(|destination| !destination.is_empty()) {
            Some(destination) => destination,
            None => {
                warn!(
                    target = "application::resolver",
                    rule_id = rule.id,
                    "stored rule has no destination, passing request through"
                );
                counter!("rotta_redirect_pass_total").increment(1);
                return RedirectAction::NoMatch;
            }
        };

        counter!("rotta_redirect_match_total").increment(1);
        RedirectAction::Redirect {
            destination,
            status: rule.status,
        }
    }
}
