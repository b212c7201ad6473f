//! Redirect rule invariants: path normalization, typed regex patterns, and
//! capture substitution.

use regex::{Captures, Regex};

use super::error::ValidationError;

/// Normalize a request path or non-regex rule source.
///
/// The result always carries exactly one leading slash and no trailing slash,
/// except for the root path which stays `/`. Idempotent.
pub fn normalize_path(path: &str) -> String {
    let stripped = path.trim().trim_start_matches('/');
    if stripped.is_empty() {
        return "/".to_string();
    }
    let mut normalized = format!("/{stripped}");
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// A stored regex rule source.
///
/// Keeps the raw pattern exactly as persisted; anchoring happens here as a
/// pure function so write-time validation and resolve-time matching can never
/// disagree on framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePattern {
    raw: String,
}

impl RulePattern {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The pattern as matched at resolve time: anchored as a full-string
    /// match. The non-capturing group keeps alternations from escaping the
    /// anchors without renumbering the author's capture groups.
    pub fn anchored(&self) -> String {
        format!("^(?:{})$", self.raw)
    }

    pub fn compile(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.anchored())
    }

    /// Write-path validation: compile with the resolve-time anchoring and run
    /// a trial match against the empty string. A pattern that fails to
    /// compile is rejected here and never stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let compiled = self.compile().map_err(|err| {
            ValidationError::new(format!("invalid regex pattern `{}`: {err}", self.raw))
        })?;
        let _ = compiled.is_match("");
        Ok(())
    }
}

/// Rewrite `$1`..`$N` placeholders in a destination using regex match groups.
///
/// Group 0 is never substituted and placeholders referring to groups that did
/// not participate in the match are left verbatim. A lone `$` with no digits
/// passes through unchanged.
pub fn substitute_captures(destination: &str, caps: &Captures<'_>) -> String {
    let mut out = String::with_capacity(destination.len());
    let mut rest = destination;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits_len = after
            .bytes()
            .take_while(|byte| byte.is_ascii_digit())
            .count();
        if digits_len == 0 {
            out.push('$');
            rest = after;
            continue;
        }

        let digits = &after[..digits_len];
        let group = digits
            .parse::<usize>()
            .ok()
            .filter(|index| *index >= 1)
            .and_then(|index| caps.get(index));
        match group {
            Some(matched) => out.push_str(matched.as_str()),
            None => {
                out.push('$');
                out.push_str(digits);
            }
        }
        rest = &after[digits_len..];
    }

    out.push_str(rest);
    out
}
