use thiserror::Error;

/// Rejection produced by domain-level write validation: a malformed regex
/// pattern, an empty rule source, or a missing destination on a rule that
/// needs one. Carries the specific violated invariant as its message.
#[derive(Debug, Error)]
#[error("validation failed: {message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
