use thiserror::Error;

/// Failures raised while standing up or talking to process infrastructure:
/// listener sockets, the database pool, the tracing stack.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error("tracing setup failed: {0}")]
    Telemetry(String),
    #[error("invalid deployment configuration: {0}")]
    Configuration(String),
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
