//! Error types for the fraud engine

use thiserror::Error;

/// Fraud engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed transaction input, rejected before any analyzer runs
    #[error("Validation error: {0}")]
    Validation(String),

    /// Profile or analysis store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Historical transaction query failure
    #[error("History query error: {0}")]
    History(String),

    /// IP reputation lookup failure
    #[error("Reputation lookup error: {0}")]
    Reputation(String),

    /// Known-device store failure
    #[error("Device store error: {0}")]
    DeviceStore(String),

    /// Account directory failure
    #[error("Account directory error: {0}")]
    Account(String),

    /// Operation exceeded its deadline (milliseconds)
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Circuit breaker rejected the call
    #[error("Circuit breaker {0} is open")]
    CircuitOpen(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Whether the error comes from an external collaborator rather than the caller
    pub fn is_dependency_failure(&self) -> bool {
        !matches!(self, Error::Validation(_) | Error::InvalidConfig(_))
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
