//! Shared error type across promkit crates.

use thiserror::Error;

/// Stable error codes (safe to match on in callers and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected argument (negative counter delta, non-finite gauge value, bad opts).
    InvalidArgument,
    /// Metric name violates the exposition identifier grammar.
    InvalidName,
    /// A metric with the same name is already registered.
    DuplicateName,
    /// Configuration could not be read or failed validation.
    Config,
}

impl ErrorKind {
    /// String representation used in logs and test assertions.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::InvalidName => "INVALID_NAME",
            ErrorKind::DuplicateName => "DUPLICATE_NAME",
            ErrorKind::Config => "CONFIG",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by the core and the exporter.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),
    #[error("duplicate metric name: {0}")]
    DuplicateName(String),
    #[error("config: {0}")]
    Config(String),
}

impl MetricsError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            MetricsError::InvalidName(_) => ErrorKind::InvalidName,
            MetricsError::DuplicateName(_) => ErrorKind::DuplicateName,
            MetricsError::Config(_) => ErrorKind::Config,
        }
    }
}
