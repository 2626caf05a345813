//! Shared error type across telemeter crates.

use thiserror::Error;

/// Stable error codes (safe to match on in callers and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Configuration file or section rejected.
    ConfigInvalid,
    /// A feature (metrics or tracing) failed to initialize.
    InitFailed,
    /// Label name rejected.
    InvalidLabel,
    /// Metric name rejected.
    InvalidMetricName,
    /// Series already registered with a different aggregator kind.
    KindMismatch,
    /// Collector transport failure.
    Transport,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in log lines and assertions.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::InitFailed => "INIT_FAILED",
            ErrorCode::InvalidLabel => "INVALID_LABEL",
            ErrorCode::InvalidMetricName => "INVALID_METRIC_NAME",
            ErrorCode::KindMismatch => "KIND_MISMATCH",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TelemeterError>;

/// Unified error type used by core and agent.
#[derive(Debug, Error)]
pub enum TelemeterError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("{0}")]
    Init(String),
    #[error("invalid label: {0}")]
    InvalidLabel(String),
    #[error("invalid metric name: {0:?}")]
    InvalidMetricName(String),
    #[error("metric {name} is a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },
    #[error("transport: {0}")]
    Transport(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl TelemeterError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            TelemeterError::Config(_) => ErrorCode::ConfigInvalid,
            TelemeterError::Init(_) => ErrorCode::InitFailed,
            TelemeterError::InvalidLabel(_) => ErrorCode::InvalidLabel,
            TelemeterError::InvalidMetricName(_) => ErrorCode::InvalidMetricName,
            TelemeterError::KindMismatch { .. } => ErrorCode::KindMismatch,
            TelemeterError::Transport(_) => ErrorCode::Transport,
            TelemeterError::Internal(_) => ErrorCode::Internal,
        }
    }
}
