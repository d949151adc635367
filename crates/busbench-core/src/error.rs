//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while resolving a campaign before the testbed is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown broker type: {0}")]
    UnknownBroker(String),

    #[error("unknown test case: {0}")]
    UnknownTestCase(String),

    #[error("malformed parameter space: {0}")]
    MalformedSpace(String),

    #[error("missing dimension: {0}")]
    MissingDimension(String),

    #[error("invalid value for {dimension}: {reason}")]
    InvalidValue { dimension: String, reason: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
