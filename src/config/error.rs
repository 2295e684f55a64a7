//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("tier {0:?}: rate must be positive")]
    ZeroRate(String),

    #[error("tier {0:?}: period must be positive")]
    ZeroPeriod(String),

    #[error("tier {0:?}: burst must be positive")]
    ZeroBurst(String),

    #[error("default tier {0:?} missing from tier table")]
    MissingDefaultTier(String),

    #[error("idle TTL must be positive")]
    ZeroIdleTtl,
}
