//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for workspace-level operations
pub type Result<T> = std::result::Result<T, PlacspError>;

/// Errors raised while loading and validating configuration
#[derive(Error, Debug)]
pub enum PlacspError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl PlacspError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
