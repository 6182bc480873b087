//! Error types for chime

use thiserror::Error;

/// Core error type for chime operations
#[derive(Debug, Error)]
pub enum ChimeError {
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

impl ChimeError {
    pub fn invalid_duration(msg: impl Into<String>) -> Self {
        Self::InvalidDuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ChimeError>;
