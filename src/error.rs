//! Avatalk Error Types
//!
//! Centralized error handling for the controller and its collaborators.

use thiserror::Error;

/// Central error type for Avatalk
#[derive(Error, Debug)]
pub enum AvatalkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Conversation transport error: {0}")]
    Conversation(String),

    #[error("Audio output error: {0}")]
    Audio(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Avatalk operations
pub type AvatalkResult<T> = Result<T, AvatalkError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for AvatalkError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        AvatalkError::Lock(err.to_string())
    }
}
