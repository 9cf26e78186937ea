//! Error Types

use thiserror::Error;

/// Result type alias for cart operations
pub type Result<T> = std::result::Result<T, CartError>;

/// Cart and session error types
#[derive(Error, Debug)]
pub enum CartError {
    /// Session store failure (poisoned lock, backend unavailable)
    #[error("Session error: {0}")]
    Session(String),

    /// Price resolution backend failed
    #[error("Pricing error: {0}")]
    Pricing(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CartError {
    /// Convert to a user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Session(_) => "Your session could not be read. Please reload the page.",
            Self::Pricing(_) => "The service price could not be calculated.",
            _ => "An unexpected error occurred.",
        }
    }
}
