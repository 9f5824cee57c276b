//! Error types for the local cache.

use chatsync_api::ApiError;
use thiserror::Error;

/// Result type for cache operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur applying storage operations to the cache.
#[derive(Debug, Error)]
pub enum StateError {
    /// The storage operation failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The key is not in the cache.
    #[error("entity not cached: {0}")]
    NotFound(String),
}

impl StateError {
    /// The HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            StateError::Api(e) => e.status(),
            StateError::NotFound(_) => None,
        }
    }
}
