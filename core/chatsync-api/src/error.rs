//! API error types.

use thiserror::Error;

/// Result type for remote storage operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur talking to the remote metadata/content API.
///
/// Nothing in this crate retries; every error reaches the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("remote storage error: HTTP {status}: {body}")]
    RemoteStorage {
        status: u16,
        body: serde_json::Value,
    },

    /// An entity key could not be encoded or decoded.
    #[error("malformed entity key: {0}")]
    MalformedKey(String),

    /// A request was rejected before it reached the network.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request failed before a status was available.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A local file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A background upload task ended without producing a result.
    #[error("upload aborted: {0}")]
    UploadAborted(String),
}

impl ApiError {
    /// The HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RemoteStorage { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

impl From<chatsync_types::Error> for ApiError {
    fn from(err: chatsync_types::Error) -> Self {
        match err {
            chatsync_types::Error::MalformedKey(msg) => ApiError::MalformedKey(msg),
            chatsync_types::Error::Validation(msg) => ApiError::Validation(msg),
        }
    }
}
