//! Core type definitions for chatsync.
//!
//! This crate defines the I/O-free types shared by every other
//! chatsync crate:
//! - Entity keys and their path codec (bucket, folder path, name)
//! - Entity descriptors, full entities and the per-entity load status
//! - Publication requests and the version naming scheme for published items
//! - Upload progress events
//!
//! Network access lives in `chatsync-api`; local caching in `chatsync-state`.

mod entity;
mod key;
mod progress;
mod publication;
mod version;

pub use entity::{Entity, EntityInfo, EntityStatus, FolderInfo};
pub use key::{decode, encode, parse_api_id, EntityKey, EntityKind, KEY_SEPARATOR};
pub use progress::ProgressEvent;
pub use publication::{
    Publication, PublicationRequest, PublicationResource, PublicationRule, PublicationStatus,
    PublishAction,
};
pub use version::{split_version, version_group, with_version, VERSION_SEPARATOR};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A key could not be encoded or split into bucket + name.
    #[error("malformed entity key: {0}")]
    MalformedKey(String),

    /// A value violated a model invariant.
    #[error("validation failed: {0}")]
    Validation(String),
}
