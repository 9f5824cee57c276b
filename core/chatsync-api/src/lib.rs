//! Remote storage client for chatsync.
//!
//! Maps named entities (conversations, prompts, applications) onto the
//! remote metadata/content API:
//!
//! - **Storage**: [`EntityStorage`] is the capability set
//!   (list, get, create, update, delete, move); [`ApiEntityStorage`] is its
//!   HTTP implementation, parameterized by an [`EntityKindSpec`]
//! - **Publication**: [`PublicationApi`] submits, approves and rejects
//!   publication requests; [`diff_publication`] previews their effect
//! - **Upload**: [`FileUploader`] streams files and reports progress as
//!   [`ProgressEvent`](chatsync_types::ProgressEvent)s
//!
//! Every operation issues its requests once. Errors are returned to the
//! caller as [`ApiError`]; retrying is the caller's decision.
//!
//! # Example
//!
//! ```no_run
//! use chatsync_api::{ApiClient, ApiConfig, ConversationKind, ApiEntityStorage, EntityStorage, ListOptions};
//! use chatsync_types::{EntityKind, FolderInfo};
//!
//! # async fn run() -> chatsync_api::ApiResult<()> {
//! let client = ApiClient::new(ApiConfig::new("https://chat.example.com").with_bearer_token("t"))?;
//! let storage = ApiEntityStorage::new(client, ConversationKind);
//! let infos = storage
//!     .list(&FolderInfo::root(EntityKind::Conversation, "u1"), ListOptions::recursive())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod api_storage;
mod client;
mod config;
mod error;
pub mod kinds;
pub mod publication;
mod storage;
pub mod upload;

pub use api_storage::{ApiEntityStorage, ApplicationStorage, ConversationStorage, PromptStorage};
pub use client::{check_status, read_json, ApiClient};
pub use config::{ApiConfig, PublicationEndpoints};
pub use error::{ApiError, ApiResult};
pub use kinds::{
    ApplicationKind, ApplicationPayload, ConversationKind, ConversationPayload, EntityKindSpec,
    Message, PromptKind, PromptPayload, Role, StoredDocument,
};
pub use publication::{
    diff_publication, PublicationApi, ResourceChange, ResourceDiff, ResourceDraft, ResourceRef,
};
pub use storage::{EntityStorage, ListOptions};
pub use upload::{FileMetadata, FileUploader, UploadSession};
