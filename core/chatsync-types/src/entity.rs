use crate::key::{decode_segment, folder_path_string, EntityKey, EntityKind, KEY_SEPARATOR};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Load status of a single entity in the local cache.
///
/// `Uninitialized -> Listed -> Loading -> Loaded | Failed`, and
/// `Failed -> Loading` when the caller retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    #[default]
    Uninitialized,
    Listed,
    Loading,
    Loaded,
    Failed,
}

impl EntityStatus {
    /// Whether `self -> next` is a legal transition.
    ///
    /// A fresh listing may re-list anything that is not mid-request, and an
    /// optimistic local write may start loading from any settled state.
    pub fn can_transition_to(self, next: EntityStatus) -> bool {
        use EntityStatus::*;
        match (self, next) {
            (Loading, Loaded) | (Loading, Failed) => true,
            (Loading, _) => false,
            (_, Listed) => true,
            (_, Loading) => true,
            (Uninitialized, Failed) => true,
            _ => false,
        }
    }

    /// Whether a request for this entity is in flight.
    pub fn is_loading(self) -> bool {
        self == EntityStatus::Loading
    }

    /// Whether the last request settled (successfully or not).
    pub fn is_settled(self) -> bool {
        matches!(self, EntityStatus::Loaded | EntityStatus::Failed)
    }
}

/// Lightweight listing-only descriptor of a stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInfo {
    pub kind: EntityKind,
    pub key: EntityKey,
    /// Last modification time reported by the server, epoch millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub status: EntityStatus,
}

impl EntityInfo {
    pub fn new(kind: EntityKind, key: EntityKey) -> Self {
        Self {
            kind,
            key,
            updated_at: None,
            status: EntityStatus::Uninitialized,
        }
    }

    /// The full API id, e.g. `prompts/u1/work/Summary`.
    pub fn id(&self) -> Result<String> {
        self.key.api_id(self.kind)
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Id of the containing folder, e.g. `prompts/u1/work`.
    pub fn folder_id(&self) -> String {
        format!(
            "{}{KEY_SEPARATOR}{}",
            self.kind.prefix(),
            self.key.parent_folder()
        )
    }

    pub fn with_status(mut self, status: EntityStatus) -> Self {
        self.status = status;
        self
    }
}

/// A folder returned by a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderInfo {
    pub kind: EntityKind,
    pub bucket: String,
    pub folder_path: Vec<String>,
}

impl FolderInfo {
    pub fn new(kind: EntityKind, bucket: impl Into<String>, folder_path: Vec<String>) -> Self {
        Self {
            kind,
            bucket: bucket.into(),
            folder_path,
        }
    }

    /// Parses a folder id such as `conversations/u1/chats/` (trailing
    /// separator optional).
    pub fn from_id(id: &str) -> Result<Self> {
        let trimmed = id.strip_suffix(KEY_SEPARATOR).unwrap_or(id);
        let (prefix, rest) = trimmed
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| Error::MalformedKey(format!("missing kind prefix in {id:?}")))?;
        let kind = EntityKind::from_prefix(prefix)
            .ok_or_else(|| Error::MalformedKey(format!("unknown kind prefix {prefix:?}")))?;

        let mut segments = rest
            .split(KEY_SEPARATOR)
            .map(decode_segment)
            .collect::<Result<Vec<_>>>()?;
        if segments.iter().any(String::is_empty) {
            return Err(Error::MalformedKey(format!("empty segment in folder {id:?}")));
        }
        let bucket = segments.remove(0);
        Ok(Self::new(kind, bucket, segments))
    }

    /// The bucket root folder.
    pub fn root(kind: EntityKind, bucket: impl Into<String>) -> Self {
        Self::new(kind, bucket, Vec::new())
    }

    /// Folder id, e.g. `conversations/u1/chats/work`.
    pub fn id(&self) -> String {
        format!(
            "{}{KEY_SEPARATOR}{}",
            self.kind.prefix(),
            folder_path_string(&self.bucket, &self.folder_path)
        )
    }

    /// Display name (last segment, or the bucket for a root folder).
    pub fn name(&self) -> &str {
        self.folder_path.last().unwrap_or(&self.bucket)
    }

    /// Whether `key` lives in this folder or below it.
    pub fn contains(&self, key: &EntityKey) -> bool {
        key.is_within(&self.bucket, &self.folder_path)
    }

    /// Whether `other` is this folder or lies below it.
    pub fn contains_folder(&self, other: &FolderInfo) -> bool {
        self.kind == other.kind
            && self.bucket == other.bucket
            && other.folder_path.starts_with(&self.folder_path)
    }

    /// Whether `key` lives directly in this folder.
    pub fn contains_directly(&self, key: &EntityKey) -> bool {
        key.bucket == self.bucket && key.folder_path == self.folder_path
    }
}

/// A full entity: listing info plus its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<P> {
    pub info: EntityInfo,
    pub payload: P,
}

impl<P> Entity<P> {
    pub fn new(info: EntityInfo, payload: P) -> Self {
        Self { info, payload }
    }

    pub fn key(&self) -> &EntityKey {
        &self.info.key
    }

    /// Maps the payload, keeping the info.
    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> Entity<Q> {
        Entity {
            info: self.info,
            payload: f(self.payload),
        }
    }
}
