//! Entity storage abstraction.
//!
//! One capability set (list, get, create, update, delete, move) with one
//! implementation per entity kind.

use crate::error::ApiResult;
use async_trait::async_trait;
use chatsync_types::{Entity, EntityInfo, EntityKind, FolderInfo};
use tracing::{info, warn};

/// Options for a listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOptions {
    /// Include items in nested folders.
    pub recursive: bool,
}

impl ListOptions {
    pub fn recursive() -> Self {
        Self { recursive: true }
    }

    pub fn flat() -> Self {
        Self { recursive: false }
    }
}

/// Uniform CRUD/list facade over the remote hierarchical object store.
#[async_trait]
pub trait EntityStorage: Send + Sync {
    /// Kind-specific payload carried by full entities.
    type Payload: Clone + Send + Sync + 'static;

    /// The kind of entity this storage manages.
    fn kind(&self) -> EntityKind;

    /// Lists entity infos under `folder`. Issues exactly one request and
    /// never retries.
    async fn list(&self, folder: &FolderInfo, options: ListOptions) -> ApiResult<Vec<EntityInfo>>;

    /// Lists the folders under `folder`.
    async fn list_folders(
        &self,
        folder: &FolderInfo,
        options: ListOptions,
    ) -> ApiResult<Vec<FolderInfo>>;

    /// Fetches the full entity and reconciles it with the listing info.
    async fn get(&self, info: &EntityInfo) -> ApiResult<Entity<Self::Payload>>;

    /// Persists a new entity. Idempotent upsert.
    async fn create(&self, entity: &Entity<Self::Payload>) -> ApiResult<EntityInfo>;

    /// Persists changes to an existing entity. Idempotent upsert.
    async fn update(&self, entity: &Entity<Self::Payload>) -> ApiResult<EntityInfo>;

    /// Removes an entity. Deleting an absent entity succeeds.
    async fn delete(&self, info: &EntityInfo) -> ApiResult<()>;

    /// Moves an entity into `new_folder` of the same bucket.
    ///
    /// Without a native move endpoint this is read old → create new → delete
    /// old. A failed create leaves the old entity untouched. A failed delete
    /// removes the new copy again and returns the delete error; if that
    /// cleanup fails too, both copies remain and a warning is logged.
    async fn move_to(&self, info: &EntityInfo, new_folder: &[String]) -> ApiResult<EntityInfo> {
        if info.key.folder_path == new_folder {
            return Ok(info.clone());
        }

        let entity = self.get(info).await?;
        let new_key = info.key.with_folder(new_folder.to_vec())?;
        let moved = Entity::new(
            EntityInfo::new(info.kind, new_key).with_status(info.status),
            entity.payload,
        );

        let created = self.create(&moved).await?;

        if let Err(delete_err) = self.delete(info).await {
            warn!(
                "move of {} failed deleting the original: {}",
                info.key, delete_err
            );
            if let Err(cleanup_err) = self.delete(&created).await {
                warn!(
                    "entity {} now exists as both {} and {}: {}",
                    info.name(),
                    info.key,
                    created.key,
                    cleanup_err
                );
            }
            return Err(delete_err);
        }

        info!("Moved {} to {}", info.key, created.key);
        Ok(created)
    }
}
