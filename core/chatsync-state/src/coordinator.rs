//! Keeps an [`EntityStore`] consistent with an [`EntityStorage`].
//!
//! Writes are optimistic: the cache shows new content as `Loading` at once
//! and settles it to `Loaded` or `Failed` when the server answers. After each
//! successful mutation the affected folders are listed again and their
//! subtree in the cache is replaced.

use crate::error::{StateError, StateResult};
use crate::store::{entity_scope, folder_scope, EntityStore};
use chatsync_api::{EntityStorage, ListOptions};
use chatsync_types::{Entity, EntityInfo, EntityKey, FolderInfo};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

/// Applies storage operations to a cache of one entity kind.
pub struct SyncCoordinator<S: EntityStorage> {
    storage: Arc<S>,
    store: Arc<RwLock<EntityStore<S::Payload>>>,
}

impl<S: EntityStorage> Clone for SyncCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EntityStorage> SyncCoordinator<S> {
    /// Creates a coordinator with an empty cache.
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
            store: Arc::new(RwLock::new(EntityStore::new())),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read access to the cache, for use with the selectors.
    pub async fn read(&self) -> RwLockReadGuard<'_, EntityStore<S::Payload>> {
        self.store.read().await
    }

    /// Selects a cached entity.
    pub async fn select(&self, key: &EntityKey) -> bool {
        self.store.write().await.select(key)
    }

    pub async fn deselect(&self, key: &EntityKey) -> bool {
        self.store.write().await.deselect(key)
    }

    /// Lists `folder` recursively and replaces its subtree in the cache.
    ///
    /// The listing is applied only if no newer listing of the same folder
    /// started in the meantime; the infos are returned either way.
    pub async fn refresh(&self, folder: &FolderInfo) -> StateResult<Vec<EntityInfo>> {
        let ticket = self.store.write().await.begin_request(folder_scope(folder));
        let infos = self.storage.list(folder, ListOptions::recursive()).await?;

        let applied = self
            .store
            .write()
            .await
            .apply_listing(&ticket, folder, infos.clone());
        if applied {
            debug!("Refreshed {} ({} entities)", folder.id(), infos.len());
        }
        Ok(infos)
    }

    /// Fetches the full entity for a cached key: `Loading`, then `Loaded` or
    /// `Failed`.
    pub async fn load(&self, key: &EntityKey) -> StateResult<Entity<S::Payload>> {
        let (info, ticket) = {
            let mut store = self.store.write().await;
            let info = store
                .begin_load(key)
                .ok_or_else(|| StateError::NotFound(key.to_string()))?;
            (info, store.begin_request(entity_scope(key)))
        };

        match self.storage.get(&info).await {
            Ok(entity) => {
                let mut store = self.store.write().await;
                if store.is_current(&ticket) {
                    store.mark_loaded(entity.info.clone(), entity.payload.clone());
                }
                Ok(entity)
            }
            Err(e) => {
                warn!("Loading {} failed: {}", key, e);
                let mut store = self.store.write().await;
                if store.is_current(&ticket) {
                    store.mark_failed(key, e.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Creates an entity, showing it in the cache before the server answers.
    pub async fn create(&self, entity: Entity<S::Payload>) -> StateResult<EntityInfo> {
        let stored = self.write(entity, WriteOp::Create).await?;
        info!("Created {}", stored.key);
        Ok(stored)
    }

    /// Updates an entity, showing the new content before the server answers.
    pub async fn update(&self, entity: Entity<S::Payload>) -> StateResult<EntityInfo> {
        let stored = self.write(entity, WriteOp::Update).await?;
        info!("Updated {}", stored.key);
        Ok(stored)
    }

    /// Deletes a cached entity remotely, then drops it locally.
    pub async fn delete(&self, key: &EntityKey) -> StateResult<()> {
        let info = self.cached_info(key).await?;
        self.storage.delete(&info).await?;

        self.store.write().await.remove(key);
        self.relist(&[self.parent_of(&info)]).await;
        Ok(())
    }

    /// Moves a cached entity into `new_folder` of the same bucket. Content
    /// and selection follow the entity to its new key.
    pub async fn move_entity(
        &self,
        key: &EntityKey,
        new_folder: &[String],
    ) -> StateResult<EntityInfo> {
        let info = self.cached_info(key).await?;
        let moved = self.storage.move_to(&info, new_folder).await?;

        self.store.write().await.relocate(key, moved.clone());
        let old_parent = self.parent_of(&info);
        let new_parent = self.parent_of(&moved);
        if old_parent == new_parent {
            self.relist(&[old_parent]).await;
        } else {
            self.relist(&[old_parent, new_parent]).await;
        }
        Ok(moved)
    }

    /// Clears the cache. The coordinator stays usable.
    pub async fn shutdown(&self) {
        self.store.write().await.clear();
        debug!("Cache cleared");
    }

    async fn write(&self, entity: Entity<S::Payload>, op: WriteOp) -> StateResult<EntityInfo> {
        let key = entity.info.key.clone();
        let ticket = {
            let mut store = self.store.write().await;
            store.upsert_optimistic(entity.clone());
            store.begin_request(entity_scope(&key))
        };

        let result = match op {
            WriteOp::Create => self.storage.create(&entity).await,
            WriteOp::Update => self.storage.update(&entity).await,
        };

        match result {
            Ok(stored) => {
                {
                    let mut store = self.store.write().await;
                    if store.is_current(&ticket) {
                        store.mark_loaded(stored.clone(), entity.payload);
                    }
                }
                self.relist(&[self.parent_of(&stored)]).await;
                Ok(stored)
            }
            Err(e) => {
                warn!("Writing {} failed: {}", key, e);
                let mut store = self.store.write().await;
                if store.is_current(&ticket) {
                    store.mark_failed(&key, e.to_string());
                }
                Err(e.into())
            }
        }
    }

    async fn cached_info(&self, key: &EntityKey) -> StateResult<EntityInfo> {
        self.store
            .read()
            .await
            .get(key)
            .map(|r| r.info.clone())
            .ok_or_else(|| StateError::NotFound(key.to_string()))
    }

    fn parent_of(&self, info: &EntityInfo) -> FolderInfo {
        FolderInfo::new(info.kind, info.key.bucket.clone(), info.key.folder_path.clone())
    }

    /// Re-lists folders after a mutation. The mutation already succeeded, so
    /// a failed listing is only logged.
    async fn relist(&self, folders: &[FolderInfo]) {
        for folder in folders {
            if let Err(e) = self.refresh(folder).await {
                warn!("Re-listing {} failed: {}", folder.id(), e);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteOp {
    Create,
    Update,
}
