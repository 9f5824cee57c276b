//! In-memory storage used to drive the coordinator.

#![allow(dead_code)]

use async_trait::async_trait;
use chatsync_api::{ApiError, ApiResult, EntityStorage, ListOptions};
use chatsync_types::{Entity, EntityInfo, EntityKey, EntityKind, EntityStatus, FolderInfo};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn key(folders: &[&str], name: &str) -> EntityKey {
    EntityKey::new("u1", folders.iter().map(|s| s.to_string()).collect(), name).unwrap()
}

/// Key from a `folder/sub/name` path inside bucket `u1`.
pub fn key_at(path: &str) -> EntityKey {
    let mut segments: Vec<String> = path.split('/').map(str::to_string).collect();
    let name = segments.pop().unwrap();
    EntityKey::new("u1", segments, name).unwrap()
}

pub fn info(folders: &[&str], name: &str) -> EntityInfo {
    EntityInfo::new(EntityKind::Prompt, key(folders, name))
}

pub fn entity(folders: &[&str], name: &str, text: &str) -> Entity<String> {
    Entity::new(info(folders, name), text.to_string())
}

pub fn root() -> FolderInfo {
    FolderInfo::root(EntityKind::Prompt, "u1")
}

pub fn folder(path: &[&str]) -> FolderInfo {
    FolderInfo::new(
        EntityKind::Prompt,
        "u1",
        path.iter().map(|s| s.to_string()).collect(),
    )
}

fn server_error(message: &str) -> ApiError {
    ApiError::RemoteStorage {
        status: 500,
        body: serde_json::json!({ "error": message }),
    }
}

/// Prompt storage backed by a map, with failure injection and a gate to
/// hold a listing until the test releases it.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    docs: Arc<Mutex<BTreeMap<EntityKey, String>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
    next_list_gate: Arc<Mutex<Option<Arc<Notify>>>>,
    list_calls: Arc<AtomicUsize>,
}

impl MemoryStorage {
    /// Seeds entries given as `("folder/sub/name", text)`.
    pub fn with(entries: &[(&str, &str)]) -> Self {
        let storage = Self::default();
        for (path, text) in entries {
            storage.put(key_at(path), text);
        }
        storage
    }

    pub fn put(&self, key: EntityKey, text: &str) {
        self.docs.lock().unwrap().insert(key, text.to_string());
    }

    pub fn remove(&self, key: &EntityKey) {
        self.docs.lock().unwrap().remove(key);
    }

    pub fn text(&self, key: &EntityKey) -> Option<String> {
        self.docs.lock().unwrap().get(key).cloned()
    }

    /// Makes every call of `op` ("list", "get", "create", "update",
    /// "delete") fail with HTTP 500.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// The next `list` call snapshots the data, then waits for the returned
    /// gate before answering.
    pub fn hold_next_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.next_list_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: &'static str) -> ApiResult<()> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(server_error(op));
        }
        Ok(())
    }

    fn stored_info(key: &EntityKey) -> EntityInfo {
        EntityInfo {
            kind: EntityKind::Prompt,
            key: key.clone(),
            updated_at: Some(1),
            status: EntityStatus::Listed,
        }
    }
}

#[async_trait]
impl EntityStorage for MemoryStorage {
    type Payload = String;

    fn kind(&self) -> EntityKind {
        EntityKind::Prompt
    }

    async fn list(&self, folder: &FolderInfo, options: ListOptions) -> ApiResult<Vec<EntityInfo>> {
        let snapshot: Vec<EntityInfo> = self
            .docs
            .lock()
            .unwrap()
            .keys()
            .filter(|k| {
                if options.recursive {
                    folder.contains(k)
                } else {
                    folder.contains_directly(k)
                }
            })
            .map(Self::stored_info)
            .collect();
        let gate = self.next_list_gate.lock().unwrap().take();
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check("list")?;
        Ok(snapshot)
    }

    async fn list_folders(
        &self,
        _folder: &FolderInfo,
        _options: ListOptions,
    ) -> ApiResult<Vec<FolderInfo>> {
        Ok(Vec::new())
    }

    async fn get(&self, info: &EntityInfo) -> ApiResult<Entity<String>> {
        self.check("get")?;
        let text = self.text(&info.key).ok_or(ApiError::RemoteStorage {
            status: 404,
            body: serde_json::Value::Null,
        })?;
        Ok(Entity::new(info.clone(), text))
    }

    async fn create(&self, entity: &Entity<String>) -> ApiResult<EntityInfo> {
        self.check("create")?;
        self.put(entity.info.key.clone(), &entity.payload);
        Ok(Self::stored_info(&entity.info.key))
    }

    async fn update(&self, entity: &Entity<String>) -> ApiResult<EntityInfo> {
        self.check("update")?;
        self.put(entity.info.key.clone(), &entity.payload);
        Ok(Self::stored_info(&entity.info.key))
    }

    async fn delete(&self, info: &EntityInfo) -> ApiResult<()> {
        self.check("delete")?;
        self.remove(&info.key);
        Ok(())
    }
}
