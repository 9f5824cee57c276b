//! Pure read-only queries over an [`EntityStore`].

use crate::store::{EntityRecord, EntityStore};
use chatsync_types::{EntityKey, EntityStatus, FolderInfo};

/// Records of the selected entities, in key order.
pub fn selected_entities<P: Clone>(store: &EntityStore<P>) -> Vec<&EntityRecord<P>> {
    store
        .selected_keys()
        .iter()
        .filter_map(|key| store.get(key))
        .collect()
}

/// Whether a request for `key` is in flight.
pub fn is_loading<P: Clone>(store: &EntityStore<P>, key: &EntityKey) -> bool {
    store.get(key).is_some_and(|r| r.status.is_loading())
}

pub fn any_loading<P: Clone>(store: &EntityStore<P>) -> bool {
    store.records().any(|r| r.status.is_loading())
}

/// Records under `folder`: direct children only, or the whole subtree.
pub fn entities_in_folder<'a, P: Clone>(
    store: &'a EntityStore<P>,
    folder: &FolderInfo,
    recursive: bool,
) -> Vec<&'a EntityRecord<P>> {
    store
        .records()
        .filter(|r| r.info.kind == folder.kind)
        .filter(|r| {
            if recursive {
                folder.contains(r.key())
            } else {
                folder.contains_directly(r.key())
            }
        })
        .collect()
}

/// Case-insensitive substring match on entity names. An empty query matches
/// everything.
pub fn search_by_name<'a, P: Clone>(
    store: &'a EntityStore<P>,
    query: &str,
) -> Vec<&'a EntityRecord<P>> {
    let needle = query.trim().to_lowercase();
    store
        .records()
        .filter(|r| r.name().to_lowercase().contains(&needle))
        .collect()
}

pub fn failed_entities<P: Clone>(store: &EntityStore<P>) -> Vec<&EntityRecord<P>> {
    store
        .records()
        .filter(|r| r.status == EntityStatus::Failed)
        .collect()
}

/// Status of `key`; `Uninitialized` when it is not cached.
pub fn status_of<P: Clone>(store: &EntityStore<P>, key: &EntityKey) -> EntityStatus {
    store
        .get(key)
        .map(|r| r.status)
        .unwrap_or(EntityStatus::Uninitialized)
}
