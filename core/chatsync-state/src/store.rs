//! The local entity cache.
//!
//! One [`EntityStore`] holds the records of one entity kind, the current
//! selection and the request sequence numbers that decide whether a late
//! response may still be applied.

use chatsync_types::{Entity, EntityInfo, EntityKey, EntityStatus, FolderInfo};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// A cached entity: its listing info, load status, content once fetched and
/// the last error, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord<P> {
    pub info: EntityInfo,
    pub status: EntityStatus,
    pub content: Option<P>,
    pub error: Option<String>,
}

impl<P> EntityRecord<P> {
    fn listed(info: EntityInfo) -> Self {
        Self {
            info: info.with_status(EntityStatus::Listed),
            status: EntityStatus::Listed,
            content: None,
            error: None,
        }
    }

    pub fn key(&self) -> &EntityKey {
        &self.info.key
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    fn set_status(&mut self, status: EntityStatus) {
        self.status = status;
        self.info.status = status;
    }
}

/// Proof that a request was started, used to discard its result if a newer
/// request for the same scope started in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    scope: String,
    seq: u64,
}

impl RequestTicket {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Request scope for a folder listing.
pub fn folder_scope(folder: &FolderInfo) -> String {
    format!("folder:{}", folder.id())
}

/// Request scope for a single entity.
pub fn entity_scope(key: &EntityKey) -> String {
    format!("entity:{key}")
}

/// Explicitly constructed cache of entities of one kind.
#[derive(Debug, Clone)]
pub struct EntityStore<P> {
    records: BTreeMap<EntityKey, EntityRecord<P>>,
    selected: BTreeSet<EntityKey>,
    sequences: HashMap<String, u64>,
    /// Sequence of the last listing applied per folder.
    applied: HashMap<FolderInfo, u64>,
    /// Shared across scopes and never reset, so tickets from before a
    /// `clear` can never become current again.
    next_seq: u64,
}

impl<P> Default for EntityStore<P> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            selected: BTreeSet::new(),
            sequences: HashMap::new(),
            applied: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<P: Clone> EntityStore<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntityRecord<P>> {
        self.records.get(key)
    }

    /// All records, ordered by key.
    pub fn records(&self) -> impl Iterator<Item = &EntityRecord<P>> {
        self.records.values()
    }

    pub fn selected_keys(&self) -> &BTreeSet<EntityKey> {
        &self.selected
    }

    // ── Request sequencing ───────────────────────────────────────

    /// Starts a request for `scope`; any ticket issued earlier for the same
    /// scope is now stale.
    pub fn begin_request(&mut self, scope: impl Into<String>) -> RequestTicket {
        let scope = scope.into();
        self.next_seq += 1;
        self.sequences.insert(scope.clone(), self.next_seq);
        RequestTicket {
            scope,
            seq: self.next_seq,
        }
    }

    /// Whether `ticket` is still the latest for its scope.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.sequences.get(&ticket.scope) == Some(&ticket.seq)
    }

    // ── Listing ──────────────────────────────────────────────────

    /// Replaces every record under `folder` (recursively) with `infos`.
    ///
    /// Keys present before and after keep their content and status. Keys
    /// that vanished are dropped unless a write for them is still in flight.
    pub fn replace_subtree(&mut self, folder: &FolderInfo, infos: Vec<EntityInfo>) {
        let mut incoming: BTreeMap<EntityKey, EntityInfo> = infos
            .into_iter()
            .filter(|info| info.kind == folder.kind && folder.contains(&info.key))
            .map(|info| (info.key.clone(), info))
            .collect();

        let mut dropped = Vec::new();
        for (key, record) in self.records.iter_mut() {
            if !folder.contains(key) {
                continue;
            }
            match incoming.remove(key) {
                Some(info) => {
                    if record.status == EntityStatus::Uninitialized {
                        record.set_status(EntityStatus::Listed);
                    }
                    record.info = info.with_status(record.status);
                }
                None if record.status.is_loading() => {}
                None => dropped.push(key.clone()),
            }
        }

        for key in &dropped {
            self.records.remove(key);
            self.selected.remove(key);
        }
        let added = incoming.len();
        for (key, info) in incoming {
            self.records.insert(key, EntityRecord::listed(info));
        }

        debug!(
            "Replaced {}: {} added, {} dropped, {} total",
            folder.id(),
            added,
            dropped.len(),
            self.records.len()
        );
    }

    /// Applies a listing if `ticket` is still current and no listing started
    /// after it was applied to an overlapping folder (an ancestor or a
    /// descendant). Returns whether it was applied.
    pub fn apply_listing(
        &mut self,
        ticket: &RequestTicket,
        folder: &FolderInfo,
        infos: Vec<EntityInfo>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!("Discarding stale listing of {}", folder.id());
            return false;
        }
        let superseded = self.applied.iter().any(|(applied, &seq)| {
            seq > ticket.seq && (folder.contains_folder(applied) || applied.contains_folder(folder))
        });
        if superseded {
            debug!(
                "Discarding listing of {}: an overlapping folder was listed since",
                folder.id()
            );
            return false;
        }
        self.replace_subtree(folder, infos);
        self.applied.insert(folder.clone(), ticket.seq);
        true
    }

    // ── Per-entity status ────────────────────────────────────────

    /// Marks a known entity as loading. Returns its info, or `None` if the
    /// key is not cached.
    pub fn begin_load(&mut self, key: &EntityKey) -> Option<EntityInfo> {
        let record = self.records.get_mut(key)?;
        if !record.status.is_loading() {
            record.set_status(EntityStatus::Loading);
        }
        record.error = None;
        Some(record.info.clone())
    }

    /// Inserts or overwrites an entity optimistically with status `Loading`.
    /// The content is visible immediately.
    pub fn upsert_optimistic(&mut self, entity: Entity<P>) {
        let key = entity.info.key.clone();
        let record = EntityRecord {
            info: entity.info.with_status(EntityStatus::Loading),
            status: EntityStatus::Loading,
            content: Some(entity.payload),
            error: None,
        };
        self.records.insert(key, record);
    }

    /// Settles a load or write successfully. Ignored for unknown keys, so a
    /// response for a deleted entity cannot bring it back.
    pub fn mark_loaded(&mut self, info: EntityInfo, content: P) -> bool {
        let Some(record) = self.records.get_mut(&info.key) else {
            debug!("Ignoring result for uncached {}", info.key);
            return false;
        };
        if !record.status.can_transition_to(EntityStatus::Loaded) {
            warn!("{} cannot go from {:?} to Loaded", info.key, record.status);
            return false;
        }
        record.info = info;
        record.set_status(EntityStatus::Loaded);
        record.content = Some(content);
        record.error = None;
        true
    }

    /// Settles a load or write with an error. Content already shown is kept.
    pub fn mark_failed(&mut self, key: &EntityKey, error: impl Into<String>) -> bool {
        let Some(record) = self.records.get_mut(key) else {
            return false;
        };
        if !record.status.can_transition_to(EntityStatus::Failed) {
            warn!("{} cannot go from {:?} to Failed", key, record.status);
            return false;
        }
        record.set_status(EntityStatus::Failed);
        record.error = Some(error.into());
        true
    }

    /// Removes an entity and its selection.
    pub fn remove(&mut self, key: &EntityKey) -> Option<EntityRecord<P>> {
        self.selected.remove(key);
        self.records.remove(key)
    }

    /// Re-keys a record after a move, carrying content and selection over.
    pub fn relocate(&mut self, old: &EntityKey, moved: EntityInfo) {
        let was_selected = self.selected.remove(old);
        let record = match self.records.remove(old) {
            Some(mut record) => {
                let status = record.status;
                record.info = moved.with_status(status);
                record
            }
            None => EntityRecord::listed(moved),
        };
        let key = record.info.key.clone();
        if was_selected {
            self.selected.insert(key.clone());
        }
        self.records.insert(key, record);
    }

    // ── Selection ────────────────────────────────────────────────

    /// Selects a cached entity. Returns `false` for unknown keys.
    pub fn select(&mut self, key: &EntityKey) -> bool {
        if !self.records.contains_key(key) {
            return false;
        }
        self.selected.insert(key.clone());
        true
    }

    pub fn deselect(&mut self, key: &EntityKey) -> bool {
        self.selected.remove(key)
    }

    /// Replaces the selection, ignoring uncached keys.
    pub fn set_selection<'a>(&mut self, keys: impl IntoIterator<Item = &'a EntityKey>) {
        self.selected = keys
            .into_iter()
            .filter(|key| self.records.contains_key(*key))
            .cloned()
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Drops all records, the selection and the request sequences.
    pub fn clear(&mut self) {
        self.records.clear();
        self.selected.clear();
        self.sequences.clear();
        self.applied.clear();
    }
}
