use chatsync_types::{
    split_version, version_group, with_version, Entity, EntityInfo, EntityKey, EntityKind,
    EntityStatus, FolderInfo, ProgressEvent,
};

fn key(folders: &[&str], name: &str) -> EntityKey {
    EntityKey::new("u1", folders.iter().map(|s| s.to_string()).collect(), name).unwrap()
}

// ── EntityStatus ─────────────────────────────────────────────────

#[test]
fn status_default_is_uninitialized() {
    assert_eq!(EntityStatus::default(), EntityStatus::Uninitialized);
}

#[test]
fn status_happy_path() {
    use EntityStatus::*;
    assert!(Uninitialized.can_transition_to(Listed));
    assert!(Listed.can_transition_to(Loading));
    assert!(Loading.can_transition_to(Loaded));
    assert!(Loading.can_transition_to(Failed));
}

#[test]
fn status_failed_is_retryable() {
    assert!(EntityStatus::Failed.can_transition_to(EntityStatus::Loading));
}

#[test]
fn status_illegal_transitions() {
    use EntityStatus::*;
    assert!(!Listed.can_transition_to(Loaded));
    assert!(!Loading.can_transition_to(Listed));
    assert!(!Loaded.can_transition_to(Failed));
    assert!(!Uninitialized.can_transition_to(Loaded));
}

#[test]
fn status_flags() {
    assert!(EntityStatus::Loading.is_loading());
    assert!(EntityStatus::Loaded.is_settled());
    assert!(EntityStatus::Failed.is_settled());
    assert!(!EntityStatus::Listed.is_settled());
}

#[test]
fn status_serializes_screaming() {
    assert_eq!(
        serde_json::to_string(&EntityStatus::Loaded).unwrap(),
        "\"LOADED\""
    );
}

// ── EntityInfo / FolderInfo ──────────────────────────────────────

#[test]
fn info_ids() {
    let info = EntityInfo::new(EntityKind::Conversation, key(&["chats", "work"], "My Chat"));
    assert_eq!(info.id().unwrap(), "conversations/u1/chats/work/My%20Chat");
    assert_eq!(info.folder_id(), "conversations/u1/chats/work");
    assert_eq!(info.name(), "My Chat");
    assert_eq!(info.status, EntityStatus::Uninitialized);
}

#[test]
fn info_with_status() {
    let info = EntityInfo::new(EntityKind::Prompt, key(&[], "p")).with_status(EntityStatus::Listed);
    assert_eq!(info.status, EntityStatus::Listed);
}

#[test]
fn folder_contains() {
    let folder = FolderInfo::new(EntityKind::Prompt, "u1", vec!["a".into()]);
    assert_eq!(folder.id(), "prompts/u1/a");
    assert_eq!(folder.name(), "a");
    assert!(folder.contains(&key(&["a"], "x")));
    assert!(folder.contains(&key(&["a", "b"], "x")));
    assert!(folder.contains_directly(&key(&["a"], "x")));
    assert!(!folder.contains_directly(&key(&["a", "b"], "x")));
    assert!(!folder.contains(&key(&["b"], "x")));
}

#[test]
fn folder_contains_folder() {
    let root = FolderInfo::root(EntityKind::Prompt, "u1");
    let work = FolderInfo::new(EntityKind::Prompt, "u1", vec!["work".into()]);
    let nested = FolderInfo::new(EntityKind::Prompt, "u1", vec!["work".into(), "old".into()]);

    assert!(root.contains_folder(&work));
    assert!(work.contains_folder(&nested));
    assert!(work.contains_folder(&work));
    assert!(!work.contains_folder(&root));
    assert!(!root.contains_folder(&FolderInfo::root(EntityKind::Prompt, "u2")));
    assert!(!root.contains_folder(&FolderInfo::root(EntityKind::Conversation, "u1")));
}

#[test]
fn root_folder_name_is_bucket() {
    let folder = FolderInfo::root(EntityKind::File, "u1");
    assert_eq!(folder.name(), "u1");
    assert_eq!(folder.id(), "files/u1");
}

#[test]
fn entity_map_keeps_info() {
    let info = EntityInfo::new(EntityKind::Prompt, key(&[], "p"));
    let entity = Entity::new(info.clone(), 2).map(|n| n * 21);
    assert_eq!(entity.payload, 42);
    assert_eq!(entity.info, info);
    assert_eq!(entity.key().name, "p");
}

// ── Versions ─────────────────────────────────────────────────────

#[test]
fn split_version_cases() {
    assert_eq!(split_version("Summary__1.0.0"), ("Summary", Some("1.0.0")));
    assert_eq!(split_version("Summary"), ("Summary", None));
    assert_eq!(split_version("a__b__2"), ("a__b", Some("2")));
    assert_eq!(split_version("trailing__"), ("trailing__", None));
    assert_eq!(split_version("__1"), ("__1", None));
}

#[test]
fn with_version_replaces_existing() {
    assert_eq!(with_version("Summary", "1.0"), "Summary__1.0");
    assert_eq!(with_version("Summary__1.0", "2.0"), "Summary__2.0");
}

#[test]
fn versions_share_group_but_not_key() {
    let v1 = key(&["pub"], "Summary__1.0");
    let v2 = key(&["pub"], "Summary__2.0");
    assert_ne!(v1, v2);
    assert_eq!(version_group(&v1), version_group(&v2));
    assert_eq!(version_group(&v1).name, "Summary");
}

// ── ProgressEvent ────────────────────────────────────────────────

#[test]
fn progress_event_tagging() {
    let json = serde_json::to_value(ProgressEvent::Progress { percent: 40 }).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "progress", "percent": 40}));
    let done = ProgressEvent::Done { success: true };
    assert!(done.is_terminal());
    assert!(!ProgressEvent::Progress { percent: 1 }.is_terminal());
}
