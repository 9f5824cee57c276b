mod common;

use chatsync_state::selectors::{
    any_loading, entities_in_folder, failed_entities, is_loading, search_by_name,
    selected_entities, status_of,
};
use chatsync_state::EntityStore;
use chatsync_types::{EntityKind, EntityStatus, FolderInfo};
use common::{entity, folder, info, key, root};
use pretty_assertions::assert_eq;

fn store() -> EntityStore<String> {
    let mut store = EntityStore::new();
    store.replace_subtree(
        &root(),
        vec![
            info(&[], "Daily Summary"),
            info(&["work"], "Standup notes"),
            info(&["work", "2024"], "summary draft"),
            info(&["home"], "Recipes"),
        ],
    );
    store
}

fn names<P>(records: Vec<&chatsync_state::EntityRecord<P>>) -> Vec<String> {
    records.iter().map(|r| r.name().to_string()).collect()
}

#[test]
fn entities_in_folder_direct_and_recursive() {
    let store = store();
    let work = folder(&["work"]);

    assert_eq!(names(entities_in_folder(&store, &work, false)), vec!["Standup notes"]);
    assert_eq!(
        names(entities_in_folder(&store, &work, true)),
        vec!["Standup notes", "summary draft"]
    );
    assert_eq!(entities_in_folder(&store, &root(), true).len(), 4);
}

#[test]
fn entities_in_folder_of_other_kind_is_empty() {
    let store = store();
    let conversations = FolderInfo::root(EntityKind::Conversation, "u1");
    assert!(entities_in_folder(&store, &conversations, true).is_empty());
}

#[test]
fn search_is_case_insensitive() {
    let store = store();
    assert_eq!(
        names(search_by_name(&store, "SUMMARY")),
        vec!["Daily Summary", "summary draft"]
    );
    assert!(search_by_name(&store, "nothing").is_empty());
    assert_eq!(search_by_name(&store, "  ").len(), 4);
}

#[test]
fn loading_selectors() {
    let mut store = store();
    let a = key(&[], "Daily Summary");
    assert!(!any_loading(&store));
    assert!(!is_loading(&store, &a));

    store.begin_load(&a);
    assert!(any_loading(&store));
    assert!(is_loading(&store, &a));
    assert!(!is_loading(&store, &key(&[], "ghost")));
}

#[test]
fn failed_and_status_selectors() {
    let mut store = store();
    store.upsert_optimistic(entity(&[], "new", "text"));
    store.mark_failed(&key(&[], "new"), "HTTP 500");

    assert_eq!(names(failed_entities(&store)), vec!["new"]);
    assert_eq!(status_of(&store, &key(&[], "new")), EntityStatus::Failed);
    assert_eq!(status_of(&store, &key(&["home"], "Recipes")), EntityStatus::Listed);
    assert_eq!(status_of(&store, &key(&[], "ghost")), EntityStatus::Uninitialized);
}

#[test]
fn selected_entities_follow_selection() {
    let mut store = store();
    assert!(selected_entities(&store).is_empty());

    store.select(&key(&["home"], "Recipes"));
    store.select(&key(&[], "Daily Summary"));
    assert_eq!(
        names(selected_entities(&store)),
        vec!["Daily Summary", "Recipes"]
    );
}
