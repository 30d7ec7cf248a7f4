//! Integration tests for durable store behavior: load/save round
//! trips, corrupt-file recovery, and the distinction between a
//! missing file, a corrupt file, and a real I/O failure.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;

use taskdeck::store::{StoreError, TaskPatch, TaskStore};
use taskdeck::task::{Deadline, Priority, TaskId};

fn deadline(s: &str) -> Deadline {
    s.parse().unwrap()
}

#[test]
fn fresh_store_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::open(dir.path().join("tasks.json")).unwrap();
    assert!(store.is_empty());
    // Opening alone must not create the file; only a mutation persists.
    assert!(!dir.path().join("tasks.json").exists());
}

#[test]
fn collection_round_trips_field_for_field_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    let before = {
        let store = TaskStore::open(&path).unwrap();
        store
            .add(
                "Renew passport",
                Some(deadline("2026-09-15 10:00")),
                Priority::High,
                "bring old one",
            )
            .unwrap();
        store.add("Water plants", None, Priority::Low, "").unwrap();
        let third = store
            .add("Send invoice", Some(deadline("2026-08-08 09:00")), Priority::Medium, "")
            .unwrap();
        store.mark_reminded(third.id).unwrap();
        store
            .update(
                third.id,
                TaskPatch {
                    completed: Some(true),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        store.all()
    };

    let reopened = TaskStore::open(&path).unwrap();
    assert_eq!(reopened.all(), before);
}

#[test]
fn corrupt_file_recovery_backs_up_and_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    fs::write(&path, "definitely not json").unwrap();

    let store = TaskStore::open(&path).unwrap();
    assert!(store.is_empty());

    let backup = dir.path().join("tasks.bak.json");
    assert!(backup.exists());
    assert_eq!(fs::read_to_string(backup).unwrap(), "definitely not json");
}

#[test]
fn store_usable_after_corrupt_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    fs::write(&path, "[{\"id\": }").unwrap();

    let store = TaskStore::open(&path).unwrap();
    store.add("Fresh start", None, Priority::Medium, "").unwrap();

    let reopened = TaskStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.all()[0].title, "Fresh start");
}

#[test]
fn unreadable_path_surfaces_io_error() {
    // The "file" path has a regular file as its parent directory, so
    // any access fails with a real I/O error, not NotFound.
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();

    let result = TaskStore::open(blocker.join("tasks.json"));
    assert!(matches!(result, Err(StoreError::Io { .. })));
}

#[test]
fn unknown_fields_survive_a_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    fs::write(
        &path,
        r#"[{"id": 5, "title": "From newer version", "color": "teal", "starred": true}]"#,
    )
    .unwrap();

    let store = TaskStore::open(&path).unwrap();
    // Force a persist through an unrelated mutation.
    store.add("Another", None, Priority::Medium, "").unwrap();
    drop(store);

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"color\""));
    assert!(raw.contains("teal"));
    assert!(raw.contains("\"starred\""));
}

#[test]
fn deadline_string_round_trips_through_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    {
        let store = TaskStore::open(&path).unwrap();
        store
            .add("Dated", Some(deadline("2026-12-31 23:59")), Priority::Medium, "")
            .unwrap();
    }
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"2026-12-31 23:59\""));
}

#[test]
fn delete_twice_equals_delete_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let store = TaskStore::open(&path).unwrap();
    store.add("Keep", None, Priority::Medium, "").unwrap();
    let victim = store.add("Remove", None, Priority::Medium, "").unwrap();

    assert!(store.delete(victim.id).unwrap());
    let after_first = store.all();
    assert!(!store.delete(victim.id).unwrap());
    assert_eq!(store.all(), after_first);

    let reopened = TaskStore::open(&path).unwrap();
    assert_eq!(reopened.all(), after_first);
}

#[test]
fn update_of_missing_task_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let store = TaskStore::open(&path).unwrap();
    store.add("Only one", None, Priority::Medium, "").unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let err = store
        .update(
            TaskId::new(424_242),
            TaskPatch {
                title: Some("ghost".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn reminded_flag_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let id = {
        let store = TaskStore::open(&path).unwrap();
        let task = store
            .add("Remind once", Some(deadline("2026-08-07 12:00")), Priority::Medium, "")
            .unwrap();
        store.mark_reminded(task.id).unwrap();
        task.id
    };

    let reopened = TaskStore::open(&path).unwrap();
    let task = reopened.all().into_iter().find(|t| t.id == id).unwrap();
    assert!(task.reminded);
}
