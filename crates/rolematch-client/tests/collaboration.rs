//! Several editors sharing one store.

use std::sync::Arc;
use std::time::Duration;

use rolematch_backend::{DocumentStore, MemoryStore, SqliteStore};
use rolematch_client::{
    ClientConfig, ConflictPolicy, EditorError, EditorHandle, ExportFormat, SaveStatus,
};
use rolematch_types::{DocumentKey, Principal};

fn amy() -> Principal {
    Principal::from_email("amy@example.org")
}

fn bo() -> Principal {
    Principal::from_email("bo@example.org")
}

/// Poll until `cond` holds, yielding to background tasks between checks.
async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never became true");
}

#[tokio::test(start_paused = true)]
async fn test_foreign_save_reaches_other_editor() {
    let store = Arc::new(MemoryStore::new());
    let config = ClientConfig::default();
    let a = EditorHandle::open(store.clone(), amy(), &config).await;
    let b = EditorHandle::open(store.clone(), bo(), &config).await;

    let group = a.snapshot().groups[0].id;
    a.rename_group(group, "Renamed Trio").unwrap();
    a.flush().await.unwrap();
    assert_eq!(a.status(), SaveStatus::Saved);
    assert_eq!(a.saved_by().as_deref(), Some("you"));

    eventually(|| b.snapshot().groups[0].name == "Renamed Trio").await;
    assert_eq!(b.base_version(), 1);
    assert_eq!(b.status(), SaveStatus::Saved);
    assert_eq!(b.saved_by().as_deref(), Some("amy@example.org"));
}

#[tokio::test(start_paused = true)]
async fn test_foreign_update_discards_unsaved_edits() {
    let store = Arc::new(MemoryStore::new());
    let config = ClientConfig::default();
    let a = EditorHandle::open(store.clone(), amy(), &config).await;
    let b = EditorHandle::open(store.clone(), bo(), &config).await;

    b.add_stakeholder("Cy Young").unwrap();
    assert_eq!(b.status(), SaveStatus::Unsaved);

    let group = a.snapshot().groups[0].id;
    a.rename_group(group, "Renamed Trio").unwrap();
    a.flush().await.unwrap();

    eventually(|| b.snapshot().groups[0].name == "Renamed Trio").await;
    assert!(b.snapshot().stakeholders.is_empty());
    assert_eq!(b.status(), SaveStatus::Saved);

    // B's debounce fires with nothing left to save.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(store.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_coalesce_into_one_write() {
    let store = Arc::new(MemoryStore::new());
    let a = EditorHandle::open(store.clone(), amy(), &ClientConfig::default()).await;
    let group = a.snapshot().groups[0].id;

    a.rename_group(group, "One").unwrap();
    a.rename_group(group, "Two").unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.write_count(), 0);

    // Restarts the window.
    a.rename_group(group, "Three").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(store.write_count(), 0);
    assert_eq!(a.status(), SaveStatus::Unsaved);

    let mut status = a.subscribe_status();
    status.wait_for(|s| *s == SaveStatus::Saved).await.unwrap();
    assert_eq!(store.write_count(), 1);

    let stored = store.fetch(&DocumentKey::main()).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.roster.groups[0].name, "Three");
}

#[tokio::test(start_paused = true)]
async fn test_offline_save_fails_then_recovers() {
    let store = Arc::new(MemoryStore::new());
    let a = EditorHandle::open(store.clone(), amy(), &ClientConfig::default()).await;
    store.set_offline(true);

    a.add_stakeholder("Dana Smith").unwrap();
    let err = a.flush().await.unwrap_err();
    assert!(matches!(err, EditorError::Save(_)));
    assert_eq!(a.status(), SaveStatus::Error);
    assert_eq!(a.snapshot().stakeholders.len(), 1);

    store.set_offline(false);
    a.flush().await.unwrap();
    assert_eq!(a.status(), SaveStatus::Saved);
    let stored = store.fetch(&DocumentKey::main()).await.unwrap().unwrap();
    assert_eq!(stored.roster.stakeholders.names(), vec!["Dana Smith"]);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_store_opens_on_defaults() {
    let store = Arc::new(MemoryStore::new());
    store.set_offline(true);
    let a = EditorHandle::open(store.clone(), amy(), &ClientConfig::default()).await;
    assert_eq!(a.status(), SaveStatus::Saved);
    assert_eq!(a.snapshot().groups.len(), 6);
    assert_eq!(a.progress().to_string(), "0/19");
}

#[tokio::test(start_paused = true)]
async fn test_delete_group_respects_confirmation() {
    let store = Arc::new(MemoryStore::new());
    let a = EditorHandle::open(store.clone(), amy(), &ClientConfig::default()).await;
    let group = a.snapshot().groups[2].id;

    assert!(!a.delete_group(group, &|_: &str| false).unwrap());
    assert_eq!(a.snapshot().groups.len(), 6);
    assert_eq!(a.status(), SaveStatus::Saved);

    assert!(a.delete_group(group, &|_: &str| true).unwrap());
    assert_eq!(a.snapshot().groups.len(), 5);
    assert_eq!(a.status(), SaveStatus::Unsaved);
    assert!(a.delete_group(group, &|_: &str| true).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_export_reflects_assignments() {
    let store = Arc::new(MemoryStore::new());
    let a = EditorHandle::open(store.clone(), amy(), &ClientConfig::default()).await;
    let dana = a.add_stakeholder("Dana Smith").unwrap();
    let roster = a.snapshot();
    let group = &roster.groups[0];
    a.assign_role(group.id, group.roles[0].id, Some(dana)).unwrap();

    let csv = a.export(ExportFormat::Csv);
    assert_eq!(csv.filename, "phase1_role_assignments.csv");
    assert!(csv.contents.contains(
        r#""UME-MD Trio","Educator","Clinical Skills Director","Dana Smith""#
    ));

    let md = a.export(ExportFormat::Markdown);
    assert!(md.contents.ends_with("**Progress:** 1/19 roles assigned\n"));
}

/// Two stores on one SQLite file share data but not change feeds, so
/// neither editor hears about the other's writes.
fn split_stores(dir: &tempfile::TempDir) -> (Arc<SqliteStore>, Arc<SqliteStore>) {
    let path = dir.path().join("rolematch.db");
    (
        Arc::new(SqliteStore::open(&path).unwrap()),
        Arc::new(SqliteStore::open(&path).unwrap()),
    )
}

#[tokio::test(start_paused = true)]
async fn test_same_user_in_two_sessions_keeps_saving() {
    let store = Arc::new(MemoryStore::new());
    let config = ClientConfig::default();
    let first = EditorHandle::open(store.clone(), amy(), &config).await;
    let second = EditorHandle::open(store.clone(), amy(), &config).await;
    let group = first.snapshot().groups[0].id;

    first.rename_group(group, "From first").unwrap();
    first.flush().await.unwrap();

    // The first session's write is our own echo, so the second session
    // only learns about it when its own save is rejected.
    second.rename_group(group, "From second").unwrap();
    match second.flush().await {
        Err(EditorError::Save(e)) => assert!(e.is_conflict(), "unexpected error: {e}"),
        other => panic!("expected a conflict, got {other:?}"),
    }
    assert_eq!(second.status(), SaveStatus::Saved);
    assert_eq!(second.base_version(), 1);
    assert_eq!(second.snapshot().groups[0].name, "From first");

    second.rename_group(group, "Second again").unwrap();
    second.flush().await.unwrap();
    assert_eq!(second.status(), SaveStatus::Saved);
    assert_eq!(second.base_version(), 2);

    let stored = store.fetch(&DocumentKey::main()).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.roster.groups[0].name, "Second again");
    // Two accepted writes plus the rejected one.
    assert_eq!(store.write_count(), 3);
}

#[tokio::test]
async fn test_checked_save_reports_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (left, right) = split_stores(&dir);
    let config = ClientConfig::default();
    let a = EditorHandle::open(left.clone(), amy(), &config).await;
    let b = EditorHandle::open(right.clone(), bo(), &config).await;

    a.add_stakeholder("Dana Smith").unwrap();
    a.flush().await.unwrap();

    b.add_stakeholder("Eli Park").unwrap();
    match b.flush().await {
        Err(EditorError::Save(e)) => assert!(e.is_conflict(), "unexpected error: {e}"),
        other => panic!("expected a conflict, got {other:?}"),
    }
    let stored = left.fetch(&DocumentKey::main()).await.unwrap().unwrap();
    assert_eq!(stored.roster.stakeholders.names(), vec!["Dana Smith"]);

    // The rejected save re-reads the stored document, so B can carry on.
    assert_eq!(b.status(), SaveStatus::Saved);
    assert_eq!(b.snapshot().stakeholders.names(), vec!["Dana Smith"]);
    b.add_stakeholder("Eli Park").unwrap();
    b.flush().await.unwrap();

    let stored = left.fetch(&DocumentKey::main()).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.roster.stakeholders.names(), vec!["Dana Smith", "Eli Park"]);
}

#[tokio::test]
async fn test_last_writer_wins_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let (left, right) = split_stores(&dir);
    let config = ClientConfig {
        conflict_policy: ConflictPolicy::LastWriterWins,
        ..ClientConfig::default()
    };
    let a = EditorHandle::open(left.clone(), amy(), &config).await;
    let b = EditorHandle::open(right.clone(), bo(), &config).await;

    a.add_stakeholder("Dana Smith").unwrap();
    a.flush().await.unwrap();
    b.add_stakeholder("Eli Park").unwrap();
    b.flush().await.unwrap();
    assert_eq!(b.status(), SaveStatus::Saved);

    let stored = left.fetch(&DocumentKey::main()).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.roster.stakeholders.names(), vec!["Eli Park"]);
    assert_eq!(stored.updated_by.unwrap().email, "bo@example.org");
}
