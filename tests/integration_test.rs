//! Integration tests for the stage, component and repository log working
//! together through the public API.
//!
//! The scenarios run against both the in-memory log and the file-backed log,
//! so the same behavior is checked for embedded and durable use.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;

use langrepo::component::{Component, SnapshotOptions};
use langrepo::entity::StringEntity;
use langrepo::repository::{ComponentFilter, FileLog, MemoryLog, RepositoryLog, components_tree};
use langrepo::stage::{RebaseOptions, Stage};
use langrepo::version::{MOODLE_19, MOODLE_20, Version};
use tempfile::TempDir;

const T1: i64 = 1_288_000_000;
const T2: i64 = T1 + 3_600;

fn v() -> &'static Version {
    Version::by_code(MOODLE_20).unwrap()
}

fn mod_foo(strings: &[StringEntity]) -> Component {
    let mut c = Component::new("modFoo", "en", v());
    for s in strings {
        c.add_string(s.clone(), false).unwrap();
    }
    c
}

fn snapshot(log: &dyn RepositoryLog, options: SnapshotOptions) -> Component {
    Component::from_snapshot(log, "modFoo", "en", v(), &options).unwrap()
}

/// Runs scenarios 1 to 4 against `log`.
fn run_lifecycle(log: Arc<dyn RepositoryLog>) {
    let mut stage = Stage::new(log.clone());

    // 1. initial commit
    stage.add(&mod_foo(&[StringEntity::at("save", "Save", T1)]), false).unwrap();
    let summary = stage.commit("initial", None, false).unwrap();
    assert_eq!(summary.rows(), 1);
    let current = snapshot(log.as_ref(), SnapshotOptions::default());
    let save = current.get_string("save").unwrap();
    assert_eq!(save.text.as_deref(), Some("Save"));
    assert!(!save.deleted);

    // 2. newer text, rebased and committed
    stage
        .add(&mod_foo(&[StringEntity::at("save", "Save changes", T2)]), false)
        .unwrap();
    let report = stage.rebase(&RebaseOptions::default()).unwrap();
    assert_eq!(report.kept_update, 1);
    stage.commit("reword", None, true).unwrap();
    let current = snapshot(log.as_ref(), SnapshotOptions::default());
    assert_eq!(current.get_string("save").unwrap().text.as_deref(), Some("Save changes"));

    // 3. point-in-time read just after step 1
    let past = snapshot(
        log.as_ref(),
        SnapshotOptions {
            as_of: Some(T1 + 1),
            ..Default::default()
        },
    );
    assert_eq!(past.get_string("save").unwrap().text.as_deref(), Some("Save"));

    // 4. an empty component with delete_missing removes everything
    stage.add(&mod_foo(&[]), false).unwrap();
    let report = stage
        .rebase(&RebaseOptions {
            delete_missing: true,
            delete_timestamp: Some(T2 + 60),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(report.injected_deletions, 1);
    assert_eq!(report.kept_deletion, 1);
    stage.commit("drop everything", None, true).unwrap();

    let live = snapshot(log.as_ref(), SnapshotOptions::default());
    assert!(!live.has_string(Some("save")));
    let all = snapshot(
        log.as_ref(),
        SnapshotOptions {
            include_deleted: true,
            ..Default::default()
        },
    );
    let tombstone = all.get_string("save").unwrap();
    assert!(tombstone.deleted);
    assert_eq!(tombstone.modified_at, T2 + 60);

    // a second deletion is a no-op
    stage.add(&mod_foo(&[]), false).unwrap();
    let report = stage
        .rebase(&RebaseOptions {
            delete_missing: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(report.kept(), 0);
    assert!(stage.is_empty());
}

#[test]
fn test_lifecycle_in_memory() {
    let log = MemoryLog::new();
    run_lifecycle(Arc::new(log.clone()));
    assert_eq!(log.len().unwrap(), 3);
}

#[test]
fn test_lifecycle_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("repo").join("log.jsonl");
    run_lifecycle(Arc::new(FileLog::open(&path)));

    // Reopening sees the same history.
    let reopened = FileLog::open(&path);
    let all = snapshot(
        &reopened,
        SnapshotOptions {
            include_deleted: true,
            with_metadata: true,
            ..Default::default()
        },
    );
    let save = all.get_string("save").unwrap();
    assert_eq!(save.extra.as_ref().unwrap()["message"], "drop everything");
    assert_eq!(save.extra.as_ref().unwrap()["sequence"], "3");
}

#[test]
fn test_scenario_intersect() {
    let mut a = mod_foo(&[
        StringEntity::at("x", "X", T1),
        StringEntity::at("y", "Y", T1),
        StringEntity::at("z", "Z", T1),
    ]);
    let mask = mod_foo(&[StringEntity::at("x", "X", T1), StringEntity::at("z", "Z", T1)]);
    assert_eq!(a.intersect(&mask), 1);
    assert_eq!(a.string_keys().collect::<Vec<_>>(), vec!["x", "z"]);
    assert_eq!(mask.len(), 2);
}

#[test]
fn test_interrupted_commit_is_invisible() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.jsonl");
    let log = Arc::new(FileLog::open(&path));

    let mut stage = Stage::new(log.clone());
    stage.add(&mod_foo(&[StringEntity::at("save", "Save", T1)]), false).unwrap();
    stage.commit("initial", None, false).unwrap();

    // Simulate a crash halfway through writing the next batch.
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(br#"{"rows":[{"sequence":2,"branch":2000,"language":"en","component":"modFoo","string_id":"save","#)
        .unwrap();
    drop(file);

    let current = snapshot(log.as_ref(), SnapshotOptions::default());
    assert_eq!(current.get_string("save").unwrap().text.as_deref(), Some("Save"));
    assert_eq!(current.len(), 1);

    // The next commit replaces the torn tail and continues the sequence.
    stage
        .add(
            &mod_foo(&[StringEntity::at("save", "Save now", T2), StringEntity::at("cancel", "Cancel", T2)]),
            false,
        )
        .unwrap();
    let summary = stage.commit("retry", None, false).unwrap();
    assert_eq!(summary.sequences, vec![2, 3]);

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.ends_with('\n'));
    let current = snapshot(log.as_ref(), SnapshotOptions::default());
    assert_eq!(current.get_string("save").unwrap().text.as_deref(), Some("Save now"));
}

#[test]
fn test_stale_edit_loses_to_newer_commit() {
    let log: Arc<dyn RepositoryLog> = Arc::new(MemoryLog::new());
    let mut alice = Stage::new(log.clone());
    let mut bob = Stage::new(log.clone());

    bob.add(&mod_foo(&[StringEntity::at("save", "Bob's save", T1)]), false).unwrap();
    alice.add(&mod_foo(&[StringEntity::at("save", "Alice's save", T2)]), false).unwrap();
    alice.commit("alice", None, false).unwrap();

    let report = bob.rebase(&RebaseOptions::default()).unwrap();
    assert_eq!(report.dropped_stale, 1);
    let summary = bob.commit("bob", None, false).unwrap();
    assert_eq!(summary.rows(), 0);

    let current = snapshot(log.as_ref(), SnapshotOptions::default());
    assert_eq!(current.get_string("save").unwrap().text.as_deref(), Some("Alice's save"));
}

#[test]
fn test_versions_are_separate_release_lines() {
    let log = MemoryLog::new();
    let mut stage = Stage::new(Arc::new(log.clone()));
    let legacy = Version::by_code(MOODLE_19).unwrap();

    let mut old = Component::new("forum", "cs", legacy);
    old.add_string(StringEntity::at("save", "Uložit", T1), false).unwrap();
    let mut new = Component::new("forum", "cs", v());
    new.add_string(StringEntity::at("save", "Uložit změny", T1), false).unwrap();
    stage.add(&old, false).unwrap();
    stage.add(&new, false).unwrap();
    assert_eq!(stage.len(), 2);
    stage.commit("both lines", None, false).unwrap();

    let tree = components_tree(&log, &ComponentFilter::default()).unwrap();
    assert_eq!(tree.len(), 2);
    assert!(tree[&MOODLE_19]["cs"].contains("forum"));

    let on_19 = Component::from_snapshot(&log, "forum", "cs", legacy, &SnapshotOptions::default()).unwrap();
    assert_eq!(on_19.get_string("save").unwrap().text.as_deref(), Some("Uložit"));
}

#[test]
fn test_import_then_export_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("forum.php");
    fs::write(
        &source,
        "<?php\n$string['greeting'] = 'Hello $a';\n$string[\"quote\"] = \"It's \\\"fine\\\"\";\n",
    )
    .unwrap();

    let log = MemoryLog::new();
    let imported = Component::from_source(&source, "en", v(), Some(T1), None).unwrap();
    let mut stage = Stage::new(Arc::new(log.clone()));
    stage.add(&imported, false).unwrap();
    stage.commit("import", None, false).unwrap();

    let current = Component::from_snapshot(&log, "forum", "en", v(), &SnapshotOptions::default()).unwrap();
    let out = dir.path().join("export").join("forum.php");
    current.export(&out, None).unwrap();

    let exported = fs::read_to_string(&out).unwrap();
    assert!(exported.contains("$string['greeting'] = 'Hello {$a}';"));
    assert!(exported.contains("$string['quote'] = 'It\\'s \"fine\"';"));

    let reimported = Component::from_source(&out, "en", v(), Some(T2), None).unwrap();
    assert_eq!(
        reimported.get_string("greeting").unwrap().text.as_deref(),
        Some("Hello {$a}")
    );
}
