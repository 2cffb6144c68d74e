//! Sprint index rebuild and status view.

#![cfg(unix)]

mod common;

use common::Workspace;
use predicates::prelude::*;

#[test]
fn rebuild_indexes_valid_stories_and_reports_skips() {
    let ws = Workspace::new();
    ws.add_story("1-1-a", "review");
    ws.add_story("1-2-b", "in-progress");
    ws.add_story("1-3-c", "garbage");

    ws.cmd()
        .args(["sprint", "rebuild"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 entries, 1 skipped"));

    let yaml = ws.index_yaml();
    assert!(yaml.contains("development_status:"));
    assert!(yaml.contains("1-1-a: review"));
    assert!(yaml.contains("1-2-b: in-progress"));
    assert!(!yaml.contains("1-3-c"));
}

#[test]
fn rebuild_replaces_a_stale_index() {
    let ws = Workspace::new();
    ws.add_story("1-1-a", "backlog");

    // Drive the story to done, then hand-edit the file back and
    // rebuild: the index must follow the files.
    ws.cmd().args(["story", "1-1-a"]).assert().success();
    assert!(ws.index_yaml().contains("1-1-a: done"));

    ws.add_story("1-1-a", "review");
    ws.cmd().args(["sprint", "rebuild"]).assert().success();
    assert!(ws.index_yaml().contains("1-1-a: review"));
}

#[test]
fn status_view_lists_stories_and_counts() {
    let ws = Workspace::new();
    ws.add_story("1-1-a", "review");
    ws.add_story("1-2-b", "review");
    ws.add_story("2-1-c", "done");

    ws.cmd()
        .args(["sprint", "status"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("1-1-a: review")
                .and(predicate::str::contains("2-1-c: done"))
                .and(predicate::str::contains("3 stories"))
                .and(predicate::str::contains("2 review"))
                .and(predicate::str::contains("1 done")),
        );
}

#[test]
fn status_view_keeps_invalid_statuses_visible() {
    let ws = Workspace::new();
    ws.add_story("1-1-a", "Blocked On Design");

    ws.cmd()
        .args(["sprint", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1-1-a: Blocked On Design"));
}
