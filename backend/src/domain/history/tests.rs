//! Tests for snapshot diffing and comment moderation.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

fn user() -> HistoryUser {
    HistoryUser {
        pk: Some(UserId::new(1)),
        name: "Ada".to_owned(),
    }
}

fn input(kind: HistoryKind, snapshot: Value, comment: &str) -> SnapshotInput {
    SnapshotInput {
        target: HistoryTarget::UserStory(UserStoryId::new(5)),
        kind,
        snapshot,
        user: user(),
        comment: comment.to_owned(),
        now: Utc::now(),
    }
}

fn after(entries: &[HistoryEntry]) -> LastState {
    last_state(entries, DEFAULT_MAX_PARTIAL_DIFFS)
}

#[fixture]
fn created() -> HistoryEntry {
    build_entry(
        &after(&[]),
        input(
            HistoryKind::Create,
            json!({"subject": "First", "backlog_order": 1}),
            "",
        ),
    )
    .expect("creation is always recorded")
}

#[rstest]
fn creation_diffs_against_nothing(created: HistoryEntry) {
    assert_eq!(created.key, "userstories.userstory:5");
    assert_eq!(created.diff["subject"], [Value::Null, json!("First")]);
    assert!(!created.is_hidden);
    assert!(created.is_snapshot);
    assert!(created.snapshot.is_some());
}

fn change(entries: &[HistoryEntry], max: usize, subject: &str) -> HistoryEntry {
    build_entry(
        &last_state(entries, max),
        input(
            HistoryKind::Change,
            json!({"subject": subject, "backlog_order": 1}),
            "",
        ),
    )
    .expect("change")
}

#[rstest]
fn partial_entries_store_only_the_diff(created: HistoryEntry) {
    let entry = change(std::slice::from_ref(&created), 60, "Second");

    assert!(!entry.is_snapshot);
    assert!(entry.snapshot.is_none());
    assert_eq!(entry.diff["subject"], [json!("First"), json!("Second")]);
}

#[rstest]
fn state_replays_partial_diffs_onto_the_last_snapshot(created: HistoryEntry) {
    let mut entries = vec![created];
    for subject in ["Second", "Third"] {
        let entry = change(&entries, 60, subject);
        entries.push(entry);
    }

    let state = last_state(&entries, 60);
    assert_eq!(
        state.state,
        Some(json!({"subject": "Third", "backlog_order": 1}))
    );
    assert!(!state.needs_snapshot);
}

#[rstest]
fn full_snapshot_is_due_after_the_partial_budget(created: HistoryEntry) {
    let mut entries = vec![created];
    for subject in ["Second", "Third", "Fourth"] {
        let entry = change(&entries, 2, subject);
        entries.push(entry);
    }

    let full: Vec<bool> = entries.iter().map(|entry| entry.is_snapshot).collect();
    assert_eq!(full, [true, false, false, true]);
    assert_eq!(entries[3].diff["subject"], [json!("Third"), json!("Fourth")]);
}

#[rstest]
fn keys_without_snapshot_need_one() {
    assert_eq!(
        last_state(&[], 60),
        LastState {
            state: None,
            needs_snapshot: true
        }
    );
}

#[rstest]
fn unchanged_snapshot_without_comment_is_skipped(created: HistoryEntry) {
    let entry = build_entry(
        &after(std::slice::from_ref(&created)),
        input(
            HistoryKind::Change,
            json!({"subject": "First", "backlog_order": 1}),
            "",
        ),
    );
    assert!(entry.is_none());
}

#[rstest]
fn comment_alone_is_recorded(created: HistoryEntry) {
    let entry = build_entry(
        &after(std::slice::from_ref(&created)),
        input(
            HistoryKind::Change,
            json!({"subject": "First", "backlog_order": 1}),
            " looks good ",
        ),
    )
    .expect("comment entry");
    assert!(entry.diff.is_empty());
    assert_eq!(entry.comment, "looks good");
    assert!(!entry.is_hidden);
}

#[rstest]
fn order_only_changes_are_hidden(created: HistoryEntry) {
    let entry = build_entry(
        &after(std::slice::from_ref(&created)),
        input(
            HistoryKind::Change,
            json!({"subject": "First", "backlog_order": 9}),
            "",
        ),
    )
    .expect("order change");
    assert!(entry.is_hidden);
    assert_eq!(entry.diff.keys().collect::<Vec<_>>(), ["backlog_order"]);
}

#[rstest]
fn order_change_with_comment_is_visible() {
    let diff: Diff = [("kanban_order".to_owned(), [json!(1), json!(2)])].into();
    assert!(!is_hidden_change(&diff, "moved"));
    assert!(is_hidden_change(&diff, ""));
}

#[rstest]
fn changed_fields_unions_entry_diffs(created: HistoryEntry) {
    let second = build_entry(
        &after(std::slice::from_ref(&created)),
        input(
            HistoryKind::Change,
            json!({"subject": "Second", "backlog_order": 1}),
            "",
        ),
    )
    .expect("change");
    let fields = changed_fields([&created, &second]);
    assert!(fields.contains("subject"));
    assert!(fields.contains("backlog_order"));
}

#[rstest]
fn deleting_a_missing_comment_is_rejected(mut created: HistoryEntry) {
    let error = created
        .delete_comment(user(), Utc::now())
        .expect_err("no comment");
    assert_eq!(error.code(), crate::domain::ErrorCode::InvalidRequest);
}

#[rstest]
fn comments_can_be_hidden_and_restored(mut created: HistoryEntry) {
    created.comment = "typo".to_owned();
    created
        .delete_comment(user(), Utc::now())
        .expect("delete comment");
    assert!(created.delete_comment_date.is_some());
    assert_eq!(created.delete_comment_user, Some(user()));

    created.undelete_comment().expect("undelete comment");
    assert!(created.delete_comment_date.is_none());
    assert!(created.delete_comment_user.is_none());
}

#[rstest]
#[case("userstory", Some(HistoryTarget::UserStory(UserStoryId::new(3))))]
#[case("issue", Some(HistoryTarget::Issue(IssueId::new(3))))]
#[case("task", Some(HistoryTarget::Task(TaskId::new(3))))]
#[case("milestone", None)]
fn history_paths_resolve_known_content_types(
    #[case] content_type: &str,
    #[case] expected: Option<HistoryTarget>,
) {
    assert_eq!(HistoryTarget::from_path(content_type, 3), expected);
}
