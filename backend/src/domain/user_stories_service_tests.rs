//! Tests for the user story service.

use std::sync::Arc;

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::ports::{MockHistoryRepository, RepositoryError};
use crate::domain::{CreateIssue, ErrorCode, Status};
use crate::test_support::TestWorld;

async fn status(world: &TestWorld, project: ProjectId, slug: &str) -> Status {
    world
        .repos
        .statuses
        .list_by_project(project, StatusKind::UserStory)
        .await
        .expect("statuses")
        .into_iter()
        .find(|status| status.slug == slug)
        .expect("status by slug")
}

fn new_story(project: ProjectId, subject: &str) -> CreateUserStory {
    CreateUserStory {
        project,
        subject: subject.to_owned(),
        ..CreateUserStory::default()
    }
}

fn changes(version: i32, fields: &[&str]) -> UserStoryChanges {
    UserStoryChanges {
        version: Some(json!(version)),
        fields: fields.iter().map(|field| (*field).to_owned()).collect(),
        ..UserStoryChanges::default()
    }
}

#[rstest]
#[case("one\n\n  two  \n\t\nthree", &["one", "two", "three"])]
#[case("   \n", &[])]
#[case("single", &["single"])]
fn bulk_subjects_skip_blank_lines(#[case] text: &str, #[case] expected: &[&str]) {
    assert_eq!(bulk_subjects(text), expected);
}

#[rstest]
#[case("   ", "required")]
#[case(&"x".repeat(SUBJECT_MAX + 1), "too_long")]
fn subjects_are_validated(#[case] subject: &str, #[case] code: &str) {
    let error = validate_subject(subject).expect_err("invalid subject");
    let details = error.details().expect("details");
    assert_eq!(details["field"], "subject");
    assert_eq!(details["code"], code);
}

#[tokio::test]
async fn create_uses_default_status_and_records_history() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);

    let story = world
        .services
        .user_stories
        .create(&requester, new_story(project.id, "  First story "))
        .await
        .expect("create story");

    assert_eq!(story.reference, 1);
    assert_eq!(story.subject, "First story");
    assert_eq!(story.version, 1);
    assert_eq!(story.status, project.default_us_status);
    assert_eq!(story.owner, Some(owner.id));

    let entries = world
        .repos
        .history
        .list(&HistoryTarget::UserStory(story.id).key())
        .await
        .expect("history");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, HistoryKind::Create);
    assert_eq!(entries[0].values_diff["status"][1], json!("New"));
}

#[tokio::test]
async fn create_in_a_closed_status_marks_the_story_closed() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let done = status(&world, project.id, "done").await;

    let story = world
        .services
        .user_stories
        .create(
            &TestWorld::requester(&owner),
            CreateUserStory {
                status: Some(done.id),
                ..new_story(project.id, "Shipped")
            },
        )
        .await
        .expect("create story");

    assert!(story.is_closed);
    assert!(story.finish_date.is_some());
}

#[tokio::test]
async fn create_rejects_statuses_of_other_projects() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let other = world.project(&owner, "Other", false).await;
    let foreign = status(&world, other.id, "new").await;

    let error = world
        .services
        .user_stories
        .create(
            &TestWorld::requester(&owner),
            CreateUserStory {
                status: Some(foreign.id),
                ..new_story(project.id, "Misplaced")
            },
        )
        .await
        .expect_err("foreign status");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.details().expect("details")["field"], "status");
}

#[tokio::test]
async fn references_are_shared_with_issues() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);

    world
        .services
        .issues
        .create(
            &requester,
            CreateIssue {
                project: project.id,
                subject: "Crash".to_owned(),
                ..CreateIssue::default()
            },
        )
        .await
        .expect("create issue");
    let story = world
        .services
        .user_stories
        .create(&requester, new_story(project.id, "Story"))
        .await
        .expect("create story");

    assert_eq!(story.reference, 2);
}

#[tokio::test]
async fn private_project_matrix_for_create() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let member = world.user("member").await;
    let outsider = world.user("outsider").await;
    let project = world.private_project(&owner, "Secret").await;
    world
        .member(&project, &member, &[ProjectPermission::ViewProject, ProjectPermission::AddUs])
        .await;

    let cases = [
        (Requester::Anonymous, Some(ErrorCode::Unauthorized)),
        (TestWorld::requester(&outsider), Some(ErrorCode::Forbidden)),
        (TestWorld::requester(&member), None),
        (TestWorld::requester(&owner), None),
    ];
    for (requester, expected) in cases {
        let result = world
            .services
            .user_stories
            .create(&requester, new_story(project.id, "Story"))
            .await;
        assert_eq!(result.err().map(|error| error.code()), expected);
    }
}

#[tokio::test]
async fn list_hides_stories_of_invisible_projects() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let outsider = world.user("outsider").await;
    let public = world.project(&owner, "Open", false).await;
    let private = world.private_project(&owner, "Closed").await;
    let requester = TestWorld::requester(&owner);
    for project in [&public, &private] {
        world
            .services
            .user_stories
            .create(&requester, new_story(project.id, "Story"))
            .await
            .expect("create story");
    }

    let seen = world
        .services
        .user_stories
        .list(&TestWorld::requester(&outsider), &UserStoryFilter::default())
        .await
        .expect("list");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].project, public.id);

    let all = world
        .services
        .user_stories
        .list(&requester, &UserStoryFilter::default())
        .await
        .expect("list");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn update_requires_a_version() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let story = world
        .services
        .user_stories
        .create(&requester, new_story(project.id, "Story"))
        .await
        .expect("create story");

    let error = world
        .services
        .user_stories
        .update(
            &requester,
            story.id,
            UserStoryChanges {
                subject: Some("Renamed".to_owned()),
                ..UserStoryChanges::default()
            },
        )
        .await
        .expect_err("missing version");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.message(), "The version is not valid");
}

#[tokio::test]
async fn stale_versions_conflict_only_on_touched_fields() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let service = &world.services.user_stories;
    let story = service
        .create(&requester, new_story(project.id, "Story"))
        .await
        .expect("create story");

    let updated = service
        .update(
            &requester,
            story.id,
            UserStoryChanges {
                subject: Some("Renamed".to_owned()),
                ..changes(1, &["version", "subject"])
            },
        )
        .await
        .expect("current version");
    assert_eq!(updated.version, 2);

    let updated = service
        .update(
            &requester,
            story.id,
            UserStoryChanges {
                description: Some("Details".to_owned()),
                ..changes(1, &["version", "description"])
            },
        )
        .await
        .expect("stale version on untouched field");
    assert_eq!(updated.version, 3);
    assert_eq!(updated.subject, "Renamed");

    let error = service
        .update(
            &requester,
            story.id,
            UserStoryChanges {
                subject: Some("Clobbered".to_owned()),
                ..changes(1, &["version", "subject"])
            },
        )
        .await
        .expect_err("stale version on touched field");
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.details().expect("details")["fields"], json!(["subject"]));

    let error = service
        .update(&requester, story.id, changes(4, &["version"]))
        .await
        .expect_err("future version");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn moving_to_a_closed_status_closes_the_story() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let done = status(&world, project.id, "done").await;
    let story = world
        .services
        .user_stories
        .create(&requester, new_story(project.id, "Story"))
        .await
        .expect("create story");

    let updated = world
        .services
        .user_stories
        .update(
            &requester,
            story.id,
            UserStoryChanges {
                status: Some(done.id),
                comment: "Finished".to_owned(),
                ..changes(1, &["version", "status", "comment"])
            },
        )
        .await
        .expect("update");

    assert!(updated.is_closed);
    let entries = world
        .repos
        .history
        .list(&HistoryTarget::UserStory(story.id).key())
        .await
        .expect("history");
    let last = entries.last().expect("change entry");
    assert_eq!(last.comment, "Finished");
    assert_eq!(last.values_diff["status"], [json!("New"), json!("Done")]);
    assert!(!last.is_hidden);
}

#[tokio::test]
async fn generated_stories_comment_on_the_source_issue() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let issue = world
        .services
        .issues
        .create(
            &requester,
            CreateIssue {
                project: project.id,
                subject: "Broken login".to_owned(),
                ..CreateIssue::default()
            },
        )
        .await
        .expect("create issue")
        .issue;

    let story = world
        .services
        .user_stories
        .create(
            &requester,
            CreateUserStory {
                generated_from_issue: Some(issue.id),
                ..new_story(project.id, "Fix login")
            },
        )
        .await
        .expect("create story");

    let entries = world
        .repos
        .history
        .list(&HistoryTarget::Issue(issue.id).key())
        .await
        .expect("history");
    let comment = entries.last().map(|entry| entry.comment.clone());
    assert_eq!(
        comment.as_deref(),
        Some(format!("Generating the user story [US #{} - Fix login]", story.reference).as_str())
    );
}

#[tokio::test]
async fn generated_from_issue_must_belong_to_the_project() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let other = world.project(&owner, "Other", false).await;
    let requester = TestWorld::requester(&owner);
    let issue = world
        .services
        .issues
        .create(
            &requester,
            CreateIssue {
                project: other.id,
                subject: "Elsewhere".to_owned(),
                ..CreateIssue::default()
            },
        )
        .await
        .expect("create issue")
        .issue;

    let error = world
        .services
        .user_stories
        .create(
            &requester,
            CreateUserStory {
                generated_from_issue: Some(issue.id),
                ..new_story(project.id, "Story")
            },
        )
        .await
        .expect_err("foreign issue");

    assert_eq!(error.details().expect("details")["field"], "generated_from_issue");
}

#[tokio::test]
async fn bulk_create_makes_one_story_per_line() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;

    let stories = world
        .services
        .user_stories
        .bulk_create(
            &TestWorld::requester(&owner),
            BulkCreateUserStories {
                project: project.id,
                status: None,
                bulk_stories: "Login\n\nLogout\n".to_owned(),
            },
        )
        .await
        .expect("bulk create");

    let subjects: Vec<&str> = stories.iter().map(|story| story.subject.as_str()).collect();
    assert_eq!(subjects, ["Login", "Logout"]);
    assert_eq!(stories[1].reference, 2);
}

#[tokio::test]
async fn bulk_create_requires_authentication() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;

    let error = world
        .services
        .user_stories
        .bulk_create(
            &Requester::Anonymous,
            BulkCreateUserStories {
                project: project.id,
                status: None,
                bulk_stories: "Login".to_owned(),
            },
        )
        .await
        .expect_err("anonymous");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn bulk_update_order_touches_one_field_and_hides_history() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let story = world
        .services
        .user_stories
        .create(
            &requester,
            CreateUserStory {
                backlog_order: Some(1),
                sprint_order: Some(2),
                kanban_order: Some(3),
                ..new_story(project.id, "Story")
            },
        )
        .await
        .expect("create story");

    world
        .services
        .user_stories
        .bulk_update_order(&requester, project.id, OrderField::Kanban, &[(story.id, 30)])
        .await
        .expect("reorder");

    let stored = world
        .repos
        .user_stories
        .find_by_id(story.id)
        .await
        .expect("find")
        .expect("story");
    assert_eq!(
        (stored.backlog_order, stored.sprint_order, stored.kanban_order),
        (1, 2, 30)
    );
    assert_eq!(stored.version, 2);

    let entries = world
        .repos
        .history
        .list(&HistoryTarget::UserStory(story.id).key())
        .await
        .expect("history");
    let last = entries.last().expect("reorder entry");
    assert!(last.is_hidden);
    assert_eq!(last.diff.keys().collect::<Vec<_>>(), ["kanban_order"]);
}

#[tokio::test]
async fn bulk_update_order_is_forbidden_without_modify_permission() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let viewer = world.user("viewer").await;
    let project = world.project(&owner, "Board", false).await;

    let error = world
        .services
        .user_stories
        .bulk_update_order(
            &TestWorld::requester(&viewer),
            project.id,
            OrderField::Backlog,
            &[],
        )
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn destroy_records_a_delete_entry() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let story = world
        .services
        .user_stories
        .create(&requester, new_story(project.id, "Story"))
        .await
        .expect("create story");

    world
        .services
        .user_stories
        .destroy(&requester, story.id)
        .await
        .expect("destroy");

    let error = world
        .services
        .user_stories
        .retrieve(&requester, story.id)
        .await
        .expect_err("gone");
    assert_eq!(error.code(), ErrorCode::NotFound);
    let entries = world
        .repos
        .history
        .list(&HistoryTarget::UserStory(story.id).key())
        .await
        .expect("history");
    assert_eq!(entries.last().map(|entry| entry.kind), Some(HistoryKind::Delete));
}

#[tokio::test]
async fn history_failures_surface_as_service_unavailable() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;

    let mut history = MockHistoryRepository::new();
    history
        .expect_list()
        .times(1)
        .return_once(|_| Err(RepositoryError::connection("database offline")));
    let mut repos = world.repos.clone();
    repos.history = Arc::new(history);
    let clock: Arc<dyn Clock> = world.clock.clone();
    let service = UserStoriesService::new(
        repos.clone(),
        HistoryService::new(repos, clock.clone()),
        clock,
    );

    let error = service
        .create(&TestWorld::requester(&owner), new_story(project.id, "Story"))
        .await
        .expect_err("history unavailable");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}
