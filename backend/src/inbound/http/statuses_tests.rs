//! Tests for the status handlers.

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

use crate::domain::{Status, StatusKind};
use crate::inbound::http::test_utils::{bearer, call_json, test_app};
use crate::test_support::TestWorld;

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .expect("status array")
        .iter()
        .filter_map(|status| status["id"].as_i64())
        .collect()
}

#[rstest]
#[case("userstory", StatusKind::UserStory)]
#[case("task", StatusKind::Task)]
#[case("issue", StatusKind::Issue)]
#[actix_web::test]
async fn statuses_are_listed_per_kind(#[case] segment: &str, #[case] kind: StatusKind) {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let expected: Vec<i64> = world
        .repos
        .statuses
        .list_by_project(project.id, kind)
        .await
        .expect("statuses")
        .iter()
        .map(|status: &Status| status.id.get())
        .collect();
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/{segment}-statuses?project={}", project.id))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!expected.is_empty());
    assert_eq!(ids(&body), expected);
}

#[actix_web::test]
async fn unknown_status_kinds_are_not_found() {
    let world = TestWorld::new();
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/epic-statuses")
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn owners_create_and_reorder_statuses() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, created) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/issue-statuses")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"project": project.id.get(), "name": "Triaged", "order": 0}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "triaged");
    assert_eq!(created["is_closed"], false);
    let id = created["id"].as_i64().expect("status id");

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/issue-statuses/bulk_update_order")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"project": project.id.get(), "bulk_issue_statuses": [[id, 42]]}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/issue-statuses/{id}"))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(body["order"], 42);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/issue-statuses/bulk_update_order")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"project": project.id.get(), "bulk_userstory_statuses": [[id, 1]]}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "bulk_issue_statuses");
}

#[actix_web::test]
async fn default_statuses_need_a_replacement() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let default = project.default_us_status.expect("default status");
    let other = world
        .repos
        .statuses
        .list_by_project(project.id, StatusKind::UserStory)
        .await
        .expect("statuses")
        .into_iter()
        .find(|status| status.id != default)
        .expect("second status");
    let app = actix_test::init_service(test_app(&world)).await;
    let uri = format!("/api/v1/userstory-statuses/{default}");

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("{uri}?moveTo={}", other.id))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let project = world.repos.project(project.id).await.expect("project");
    assert_eq!(project.default_us_status, Some(other.id));
}

#[actix_web::test]
async fn moving_stories_out_of_a_deleted_status_is_recorded_in_their_history() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let statuses = world
        .repos
        .statuses
        .list_by_project(project.id, StatusKind::UserStory)
        .await
        .expect("statuses");
    let from = statuses
        .iter()
        .find(|status| Some(status.id) != project.default_us_status && !status.is_closed)
        .expect("open status");
    let to = statuses
        .iter()
        .find(|status| status.id != from.id && status.is_closed)
        .expect("closed status");
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, story) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/userstories")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"project": project.id.get(), "subject": "Login", "status": from.id.get()}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let story_id = story["id"].as_i64().expect("story id");

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/userstory-statuses/{}?moveTo={}", from.id, to.id))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, moved) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/userstories/{story_id}"))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(moved["status"], to.id.get());
    assert_eq!(moved["is_closed"], true);
    assert_eq!(moved["version"], 2);

    let (status, history) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/history/userstory/{story_id}"))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().expect("history entries");
    let change = entries
        .iter()
        .find(|entry| entry["type"] == "change")
        .expect("status change entry");
    assert_eq!(change["user"]["pk"], owner.id.get());
    assert_eq!(change["diff"]["status"], json!([from.id.get(), to.id.get()]));
}
