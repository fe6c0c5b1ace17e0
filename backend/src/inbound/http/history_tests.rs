//! Tests for the history handlers.

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use serde_json::{Value, json};

use crate::domain::ProjectPermission;
use crate::inbound::http::test_utils::{bearer, call_json, test_app};
use crate::test_support::TestWorld;

fn entry_id(entries: &Value, index: usize) -> String {
    entries[index]["id"]
        .as_str()
        .expect("entry id")
        .to_owned()
}

#[actix_web::test]
async fn comments_are_hidden_and_restored() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let editor = world.user("editor").await;
    let stranger = world.user("stranger").await;
    let project = world.project(&owner, "Board", false).await;
    world
        .member(
            &project,
            &editor,
            &[
                ProjectPermission::ViewProject,
                ProjectPermission::ViewUs,
                ProjectPermission::ModifyUs,
            ],
        )
        .await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (_, story) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/userstories")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"project": project.id.get(), "subject": "Login page"}))
            .to_request(),
    )
    .await;
    let id = story["id"].as_i64().expect("story id");
    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/userstories/{id}"))
            .insert_header(bearer(&world, &editor))
            .set_json(json!({"version": 1, "subject": "Sign-in page", "comment": "clearer"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let history = format!("/api/v1/history/userstory/{id}");
    let (status, entries) = call_json(
        &app,
        actix_test::TestRequest::get().uri(&history).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().map(Vec::len), Some(2));
    assert_eq!(entries[0]["type"], "create");
    assert_eq!(entries[1]["type"], "change");
    assert_eq!(entries[1]["comment"], "clearer");
    assert_eq!(
        entries[1]["diff"]["subject"],
        json!(["Login page", "Sign-in page"])
    );
    let change = entry_id(&entries, 1);

    let delete = format!("{history}/delete_comment?id={change}");
    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri(&delete)
            .insert_header(bearer(&world, &stranger))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri(&delete)
            .insert_header(bearer(&world, &editor))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, entries) = call_json(
        &app,
        actix_test::TestRequest::get().uri(&history).to_request(),
    )
    .await;
    assert_eq!(entries[1]["delete_comment_user"]["pk"], editor.id.get());
    assert!(entries[1]["delete_comment_date"].is_string());

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("{history}/undelete_comment?id={change}"))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, entries) = call_json(
        &app,
        actix_test::TestRequest::get().uri(&history).to_request(),
    )
    .await;
    assert_eq!(entries[1]["delete_comment_date"], Value::Null);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!(
                "{history}/delete_comment?id={}",
                entry_id(&entries, 0)
            ))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Comment does not exist");
}

#[actix_web::test]
async fn unknown_history_targets_are_not_found() {
    let world = TestWorld::new();
    let app = actix_test::init_service(test_app(&world)).await;

    for uri in ["/api/v1/history/task/1", "/api/v1/history/issue/999"] {
        let (status, _) = call_json(&app, actix_test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn private_history_needs_membership() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let stranger = world.user("stranger").await;
    let project = world.private_project(&owner, "Secret").await;
    let app = actix_test::init_service(test_app(&world)).await;
    let (_, issue) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/issues")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"project": project.id.get(), "subject": "Crash"}))
            .to_request(),
    )
    .await;
    let history = format!("/api/v1/history/issue/{}", issue["id"]);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&history)
            .insert_header(bearer(&world, &stranger))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, entries) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&history)
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
}
