//! Tests for the task handlers.

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

use crate::domain::{ProjectPermission, User};
use crate::inbound::http::test_utils::{bearer, call_json, test_app};
use crate::test_support::TestWorld;

async fn post_json<S>(
    app: &S,
    world: &TestWorld,
    user: Option<&User>,
    uri: &str,
    payload: Value,
) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut request = actix_test::TestRequest::post().uri(uri).set_json(payload);
    if let Some(user) = user {
        request = request.insert_header(bearer(world, user));
    }
    call_json(app, request.to_request()).await
}

#[actix_web::test]
async fn tasks_on_a_story_land_in_its_sprint() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let (_, milestone) = post_json(
        &app,
        &world,
        Some(&owner),
        "/api/v1/milestones",
        json!({
            "project": project.id.get(),
            "name": "Sprint 1",
            "estimated_start": "2024-05-01",
            "estimated_finish": "2024-05-14",
        }),
    )
    .await;
    let (_, story) = post_json(
        &app,
        &world,
        Some(&owner),
        "/api/v1/userstories",
        json!({
            "project": project.id.get(),
            "subject": "Login",
            "milestone": milestone["id"],
        }),
    )
    .await;

    let (status, task) = post_json(
        &app,
        &world,
        Some(&owner),
        "/api/v1/tasks",
        json!({
            "project": project.id.get(),
            "subject": "Form",
            "user_story": story["id"],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["milestone"], milestone["id"]);
    assert_eq!(
        task["ref"].as_i64(),
        story["ref"].as_i64().map(|reference| reference + 1)
    );
    assert_eq!(task["status"], json!(project.default_task_status.map(i64::from)));

    let (status, listed) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/tasks?milestone={}", milestone["id"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn task_updates_are_version_checked() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let (_, task) = post_json(
        &app,
        &world,
        Some(&owner),
        "/api/v1/tasks",
        json!({"project": project.id.get(), "subject": "Form"}),
    )
    .await;
    let id = task["id"].as_i64().expect("task id");
    let patch = |payload: Value| {
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/tasks/{id}"))
            .insert_header(bearer(&world, &owner))
            .set_json(payload)
            .to_request()
    };

    let (status, body) = call_json(&app, patch(json!({"subject": "No version"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The version is not valid");

    let (status, body) = call_json(
        &app,
        patch(json!({"version": 1, "subject": "Login form", "is_iocaine": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);
    assert_eq!(body["is_iocaine"], true);

    let (status, _) = call_json(&app, patch(json!({"version": 1, "subject": "Stale"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn bulk_create_reads_one_task_per_line() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let (_, story) = post_json(
        &app,
        &world,
        Some(&owner),
        "/api/v1/userstories",
        json!({"project": project.id.get(), "subject": "Login"}),
    )
    .await;
    let payload = json!({
        "project_id": project.id.get(),
        "us_id": story["id"],
        "bulk_tasks": "Form\n\nValidation\n",
    });

    let (status, _) =
        post_json(&app, &world, None, "/api/v1/tasks/bulk_create", payload.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) =
        post_json(&app, &world, Some(&owner), "/api/v1/tasks/bulk_create", payload).await;
    assert_eq!(status, StatusCode::OK);
    let subjects: Vec<&str> = created
        .as_array()
        .expect("task array")
        .iter()
        .filter_map(|task| task["subject"].as_str())
        .collect();
    assert_eq!(subjects, ["Form", "Validation"]);
    assert_eq!(created[1]["user_story"], story["id"]);
}

#[rstest]
#[case::anonymous(None, StatusCode::UNAUTHORIZED)]
#[case::outsider(Some("outsider"), StatusCode::FORBIDDEN)]
#[case::task_viewer(Some("viewer"), StatusCode::OK)]
#[actix_web::test]
async fn private_tasks_need_view_tasks(
    #[case] caller: Option<&str>,
    #[case] expected: StatusCode,
) {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.private_project(&owner, "Secret").await;
    let viewer = world.user("viewer").await;
    world
        .member(&project, &viewer, &[ProjectPermission::ViewTasks])
        .await;
    let outsider = world.user("outsider").await;
    let app = actix_test::init_service(test_app(&world)).await;
    let (_, task) = post_json(
        &app,
        &world,
        Some(&owner),
        "/api/v1/tasks",
        json!({"project": project.id.get(), "subject": "Form"}),
    )
    .await;
    let id = task["id"].as_i64().expect("task id");

    let mut request = actix_test::TestRequest::get().uri(&format!("/api/v1/tasks/{id}"));
    let user = match caller {
        Some("viewer") => Some(&viewer),
        Some(_) => Some(&outsider),
        None => None,
    };
    if let Some(user) = user {
        request = request.insert_header(bearer(&world, user));
    }
    let (status, _) = call_json(&app, request.to_request()).await;

    assert_eq!(status, expected);
}

#[actix_web::test]
async fn deleted_tasks_are_gone() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let (_, task) = post_json(
        &app,
        &world,
        Some(&owner),
        "/api/v1/tasks",
        json!({"project": project.id.get(), "subject": "Form"}),
    )
    .await;
    let uri = format!("/api/v1/tasks/{}", task["id"]);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call_json(&app, actix_test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
