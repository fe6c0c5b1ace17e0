//! Tests for the user story handlers.

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

use crate::domain::{Project, ProjectPermission, User};
use crate::inbound::http::test_utils::{bearer, call_json, test_app};
use crate::test_support::TestWorld;

async fn create_story<S>(app: &S, world: &TestWorld, owner: &User, project: &Project) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = call_json(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/userstories")
            .insert_header(bearer(world, owner))
            .set_json(json!({
                "project": project.id.get(),
                "subject": "Login page",
                "description": "As a user I want to log in",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn patch_story<S>(
    app: &S,
    world: &TestWorld,
    user: &User,
    id: i64,
    payload: Value,
) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    call_json(
        app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/userstories/{id}"))
            .insert_header(bearer(world, user))
            .set_json(payload)
            .to_request(),
    )
    .await
}

#[actix_web::test]
async fn updates_are_version_checked() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let story = create_story(&app, &world, &owner, &project).await;
    let id = story["id"].as_i64().expect("story id");
    assert_eq!(story["version"], 1);

    let (status, body) =
        patch_story(&app, &world, &owner, id, json!({"subject": "No version"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The version is not valid");

    let (status, body) = patch_story(
        &app,
        &world,
        &owner,
        id,
        json!({"version": 1, "subject": "Sign-in page", "comment": "renamed"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);
    assert_eq!(body["subject"], "Sign-in page");

    let (status, body) = patch_story(
        &app,
        &world,
        &owner,
        id,
        json!({"version": 1, "subject": "Stale rename"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "The version doesn't match with the current one");
    assert_eq!(body["details"]["fields"], json!(["subject"]));

    let (status, body) = patch_story(
        &app,
        &world,
        &owner,
        id,
        json!({"version": 1, "description": "Untouched since version 1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 3);
    assert_eq!(body["subject"], "Sign-in page");
}

#[actix_web::test]
async fn bulk_create_adds_one_story_per_line() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/userstories/bulk_create")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({
                "project_id": project.id.get(),
                "bulk_stories": "Story #1\n\n  Story #2  \nStory #3",
            }))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let subjects: Vec<&str> = body
        .as_array()
        .expect("story array")
        .iter()
        .filter_map(|story| story["subject"].as_str())
        .collect();
    assert_eq!(subjects, ["Story #1", "Story #2", "Story #3"]);
    let status_id = project.default_us_status.map(i64::from);
    assert!(
        body.as_array()
            .into_iter()
            .flatten()
            .all(|story| story["status"].as_i64() == status_id)
    );
}

#[actix_web::test]
async fn backlog_reordering_only_touches_backlog_order() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let story = create_story(&app, &world, &owner, &project).await;
    let id = story["id"].as_i64().expect("story id");

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/userstories/bulk_update_backlog_order")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({
                "project_id": project.id.get(),
                "bulk_stories": [{"us_id": id, "order": 7}],
            }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/userstories/{id}"))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(body["backlog_order"], 7);
    assert_eq!(body["sprint_order"], story["sprint_order"]);
    assert_eq!(body["kanban_order"], story["kanban_order"]);
}

#[actix_web::test]
async fn unknown_order_fields_are_not_found() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/userstories/bulk_update_taskboard_order")
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"project_id": project.id.get(), "bulk_stories": []}))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn stories_are_found_by_reference() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let story = create_story(&app, &world, &owner, &project).await;
    let reference = story["ref"].as_i64().expect("story ref");

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!(
                "/api/v1/userstories/by_ref?project={}&ref={reference}",
                project.id
            ))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], story["id"]);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!(
                "/api/v1/userstories/by_ref?project={}&ref={}",
                project.id,
                reference + 100
            ))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[case("1", StatusCode::OK, 1)]
#[case("false", StatusCode::OK, 1)]
#[case("maybe", StatusCode::BAD_REQUEST, 0)]
#[actix_web::test]
async fn archived_filter_accepts_flags(
    #[case] flag: &str,
    #[case] expected: StatusCode,
    #[case] count: usize,
) {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let open = create_story(&app, &world, &owner, &project).await;
    let archived = create_story(&app, &world, &owner, &project).await;
    let (status, _) = patch_story(
        &app,
        &world,
        &owner,
        archived["id"].as_i64().expect("story id"),
        json!({"version": 1, "is_archived": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!(
                "/api/v1/userstories?project={}&is_archived={flag}",
                project.id
            ))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;

    assert_eq!(status, expected);
    if expected == StatusCode::OK {
        let stories = body.as_array().expect("story array");
        assert_eq!(stories.len(), count);
        let wanted = if flag == "1" { &archived } else { &open };
        assert_eq!(stories[0]["id"], wanted["id"]);
    } else {
        assert_eq!(body["details"]["field"], "is_archived");
    }
}

#[derive(Debug, Clone, Copy)]
enum Caller {
    Anonymous,
    Stranger,
    Viewer,
    Owner,
}

#[rstest]
#[case(Caller::Anonymous, StatusCode::UNAUTHORIZED)]
#[case(Caller::Stranger, StatusCode::FORBIDDEN)]
#[case(Caller::Viewer, StatusCode::OK)]
#[case(Caller::Owner, StatusCode::OK)]
#[actix_web::test]
async fn private_stories_need_view_permission(#[case] caller: Caller, #[case] expected: StatusCode) {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let stranger = world.user("stranger").await;
    let viewer = world.user("viewer").await;
    let project = world.private_project(&owner, "Secret").await;
    world
        .member(
            &project,
            &viewer,
            &[ProjectPermission::ViewProject, ProjectPermission::ViewUs],
        )
        .await;
    let app = actix_test::init_service(test_app(&world)).await;
    let story = create_story(&app, &world, &owner, &project).await;

    let mut request = actix_test::TestRequest::get().uri(&format!(
        "/api/v1/userstories/{}",
        story["id"].as_i64().expect("story id")
    ));
    let user = match caller {
        Caller::Anonymous => None,
        Caller::Stranger => Some(&stranger),
        Caller::Viewer => Some(&viewer),
        Caller::Owner => Some(&owner),
    };
    if let Some(user) = user {
        request = request.insert_header(bearer(&world, user));
    }
    let (status, _) = call_json(&app, request.to_request()).await;

    assert_eq!(status, expected);
}

#[actix_web::test]
async fn viewers_cannot_edit_stories() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let viewer = world.user("viewer").await;
    let project = world.project(&owner, "Board", false).await;
    world
        .member(&project, &viewer, &[ProjectPermission::ViewUs])
        .await;
    let app = actix_test::init_service(test_app(&world)).await;
    let story = create_story(&app, &world, &owner, &project).await;
    let id = story["id"].as_i64().expect("story id");

    let (status, _) =
        patch_story(&app, &world, &viewer, id, json!({"version": 1, "subject": "Nope"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/userstories/{id}"))
            .insert_header(bearer(&world, &viewer))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/userstories/{id}"))
            .insert_header(bearer(&world, &owner))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
