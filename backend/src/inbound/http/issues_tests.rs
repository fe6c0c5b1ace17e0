//! Tests for the issue handlers.

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

use crate::domain::{Project, User};
use crate::inbound::http::test_utils::{bearer, call_json, test_app};
use crate::test_support::TestWorld;

async fn report_issue<S>(
    app: &S,
    world: &TestWorld,
    reporter: &User,
    project: &Project,
    subject: &str,
) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = call_json(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/issues")
            .insert_header(bearer(world, reporter))
            .set_json(json!({
                "project": project.id.get(),
                "subject": subject,
                "tags": ["UI", "ui", " login "],
            }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[actix_web::test]
async fn public_projects_take_issues_from_any_user() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let reporter = world.user("reporter").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;

    let body = report_issue(&app, &world, &reporter, &project, "Broken login").await;

    assert_eq!(body["owner"], reporter.id.get());
    assert_eq!(body["tags"], json!(["ui", "login"]));
    assert_eq!(body["votes"], 0);
    assert_eq!(body["version"], 1);
    assert_eq!(
        body["status"].as_i64(),
        project.default_issue_status.map(i64::from)
    );
}

#[actix_web::test]
async fn anonymous_users_cannot_report_issues() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/issues")
            .set_json(json!({"project": project.id.get(), "subject": "Anonymous"}))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case("", 2)]
#[case("&q=login", 1)]
#[case("&q=2", 1)]
#[actix_web::test]
async fn issues_are_filtered_by_text(#[case] extra: &str, #[case] expected: usize) {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    report_issue(&app, &world, &owner, &project, "Broken login").await;
    report_issue(&app, &world, &owner, &project, "Slow search").await;

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/issues?project={}{extra}", project.id))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(expected));
}

#[actix_web::test]
async fn issue_updates_detect_conflicts() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let issue = report_issue(&app, &world, &owner, &project, "Broken login").await;
    let uri = format!("/api/v1/issues/{}", issue["id"]);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"version": 1, "subject": "Login fails"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"version": 1, "subject": "Login is broken"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(&world, &owner))
            .set_json(json!({"version": "two", "subject": "Login is broken"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "version");
}

#[actix_web::test]
async fn votes_are_counted_once_per_user() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let voter = world.user("voter").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let issue = report_issue(&app, &world, &owner, &project, "Broken login").await;
    let uri = format!("/api/v1/issues/{}", issue["id"]);

    for _ in 0..2 {
        let (status, body) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("{uri}/upvote"))
                .insert_header(bearer(&world, &voter))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
    }

    let (_, body) = call_json(&app, actix_test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(body["votes"], 1);

    let (status, voters) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("{uri}/voters"))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voters[0]["username"], "voter");

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("{uri}/downvote"))
            .insert_header(bearer(&world, &voter))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call_json(&app, actix_test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(body["votes"], 0);
}

#[actix_web::test]
async fn anonymous_votes_need_credentials() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let issue = report_issue(&app, &world, &owner, &project, "Broken login").await;

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/issues/{}/upvote", issue["id"]))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn strangers_cannot_delete_issues() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let stranger = world.user("stranger").await;
    let project = world.project(&owner, "Board", false).await;
    let app = actix_test::init_service(test_app(&world)).await;
    let issue = report_issue(&app, &world, &owner, &project, "Broken login").await;
    let uri = format!("/api/v1/issues/{}", issue["id"]);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&world, &stranger))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

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
