//! Tests for the users handlers.

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::json;

use crate::domain::ProjectPermission;
use crate::inbound::http::test_utils::{bearer, call_json, test_app};
use crate::test_support::{PASSWORD, TestWorld};

#[actix_web::test]
async fn me_needs_credentials() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users/me")
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users/me")
            .insert_header(bearer(&world, &ada))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");
}

#[rstest]
#[case("member", StatusCode::OK)]
#[case("outsider", StatusCode::FORBIDDEN)]
#[actix_web::test]
async fn project_user_lists_need_membership(#[case] who: &str, #[case] expected: StatusCode) {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let member = world.user("member").await;
    let outsider = world.user("outsider").await;
    let project = world.project(&owner, "Board", false).await;
    world
        .member(&project, &member, &[ProjectPermission::ViewProject])
        .await;
    let caller = if who == "member" { &member } else { &outsider };
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/users?project={}", project.id))
            .insert_header(bearer(&world, caller))
            .to_request(),
    )
    .await;

    assert_eq!(status, expected);
    if expected == StatusCode::OK {
        let names: Vec<&str> = body
            .as_array()
            .expect("user array")
            .iter()
            .filter_map(|user| user["username"].as_str())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"owner") && names.contains(&"member"));
    }
}

#[actix_web::test]
async fn profiles_are_edited_by_their_owner_only() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let grace = world.user("grace").await;
    let app = actix_test::init_service(test_app(&world)).await;
    let uri = format!("/api/v1/users/{}", ada.id);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(&world, &grace))
            .set_json(json!({"bio": "hijacked"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(&world, &ada))
            .set_json(json!({"bio": "Analyst", "full_name": "Ada King"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Analyst");
    assert_eq!(body["full_name_display"], "Ada King");
}

#[actix_web::test]
async fn password_recovery_mails_a_token() {
    let world = TestWorld::new();
    world.user("ada").await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/password_recovery")
            .set_json(json!({"username": "ada"}))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"], "Mail sended successful!");
    assert_eq!(world.mailer.sent_of("password_recovery").len(), 1);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/password_recovery")
            .set_json(json!({"username": "nobody"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[case(PASSWORD, StatusCode::NO_CONTENT)]
#[case("not-my-password", StatusCode::BAD_REQUEST)]
#[actix_web::test]
async fn change_password_checks_the_current_one(
    #[case] current: &str,
    #[case] expected: StatusCode,
) {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/change_password")
            .insert_header(bearer(&world, &ada))
            .set_json(json!({"current_password": current, "password": "brand-new-secret"}))
            .to_request(),
    )
    .await;

    assert_eq!(status, expected);
}

#[actix_web::test]
async fn deleting_oneself_cancels_the_account() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let app = actix_test::init_service(test_app(&world)).await;

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/{}", ada.id))
            .insert_header(bearer(&world, &ada))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth")
            .set_json(json!({"type": "normal", "username": "ada", "password": PASSWORD}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/cancel")
            .set_json(json!({"cancel_token": "forged"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
