//! Tests for the login and registration handlers.

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ServiceConfig;
use crate::inbound::http::error::json_config;
use crate::inbound::http::test_utils::{
    call_json, session_cookie, test_session_middleware, test_state,
};
use crate::test_support::{PASSWORD, TestWorld};

macro_rules! auth_app {
    ($world:expr) => {
        actix_test::init_service(
            App::new()
                .app_data(test_state($world))
                .app_data(json_config())
                .wrap(test_session_middleware())
                .service(web::scope("/api/v1").service(login).service(register)),
        )
        .await
    };
}

#[actix_web::test]
async fn login_returns_a_token_and_sets_the_session_cookie() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let app = auth_app!(&world);

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth")
            .set_json(json!({"type": "normal", "username": "ada", "password": PASSWORD}))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_some());
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["id"], json!(ada.id.get()));
    assert_eq!(body["username"], "ada");
    assert_eq!(body["full_name_display"], "ada tester");
    let token = body["auth_token"].as_str().expect("auth token");
    let requester = world
        .services
        .auth
        .requester_from_token(token)
        .await
        .expect("token resolves");
    assert_eq!(requester.id(), Some(ada.id));
}

#[rstest]
#[case(json!({"type": "normal", "username": "ada", "password": "wrong"}), "Username or password does not matches user.")]
#[case(json!({"type": "normal", "username": "nobody", "password": PASSWORD}), "Username or password does not matches user.")]
#[case(json!({"type": "github", "username": "ada", "password": PASSWORD}), "invalid login type")]
#[actix_web::test]
async fn login_rejects_bad_requests(#[case] payload: Value, #[case] message: &str) {
    let world = TestWorld::new();
    world.user("ada").await;
    let app = auth_app!(&world);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth")
            .set_json(payload)
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["message"], message);
}

#[actix_web::test]
async fn public_registration_creates_an_account() {
    let world = TestWorld::new();
    let app = auth_app!(&world);

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "type": "public",
                "username": "newbie",
                "password": PASSWORD,
                "email": "newbie@example.com",
                "full_name": "New Person",
            }))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(session_cookie(&response).is_some());
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["username"], "newbie");
    assert_eq!(body["email"], "newbie@example.com");
    assert!(body["auth_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body.get("password").is_none());
}

#[rstest]
#[case(json!({"type": "public", "username": "newbie", "password": PASSWORD, "full_name": "N"}), "email")]
#[case(json!({"type": "public", "username": "newbie", "password": PASSWORD, "email": "n@example.com"}), "full_name")]
#[case(json!({"type": "private", "username": "newbie", "password": PASSWORD}), "token")]
#[case(json!({"type": "corporate", "username": "newbie", "password": PASSWORD}), "type")]
#[actix_web::test]
async fn registration_reports_the_offending_field(#[case] payload: Value, #[case] field: &str) {
    let world = TestWorld::new();
    let app = auth_app!(&world);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(payload)
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], field);
}

#[actix_web::test]
async fn public_registration_obeys_the_switch() {
    let world = TestWorld::with_config(ServiceConfig::default());
    let app = auth_app!(&world);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "type": "public",
                "username": "newbie",
                "password": PASSWORD,
                "email": "newbie@example.com",
                "full_name": "New Person",
            }))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Public register is disabled.");
}

#[actix_web::test]
async fn private_registration_with_an_unknown_token_is_not_found() {
    let world = TestWorld::new();
    let app = auth_app!(&world);

    let (status, _) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "type": "private",
                "username": "newbie",
                "password": PASSWORD,
                "email": "newbie@example.com",
                "full_name": "New Person",
                "token": "not-a-token",
            }))
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn malformed_login_bodies_are_bad_requests() {
    let world = TestWorld::new();
    let app = auth_app!(&world);

    let (status, body) = call_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"type\":")
            .to_request(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}
