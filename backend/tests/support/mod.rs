//! Shared helpers for the HTTP integration tests.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::Key;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, HeaderName};
use actix_web::{App, test as actix_test, web};
use serde_json::Value;

use tracker_backend::Trace;
use tracker_backend::inbound::http::api_services;
use tracker_backend::inbound::http::error::{json_config, path_config, query_config};
use tracker_backend::inbound::http::state::HttpState;
use tracker_backend::test_support::TestWorld;

/// The `/api/v1` surface over the in-memory adapters of `world`.
pub fn app(
    world: &TestWorld,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();
    App::new()
        .app_data(web::Data::new(HttpState::new(world.services.clone())))
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .wrap(Trace)
        .service(web::scope("/api/v1").wrap(session).configure(api_services))
}

/// `Authorization` header for a token returned by the API.
pub fn bearer(token: &str) -> (HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

/// Call `app` and decode the JSON body; empty bodies read as `null`.
pub async fn call_json<S, B>(app: &S, request: actix_http::Request) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let response = actix_test::call_service(app, request).await;
    let status = response.status();
    let body = actix_test::read_body(response).await;
    if body.is_empty() {
        return (status, Value::Null);
    }
    let value = serde_json::from_slice(&body).expect("JSON response body");
    (status, value)
}

/// Integer field of a JSON body.
pub fn id_of(body: &Value, field: &str) -> i64 {
    body[field]
        .as_i64()
        .unwrap_or_else(|| panic!("{field} missing from {body}"))
}
