//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, HeaderName};
use actix_web::{App, test as actix_test, web};
use serde_json::Value;

use crate::domain::User;
use crate::test_support::TestWorld;

use super::error::{json_config, path_config, query_config};
use super::state::HttpState;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Handler state sharing the services of `world`.
pub fn test_state(world: &TestWorld) -> web::Data<HttpState> {
    web::Data::new(HttpState::new(world.services.clone()))
}

/// The full `/api/v1` surface over the in-memory adapters of `world`.
pub fn test_app(
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
    App::new()
        .app_data(test_state(world))
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .wrap(test_session_middleware())
        .service(web::scope("/api/v1").configure(super::api_services))
}

/// `Authorization` header authenticating as `user`.
pub fn bearer(world: &TestWorld, user: &User) -> (HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", world.auth_token(user)))
}

/// Session cookie set by `response`, if any.
pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
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
