//! Server construction and middleware wiring.

mod config;
mod secret;
mod settings;

pub use config::ServerConfig;
pub use secret::{Secret, SecretError};
pub use settings::{AppSettings, SettingsError};

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use tracker_backend::Trace;
#[cfg(debug_assertions)]
use tracker_backend::doc::ApiDoc;
use tracker_backend::inbound::http::api_services;
use tracker_backend::inbound::http::error::{json_config, path_config, query_config};
use tracker_backend::inbound::http::health::{HealthState, live, ready};
use tracker_backend::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1").wrap(session).configure(api_services);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is initialised.
/// - `config`: pre-built [`ServerConfig`] containing session, binding and the wired services.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        services,
    } = config;
    let http_state = web::Data::new(HttpState::new(services));

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::{Value, json};
    use tracker_backend::TRACE_ID_HEADER;
    use tracker_backend::inbound::http::health::StorageBackend;
    use tracker_backend::test_support::{PASSWORD, TestWorld};

    fn deps(world: &TestWorld, health_state: web::Data<HealthState>) -> AppDependencies {
        AppDependencies {
            health_state,
            http_state: web::Data::new(HttpState::new(world.services.clone())),
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }
    }

    #[actix_web::test]
    async fn health_checks_follow_the_health_state() {
        let world = TestWorld::new();
        let health_state = web::Data::new(HealthState::new(StorageBackend::Memory));
        let app = actix_test::init_service(build_app(deps(&world, health_state.clone()))).await;

        let request = || actix_test::TestRequest::get().uri("/health/ready").to_request();
        let res = actix_test::call_service(&app, request()).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        health_state.mark_ready();
        let res = actix_test::call_service(&app, request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn session_login_reaches_the_api_with_a_trace_id() {
        let world = TestWorld::new();
        let user = world.user("ada").await;
        let app = actix_test::init_service(build_app(deps(
            &world,
            web::Data::new(HealthState::new(StorageBackend::Memory)),
        )))
        .await;

        let login = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth")
                .set_json(json!({"type": "normal", "username": "ada", "password": PASSWORD}))
                .to_request(),
        )
        .await;
        assert_eq!(login.status(), StatusCode::OK);
        assert!(login.headers().contains_key(TRACE_ID_HEADER));
        let cookie = login
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .map(|cookie| cookie.into_owned())
            .expect("session cookie");

        let me = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/users/me")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(me.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(me).await;
        assert_eq!(body["id"], user.id.get());
    }

    #[actix_web::test]
    async fn errors_carry_the_response_trace_id() {
        let world = TestWorld::new();
        let app = actix_test::init_service(build_app(deps(
            &world,
            web::Data::new(HealthState::new(StorageBackend::Memory)),
        )))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/users/me")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let header = res
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .expect("trace id header");
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["traceId"], header.as_str());
    }
}
