//! Liveness and readiness checks.
//!
//! Both answer with `Cache-Control: no-store` and a small JSON body naming
//! the check outcome and the storage backend in use.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use utoipa::ToSchema;

/// Where the repositories keep their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Diesel over a bb8 pool.
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

/// Health outcome reported to orchestrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthBody {
    #[schema(example = "ready")]
    pub status: &'static str,
    pub storage: StorageBackend,
}

/// Readiness and liveness flags shared by every worker.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    storage: StorageBackend,
}

impl HealthState {
    /// Live but not yet ready.
    pub fn new(storage: StorageBackend) -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            storage,
        }
    }

    /// Start answering readiness checks with success.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness checks while the server drains.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn respond(&self, ok: bool, ok_status: &'static str, failed_status: &'static str) -> HttpResponse {
        let mut response = if ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };
        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .json(HealthBody {
                status: if ok { ok_status } else { failed_status },
                storage: self.storage,
            })
    }
}

/// 200 once repositories and services are wired, 503 before.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Serving traffic", body = HealthBody),
        (status = 503, description = "Still starting", body = HealthBody)
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    state.respond(state.is_ready(), "ready", "starting")
}

/// 200 while alive, 503 once [`HealthState::mark_unhealthy`] was called.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Process is alive", body = HealthBody),
        (status = 503, description = "Process is draining", body = HealthBody)
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    state.respond(state.is_alive(), "alive", "draining")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::{Value, json};

    async fn check(state: web::Data<HealthState>, uri: &str) -> (StatusCode, Option<String>, Value) {
        let app = test::init_service(App::new().app_data(state).service(ready).service(live)).await;
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = res.status();
        let cache = res
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body: Value = test::read_body_json(res).await;
        (status, cache, body)
    }

    #[rstest]
    #[case(false, StatusCode::SERVICE_UNAVAILABLE, "starting")]
    #[case(true, StatusCode::OK, "ready")]
    #[actix_web::test]
    async fn readiness_follows_state(
        #[case] mark_ready: bool,
        #[case] expected: StatusCode,
        #[case] label: &str,
    ) {
        let state = web::Data::new(HealthState::new(StorageBackend::Postgres));
        if mark_ready {
            state.mark_ready();
        }

        let (status, cache, body) = check(state, "/health/ready").await;

        assert_eq!(status, expected);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body, json!({"status": label, "storage": "postgres"}));
    }

    #[actix_web::test]
    async fn liveness_fails_once_draining() {
        let state = web::Data::new(HealthState::new(StorageBackend::Memory));
        let (status, _, body) = check(state.clone(), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "memory");

        state.mark_unhealthy();

        let (status, _, body) = check(state, "/health/live").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "draining");
    }
}
