//! Liveness and readiness checks.
//!
//! Both endpoints answer with a small JSON body naming the active backend so an
//! operator can tell a deployment running on in-memory adapters apart from
//! one wired to the hosted backend.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use utoipa::ToSchema;

/// Which set of outbound adapters serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Supabase,
    Memory,
}

/// Health state shared across workers. Starts live but not ready.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    backend: BackendKind,
}

impl HealthState {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            backend,
        }
    }

    /// Mark the service as ready once the listener is bound.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness so orchestrators stop routing during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    fn health_response(&self, healthy: bool) -> HttpResponse {
        let mut response = if healthy {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };
        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .json(HealthBody {
                status: if healthy { "ok" } else { "unavailable" },
                backend: self.backend,
            })
    }
}

/// Health check response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthBody {
    status: &'static str,
    backend: BackendKind,
}

/// Readiness check: 200 once the server accepts traffic, 503 before.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic", body = HealthBody),
        (status = 503, description = "Server is not ready", body = HealthBody)
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    state.health_response(state.is_ready())
}

/// Liveness check: 200 while alive, 503 once draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is alive", body = HealthBody),
        (status = 503, description = "Server is shutting down", body = HealthBody)
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    state.health_response(state.is_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::Value;

    async fn check(state: web::Data<HealthState>, uri: &str) -> (StatusCode, Value) {
        let app = test::init_service(App::new().app_data(state).service(ready).service(live)).await;
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = res.status();
        assert_eq!(
            res.headers()
                .get(header::CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("no-store")
        );
        (status, test::read_body_json(res).await)
    }

    #[rstest]
    #[actix_web::test]
    async fn readiness_follows_mark_ready() {
        let state = web::Data::new(HealthState::new(BackendKind::Memory));
        let (status, body) = check(state.clone(), "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["backend"], "memory");

        state.mark_ready();
        let (status, body) = check(state, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[rstest]
    #[actix_web::test]
    async fn liveness_fails_after_mark_unhealthy() {
        let state = web::Data::new(HealthState::new(BackendKind::Supabase));
        let (status, _) = check(state.clone(), "/health/live").await;
        assert_eq!(status, StatusCode::OK);

        state.mark_unhealthy();
        let (status, body) = check(state, "/health/live").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["backend"], "supabase");
    }
}
