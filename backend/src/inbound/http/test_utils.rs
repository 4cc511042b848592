//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, test, web};
use chrono::{TimeZone, Utc};
use mockable::Clock;
use serde_json::json;

use crate::domain::DEFAULT_MAX_IMAGE_BYTES;
use crate::domain::test_support::FixedClock;
use crate::inbound::http::state::{DrivenPorts, HttpState, HttpStatePorts};
use crate::outbound::memory::{MemoryAuthProvider, MemoryObjectStorage, MemoryStore};

/// Cookie name used by [`test_session_middleware`].
pub const TEST_COOKIE_NAME: &str = "session";

/// Password used by [`signed_in_cookie`].
pub const TEST_PASSWORD: &str = "secret1";

/// Session middleware with a fresh key and an insecure cookie for plain HTTP
/// tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name(TEST_COOKIE_NAME.to_owned())
        .cookie_secure(false)
        .build()
}

/// Extract the session cookie set on a response.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == TEST_COOKIE_NAME)
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Memory adapters plus the handler state built on them.
pub struct TestBackend {
    pub auth: Arc<MemoryAuthProvider>,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryObjectStorage>,
    pub state: HttpState,
}

impl TestBackend {
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0)
                .single()
                .expect("fixture time"),
        ));
        Self::with_auth(MemoryAuthProvider::new(clock.clone()), clock)
    }

    pub fn with_auth(auth: MemoryAuthProvider, clock: Arc<dyn Clock>) -> Self {
        let auth = Arc::new(auth);
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let storage = Arc::new(MemoryObjectStorage::new("http://storage.test/public"));
        let ports = HttpStatePorts::assemble(
            DrivenPorts {
                auth: auth.clone(),
                users: store.clone(),
                parcels: store.clone(),
                images: store.clone(),
                storage: storage.clone(),
            },
            clock,
            DEFAULT_MAX_IMAGE_BYTES,
        );
        let state = HttpState::new(ports).with_public_base_url("http://parcels.test");
        Self {
            auth,
            store,
            storage,
            state,
        }
    }

    /// Full application: every route, the session cookie and the JSON limits.
    pub fn app(
        &self,
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
            .app_data(web::Data::new(self.state.clone()))
            .wrap(test_session_middleware())
            .configure(super::configure(super::json_body_limit(
                DEFAULT_MAX_IMAGE_BYTES,
            )))
    }
}

/// Register `email` with landlord metadata and return the session cookie.
pub async fn signed_in_cookie<S, B>(app: &S, email: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({
            "email": email,
            "password": TEST_PASSWORD,
            "fullName": "Ada",
            "isLandlord": true,
        }))
        .to_request();
    let res = test::call_service(app, req).await;
    assert!(res.status().is_success(), "sign-up failed: {}", res.status());
    session_cookie(&res)
}
