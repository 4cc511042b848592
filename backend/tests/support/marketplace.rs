//! Server harness and shared world for marketplace integration tests.
//!
//! The harness owns a single-threaded Tokio runtime plus a `LocalSet` because
//! Actix uses `spawn_local` internally. The server runs on in-memory adapters
//! and is driven through `MarketplaceClient`. `WorldFixture` stops the
//! server even if a test panics.

use std::cell::RefCell;
use std::future::Future;
use std::net::TcpListener;
use std::rc::Rc;
use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Key, SameSite, time::Duration as CookieDuration};
use actix_web::dev::ServerHandle;
use actix_web::{App, HttpServer, web};
use mockable::{Clock, DefaultClock};
use parcel_market::Trace;
use parcel_market::client::{ClientError, MarketplaceClient};
use parcel_market::domain::DEFAULT_MAX_IMAGE_BYTES;
use parcel_market::inbound::http::parcels::SubmissionResponse;
use parcel_market::inbound::http::state::{DrivenPorts, HttpState, HttpStatePorts};
use parcel_market::inbound::http::{configure, json_body_limit};
use parcel_market::outbound::memory::{MemoryAuthProvider, MemoryObjectStorage, MemoryStore};
use rstest::fixture;
use tokio::runtime::Runtime;
use tokio::task::LocalSet;

pub(crate) const COOKIE_NAME: &str = "parcel_session";
pub(crate) const STORAGE_BASE: &str = "http://storage.test/public";

pub(crate) struct MarketplaceWorld {
    pub(crate) runtime: Runtime,
    pub(crate) local: LocalSet,
    pub(crate) base_url: String,
    pub(crate) server: ServerHandle,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) storage: Arc<MemoryObjectStorage>,
    pub(crate) client: Arc<MarketplaceClient>,
    pub(crate) last_submission: Option<SubmissionResponse>,
    pub(crate) last_error: Option<ClientError>,
    pub(crate) last_location: Option<String>,
}

pub(crate) type SharedWorld = Rc<RefCell<MarketplaceWorld>>;

pub(crate) struct WorldFixture {
    world: SharedWorld,
}

impl WorldFixture {
    pub(crate) fn world(&self) -> SharedWorld {
        self.world.clone()
    }
}

impl Drop for WorldFixture {
    fn drop(&mut self) {
        shutdown(&self.world);
    }
}

fn shutdown(world: &SharedWorld) {
    // `LocalSet` must be driven on the thread that owns it, so we lock the world
    // while calling `block_on`. The future must not try to lock the world.
    let ctx = world.borrow();
    let server = ctx.server.clone();
    ctx.local.block_on(&ctx.runtime, async move {
        server.stop(true).await;
    });
}

/// Run `operation` against the world's client on the harness runtime.
pub(crate) fn with_client<R, F>(
    world: &SharedWorld,
    operation: impl FnOnce(Arc<MarketplaceClient>, String) -> F,
) -> R
where
    F: Future<Output = R>,
{
    let ctx = world.borrow();
    let client = ctx.client.clone();
    let base_url = ctx.base_url.clone();
    ctx.local.block_on(&ctx.runtime, operation(client, base_url))
}

fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(COOKIE_NAME.to_owned())
        .cookie_path("/".to_owned())
        .cookie_secure(false)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(PersistentSession::default().session_ttl(CookieDuration::hours(2)))
        .build()
}

async fn spawn_marketplace_server(http_state: HttpState) -> Result<(String, ServerHandle), String> {
    let key = Key::generate();
    let listener = TcpListener::bind("127.0.0.1:0").map_err(|err| err.to_string())?;
    let addr = listener.local_addr().map_err(|err| err.to_string())?;
    let http_data = web::Data::new(http_state);
    let json_limit = json_body_limit(DEFAULT_MAX_IMAGE_BYTES);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(http_data.clone())
            .wrap(session_middleware(key.clone()))
            .wrap(Trace)
            .configure(configure(json_limit))
    })
    .disable_signals()
    .workers(1)
    .listen(listener)
    .map_err(|err| err.to_string())?
    .run();

    let handle = server.handle();
    actix_web::rt::spawn(server);
    Ok((format!("http://{addr}"), handle))
}

fn create_runtime_and_local() -> (Runtime, LocalSet) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let local = LocalSet::new();
    (runtime, local)
}

#[fixture]
pub(crate) fn world() -> WorldFixture {
    let (runtime, local) = create_runtime_and_local();
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let storage = Arc::new(MemoryObjectStorage::new(STORAGE_BASE));
    let ports = HttpStatePorts::assemble(
        DrivenPorts {
            auth: Arc::new(MemoryAuthProvider::new(clock.clone())),
            users: store.clone(),
            parcels: store.clone(),
            images: store.clone(),
            storage: storage.clone(),
        },
        clock,
        DEFAULT_MAX_IMAGE_BYTES,
    );
    let (base_url, server) = local
        .block_on(&runtime, async {
            spawn_marketplace_server(HttpState::new(ports)).await
        })
        .expect("server should start");
    let client = Arc::new(MarketplaceClient::new(&base_url).expect("client"));

    let world = Rc::new(RefCell::new(MarketplaceWorld {
        runtime,
        local,
        base_url,
        server,
        store,
        storage,
        client,
        last_submission: None,
        last_error: None,
        last_location: None,
    }));
    WorldFixture { world }
}
