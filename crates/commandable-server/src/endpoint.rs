//! The HTTP endpoint: one listening socket shared by many services.
//!
//! Services add routes through [`HttpEndpoint::register`]. Registrations made
//! before [`open`](HttpEndpoint::open) are applied when the endpoint opens;
//! registrations made while it is open take effect immediately. Requests
//! are served from an immutable [`RouteTable`] snapshot that is swapped
//! atomically whenever registrations change.

use crate::handler::{Middleware, RouteHandler};
use crate::response::error_response;
use crate::routes::{RouteMatch, RouteTable};
use crate::tls::{self, CredentialParams};
use crate::{HttpRequest, Registrable, RouteDoc, RouteMetadata, RouteRegistrar};
use arc_swap::ArcSwap;
use axum::Router;
use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use commandable_core::{
    ApplicationError, ConfigParams, ConnectionParams, Discovery, HttpConnectionResolver,
};
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const DEFAULT_MAX_BODY: usize = 1024 * 1024;
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle state of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Closed,
    Opening,
    Open,
    Closing,
}

struct Slot {
    registration: Arc<dyn Registrable>,
    routes: Option<RouteRegistrar>,
}

#[derive(Default)]
struct Registry {
    /// Routes are being served; new registrations apply immediately.
    active: bool,
    direct: RouteRegistrar,
    slots: Vec<Slot>,
}

struct LiveRoutes {
    table: ArcSwap<RouteTable>,
    max_body: usize,
}

struct RunningServer {
    uri: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct HttpEndpoint {
    resolver: HttpConnectionResolver,
    credentials: CredentialParams,
    registry: Mutex<Registry>,
    live: Arc<LiveRoutes>,
    state: Mutex<EndpointState>,
    server: tokio::sync::Mutex<Option<RunningServer>>,
}

impl std::fmt::Debug for HttpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEndpoint")
            .field("resolver", &self.resolver)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for HttpEndpoint {
    fn default() -> Self {
        Self::from_config(&ConfigParams::new())
    }
}

impl HttpEndpoint {
    /// Configure from `connection.*`, `connections.*`, `credential.*` and
    /// `options.request_max_size`.
    ///
    /// A lone `connection` section is defaulted to `http://0.0.0.0:3000`.
    pub fn from_config(config: &ConfigParams) -> Self {
        let config = if config.section("connections").is_empty() {
            config.set_defaults(&ConfigParams::from_tuples([
                ("connection.protocol", "http"),
                ("connection.host", "0.0.0.0"),
                ("connection.port", "3000"),
            ]))
        } else {
            config.clone()
        };
        let mut resolver = HttpConnectionResolver::new();
        resolver.configure(&config);
        let max_body = config
            .get_as_nullable_integer("options.request_max_size")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_MAX_BODY);

        Self {
            resolver,
            credentials: CredentialParams::from_config(&config),
            registry: Mutex::new(Registry::default()),
            live: Arc::new(LiveRoutes {
                table: ArcSwap::from_pointee(RouteTable::default()),
                max_body,
            }),
            state: Mutex::new(EndpointState::Closed),
            server: tokio::sync::Mutex::new(None),
        }
    }

    /// Resolve `discovery_key` connections through `discovery`.
    pub fn with_discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.resolver.set_discovery(discovery);
        self
    }

    pub fn state(&self) -> EndpointState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state() == EndpointState::Open
    }

    /// Resolve the connection, bind and start serving.
    ///
    /// Opening an open endpoint does nothing.
    pub async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        let mut server = self.server.lock().await;
        if server.is_some() {
            return Ok(());
        }
        self.set_state(EndpointState::Opening);

        let result = match self.resolver.resolve(correlation_id).await {
            Ok(conn) => {
                self.activate();
                self.start(correlation_id, &conn).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(running) => {
                info!("Listening on {}", running.uri);
                *server = Some(running);
                self.set_state(EndpointState::Open);
                if let Err(e) = self.resolver.register(correlation_id).await {
                    warn!(correlation_id, "Failed to register endpoint in discovery: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                self.deactivate();
                self.set_state(EndpointState::Closed);
                Err(e)
            }
        }
    }

    /// Stop serving. Shutdown problems are logged, never returned.
    pub async fn close(&self, correlation_id: Option<&str>) {
        let mut server = self.server.lock().await;
        let Some(mut running) = server.take() else {
            return;
        };
        self.set_state(EndpointState::Closing);

        if running.shutdown.send(()).is_err() {
            debug!(correlation_id, "Server task already stopped");
        }
        match tokio::time::timeout(CLOSE_GRACE, &mut running.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(correlation_id, "Server task failed during shutdown: {}", e),
            Err(_) => {
                warn!(correlation_id, "Server did not stop within {:?}; aborting", CLOSE_GRACE);
                running.task.abort();
            }
        }

        self.deactivate();
        self.set_state(EndpointState::Closed);
        info!("Closed REST service at {}", running.uri);
    }

    /// Attach a route contributor.
    pub fn register(&self, registration: Arc<dyn Registrable>) {
        let mut registry = self.registry.lock();
        let routes = registry.active.then(|| collect(registration.as_ref()));
        registry.slots.push(Slot { registration, routes });
        if registry.active {
            self.publish(&registry);
        }
    }

    /// Detach a route contributor; its routes disappear from a live endpoint.
    pub fn unregister(&self, registration: &Arc<dyn Registrable>) {
        let mut registry = self.registry.lock();
        registry
            .slots
            .retain(|s| !Arc::ptr_eq(&s.registration, registration));
        if registry.active {
            self.publish(&registry);
        }
    }

    pub fn register_route(&self, method: Method, path: &str, handler: RouteHandler) {
        self.update_direct(|routes| routes.register_route(method, path, handler));
    }

    pub fn register_route_with_auth(
        &self,
        method: Method,
        path: &str,
        authorize: Middleware,
        handler: RouteHandler,
    ) {
        self.update_direct(|routes| {
            routes.register_route_with_auth(method, path, authorize, handler)
        });
    }

    pub fn register_route_with_metadata(
        &self,
        method: Method,
        path: &str,
        authorize: Option<Middleware>,
        handler: RouteHandler,
        metadata: RouteMetadata,
    ) {
        self.update_direct(|routes| {
            routes.register_route_with_metadata(method, path, authorize, handler, metadata)
        });
    }

    pub fn register_interceptor(&self, prefix: &str, action: Middleware) {
        self.update_direct(|routes| routes.register_interceptor(prefix, action));
    }

    /// Documented routes currently served.
    pub fn route_docs(&self) -> Vec<RouteDoc> {
        self.live.table.load().route_docs()
    }

    fn update_direct(&self, f: impl FnOnce(&mut RouteRegistrar)) {
        let mut registry = self.registry.lock();
        f(&mut registry.direct);
        if registry.active {
            self.publish(&registry);
        }
    }

    fn set_state(&self, state: EndpointState) {
        *self.state.lock() = state;
    }

    /// Collect every pending registration and publish the table.
    fn activate(&self) {
        let mut registry = self.registry.lock();
        for slot in &mut registry.slots {
            slot.routes = Some(collect(slot.registration.as_ref()));
        }
        registry.active = true;
        self.publish(&registry);
    }

    fn deactivate(&self) {
        let mut registry = self.registry.lock();
        for slot in &mut registry.slots {
            slot.routes = None;
        }
        registry.active = false;
        self.live.table.store(Arc::new(RouteTable::default()));
    }

    fn publish(&self, registry: &Registry) {
        let sets = std::iter::once(&registry.direct)
            .chain(registry.slots.iter().filter_map(|s| s.routes.as_ref()));
        self.live.table.store(Arc::new(RouteTable::build(sets)));
    }

    async fn start(
        &self,
        correlation_id: Option<&str>,
        conn: &ConnectionParams,
    ) -> Result<RunningServer, ApplicationError> {
        let uri = conn.uri().unwrap_or_default().to_string();
        let cannot_connect = |cause: &dyn std::fmt::Display| {
            ApplicationError::connection(
                correlation_id,
                "CANNOT_CONNECT",
                "Opening HTTP endpoint failed",
            )
            .with_details("url", uri.clone())
            .with_cause(cause)
        };

        let tls_config = if conn.protocol() == Some("https") {
            let config = tls::load_server_config(correlation_id, &self.credentials)
                .map_err(|e| cannot_connect(&e))?;
            Some(config)
        } else {
            None
        };

        let host = match conn.host().unwrap_or_default() {
            "localhost" => "127.0.0.1",
            other => other,
        };
        let listener = TcpListener::bind((host, conn.port()))
            .await
            .map_err(|e| cannot_connect(&e))?;

        let app = self.router();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = match tls_config {
            Some(config) => tokio::spawn(tls::serve(listener, config, app, shutdown_rx)),
            None => tokio::spawn(async move {
                let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                });
                if let Err(e) = serve.await {
                    warn!("HTTP server stopped with error: {}", e);
                }
            }),
        };

        Ok(RunningServer { uri, shutdown, task })
    }

    fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(self.live.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
    }
}

fn collect(registration: &dyn Registrable) -> RouteRegistrar {
    let mut routes = RouteRegistrar::new();
    registration.register(&mut routes);
    routes
}

/// Outermost boundary: every error and panic becomes an error response here.
async fn dispatch(State(live): State<Arc<LiveRoutes>>, request: Request) -> Response {
    let table = live.table.load_full();
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let (route, params) = match table.find(&parts.method, &path) {
        RouteMatch::Found(route, params) => (route.clone(), params),
        RouteMatch::MethodNotAllowed => {
            let message = format!("Method {} is not allowed for {}", parts.method, path);
            let err = ApplicationError::unsupported(None, "METHOD_NOT_ALLOWED", message)
                .with_status(405);
            return error_response(&err);
        }
        RouteMatch::NotFound => {
            let message = format!("Route {} {} was not found", parts.method, path);
            let err = ApplicationError::not_found(None, "ROUTE_NOT_FOUND", message)
                .with_details("path", path);
            return error_response(&err);
        }
    };

    let body = match to_bytes(body, live.max_body).await {
        Ok(body) => body,
        Err(e) => {
            let err = ApplicationError::bad_request(
                None,
                "CANNOT_READ_BODY",
                "Failed to read request body",
            )
            .with_cause(e);
            return error_response(&err);
        }
    };

    let request = HttpRequest::new(parts.method, parts.uri, parts.headers, body)
        .with_route(route.route().clone(), params);
    let correlation_id = request.correlation_id().map(str::to_string);
    debug!(
        correlation_id = correlation_id.as_deref(),
        route = %route.route(),
        "dispatching request"
    );

    let call = route.invoke(request, table.interceptor_for(&path));
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(reply)) => reply.into_response(),
        Ok(Err(err)) => {
            let err = match err.correlation_id() {
                Some(_) => err,
                None => err.with_correlation_id(correlation_id.as_deref()),
            };
            debug!(
                correlation_id = correlation_id.as_deref(),
                code = err.code(),
                "request failed: {}",
                err
            );
            error_response(&err)
        }
        Err(_) => {
            let err = ApplicationError::unknown(
                correlation_id.as_deref(),
                "HANDLER_PANICKED",
                "Request handler panicked",
            )
            .with_details("route", route.route().to_string());
            warn!(
                correlation_id = correlation_id.as_deref(),
                route = %route.route(),
                "request handler panicked"
            );
            error_response(&err)
        }
    }
}
