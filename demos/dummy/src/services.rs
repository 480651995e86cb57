//! Commandable and REST services over the dummy controller.

use crate::{Dummy, DummyCommands, DummyController, dummy_schema};
use commandable_core::{ApplicationError, CallCounters, ConfigParams, TypeCode};
use commandable_server::{
    BasicAuthorizer, CommandableHttpService, HttpEndpoint, HttpRequest, HttpResult, Method, Next,
    Reply, RestController, RestOperations, RestService, RouteHandler, RouteMetadata, ServiceRoutes,
    StatusCode, handler, middleware,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DUMMY_BASE_ROUTE: &str = "dummy";

/// Dummy commands as `POST /dummy/{command}`.
#[derive(Debug)]
pub struct DummyCommandableHttpService {
    service: RestService,
    counters: Arc<CallCounters>,
}

impl DummyCommandableHttpService {
    /// Service with its own endpoint.
    pub fn new(config: &ConfigParams, commands: &DummyCommands) -> Self {
        let (controller, counters) = Self::controller(commands);
        Self {
            service: RestService::new(config, controller),
            counters,
        }
    }

    pub fn with_endpoint(
        endpoint: Arc<HttpEndpoint>,
        config: &ConfigParams,
        commands: &DummyCommands,
    ) -> Self {
        let (controller, counters) = Self::controller(commands);
        Self {
            service: RestService::with_endpoint(endpoint, config, controller),
            counters,
        }
    }

    fn controller(commands: &DummyCommands) -> (Arc<dyn RestController>, Arc<CallCounters>) {
        let controller = CommandableHttpService::new(DUMMY_BASE_ROUTE, commands);
        let counters = controller.counters().clone();
        (Arc::new(controller), counters)
    }

    pub fn service(&self) -> &RestService {
        &self.service
    }

    pub fn counters(&self) -> &Arc<CallCounters> {
        &self.counters
    }

    pub async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        self.service.open(correlation_id).await
    }

    pub async fn close(&self, correlation_id: Option<&str>) {
        self.service.close(correlation_id).await
    }
}

/// REST CRUD routes for dummies.
#[derive(Debug)]
pub struct DummyRestService {
    service: RestService,
    calls: Arc<AtomicU64>,
}

impl DummyRestService {
    pub fn new(config: &ConfigParams, controller: Arc<DummyController>) -> Self {
        let (rest, calls) = DummyRestController::new(controller);
        Self {
            service: RestService::new(config, Arc::new(rest)),
            calls,
        }
    }

    pub fn with_endpoint(
        endpoint: Arc<HttpEndpoint>,
        config: &ConfigParams,
        controller: Arc<DummyController>,
    ) -> Self {
        let (rest, calls) = DummyRestController::new(controller);
        Self {
            service: RestService::with_endpoint(endpoint, config, Arc::new(rest)),
            calls,
        }
    }

    pub fn service(&self) -> &RestService {
        &self.service
    }

    /// Requests seen by this service's interceptor.
    pub fn number_of_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        self.service.open(correlation_id).await
    }

    pub async fn close(&self, correlation_id: Option<&str>) {
        self.service.close(correlation_id).await
    }
}

struct DummyRestController {
    operations: RestOperations,
    calls: Arc<AtomicU64>,
}

impl DummyRestController {
    fn new(controller: Arc<DummyController>) -> (Self, Arc<AtomicU64>) {
        let c = controller;
        let operations = RestOperations::new()
            .with_operation("get_page_by_filter", bind(&c, get_page_by_filter))
            .with_operation("get_by_id", bind(&c, get_by_id))
            .with_operation("create", bind(&c, create))
            .with_operation("update", bind(&c, update))
            .with_operation("delete_by_id", bind(&c, delete_by_id))
            .with_operation("check_correlation_id", bind(&c, check_correlation_id))
            .with_operation("raise_exception", bind(&c, raise_exception))
            .with_operation("ping", bind(&c, ping));
        let calls = Arc::new(AtomicU64::new(0));
        (
            Self {
                operations,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn operation(&self, name: &str) -> RouteHandler {
        let operations = self.operations.clone();
        let name = name.to_string();
        Arc::new(move |request: HttpRequest| operations.invoke(&name, request))
    }
}

impl RestController for DummyRestController {
    fn register(&self, routes: &mut ServiceRoutes<'_>) {
        let calls = self.calls.clone();
        routes.register_interceptor(
            "",
            middleware(move |request: HttpRequest, next: Next| {
                calls.fetch_add(1, Ordering::Relaxed);
                next.run(request)
            }),
        );

        let tags = ["dummies"];
        let anybody = || Some(BasicAuthorizer::anybody());

        routes.register_route_with_metadata(
            Method::GET,
            "/dummies",
            anybody(),
            self.operation("get_page_by_filter"),
            RouteMetadata::new()
                .with_tags(tags)
                .receives_correlation_id_param()
                .receives_filter_param()
                .receives_paging_params()
                .receives_sort_param()
                .sends_data_page_200(dummy_schema()),
        );
        routes.register_route_with_metadata(
            Method::GET,
            "/dummies/check/correlation_id",
            anybody(),
            self.operation("check_correlation_id"),
            RouteMetadata::new()
                .with_tags(tags)
                .receives_correlation_id_param()
                .sends_data_200(TypeCode::String),
        );
        routes.register_route_with_metadata(
            Method::GET,
            "/dummies/{dummy_id}",
            anybody(),
            self.operation("get_by_id"),
            RouteMetadata::new()
                .with_tags(tags)
                .receives_correlation_id_param()
                .sends_data_200(dummy_schema())
                .sends_empty_204(),
        );
        routes.register_route_with_metadata(
            Method::POST,
            "/dummies",
            anybody(),
            self.operation("create"),
            RouteMetadata::new()
                .with_tags(tags)
                .receives_correlation_id_param()
                .receives_body(dummy_schema())
                .sends_data(201, "Created dummy", Some(dummy_schema().into())),
        );
        for path in ["/dummies", "/dummies/{dummy_id}"] {
            routes.register_route_with_metadata(
                Method::PUT,
                path,
                anybody(),
                self.operation("update"),
                RouteMetadata::new()
                    .with_tags(tags)
                    .receives_correlation_id_param()
                    .receives_body(dummy_schema())
                    .sends_data_200(dummy_schema())
                    .sends_empty_204(),
            );
        }
        routes.register_route_with_metadata(
            Method::POST,
            "/dummies/raise_exception",
            anybody(),
            self.operation("raise_exception"),
            RouteMetadata::new().with_tags(tags).receives_correlation_id_param(),
        );
        routes.register_route_with_metadata(
            Method::GET,
            "/ping",
            anybody(),
            self.operation("ping"),
            RouteMetadata::new().with_tags(tags).sends_data_200(TypeCode::Boolean),
        );
        routes.register_route_with_metadata(
            Method::DELETE,
            "/dummies/{dummy_id}",
            anybody(),
            self.operation("delete_by_id"),
            RouteMetadata::new()
                .with_tags(tags)
                .receives_correlation_id_param()
                .sends_data_200(dummy_schema())
                .sends_empty_204(),
        );
    }
}

fn bind<F, Fut>(controller: &Arc<DummyController>, f: F) -> RouteHandler
where
    F: Fn(Arc<DummyController>, HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResult> + Send + 'static,
{
    let controller = controller.clone();
    handler(move |request| f(controller.clone(), request))
}

fn dummy_id(request: &HttpRequest) -> String {
    request
        .path_param("dummy_id")
        .or_else(|| request.query("dummy_id"))
        .unwrap_or_default()
        .to_string()
}

async fn get_page_by_filter(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    let page = c
        .get_page_by_filter(
            request.correlation_id(),
            &request.filter_params(),
            &request.paging_params(),
        )
        .await?;
    Reply::json(&page)
}

async fn get_by_id(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    let dummy = c.get_one_by_id(request.correlation_id(), &dummy_id(&request)).await?;
    Reply::json(&dummy)
}

async fn create(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    let dummy: Dummy = request.json()?;
    let created = c.create(request.correlation_id(), dummy).await?;
    Reply::json(&created).map(|reply| reply.with_status(StatusCode::CREATED))
}

async fn update(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    let mut dummy: Dummy = request.json()?;
    if let Some(id) = request.path_param("dummy_id") {
        dummy.id = Some(id.to_string());
    }
    let updated = c.update(request.correlation_id(), dummy).await?;
    Reply::json(&updated)
}

async fn delete_by_id(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    let deleted = c.delete_by_id(request.correlation_id(), &dummy_id(&request)).await?;
    Reply::json(&deleted)
}

async fn check_correlation_id(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    let echoed = c.check_correlation_id(request.correlation_id()).await?;
    Reply::json(&echoed)
}

async fn raise_exception(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    c.raise_exception(request.correlation_id()).await?;
    Ok(Reply::empty())
}

async fn ping(c: Arc<DummyController>, request: HttpRequest) -> HttpResult {
    let pong = c.ping(request.correlation_id()).await?;
    Reply::json(&pong)
}
