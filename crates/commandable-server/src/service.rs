//! REST services: a controller's routes mounted under a base route.
//!
//! A [`RestService`] registers its controller on an [`HttpEndpoint`]. The
//! endpoint is either shared with other services or created from the
//! service's own configuration, in which case the service opens and closes
//! it.

use crate::handler::{Middleware, RouteHandler, handler};
use crate::routes::join_route;
use crate::{
    HttpEndpoint, OpenApiDocumentBuilder, Registrable, Reply, RouteMetadata, RouteRegistrar,
};
use axum::http::Method;
use commandable_core::{ApplicationError, ConfigParams};
use std::sync::Arc;
use tracing::{debug, warn};

/// Contributes routes relative to the service's base route.
pub trait RestController: Send + Sync + 'static {
    fn register(&self, routes: &mut ServiceRoutes<'_>);

    /// Base route used when the configuration names none.
    fn default_base_route(&self) -> Option<&str> {
        None
    }
}

/// Route registrar that prefixes everything with a base route.
pub struct ServiceRoutes<'a> {
    routes: &'a mut RouteRegistrar,
    base_route: &'a str,
}

impl<'a> ServiceRoutes<'a> {
    pub fn new(routes: &'a mut RouteRegistrar, base_route: &'a str) -> Self {
        Self { routes, base_route }
    }

    /// Base route without surrounding slashes; empty when there is none.
    pub fn base_route(&self) -> &str {
        self.base_route.trim_matches('/')
    }

    pub fn register_route(&mut self, method: Method, path: &str, handler: RouteHandler) {
        let route = join_route(self.base_route, path);
        self.routes.register_route(method, &route, handler);
    }

    pub fn register_route_with_auth(
        &mut self,
        method: Method,
        path: &str,
        authorize: Middleware,
        handler: RouteHandler,
    ) {
        let route = join_route(self.base_route, path);
        self.routes.register_route_with_auth(method, &route, authorize, handler);
    }

    pub fn register_route_with_metadata(
        &mut self,
        method: Method,
        path: &str,
        authorize: Option<Middleware>,
        handler: RouteHandler,
        metadata: RouteMetadata,
    ) {
        let route = join_route(self.base_route, path);
        self.routes
            .register_route_with_metadata(method, &route, authorize, handler, metadata);
    }

    /// Interceptor for paths under `base_route/prefix`.
    pub fn register_interceptor(&mut self, prefix: &str, action: Middleware) {
        let prefix = join_route(self.base_route, prefix);
        self.routes.register_interceptor(&prefix, action);
    }
}

#[derive(Debug, Clone, Default)]
struct SwaggerConfig {
    enabled: bool,
    route: String,
    content: Option<String>,
    file: Option<String>,
    builder: OpenApiDocumentBuilder,
}

impl SwaggerConfig {
    fn from_config(config: &ConfigParams) -> Self {
        Self {
            enabled: config.get_as_bool_or("swagger.enable", false),
            route: config.get_as_string_or("swagger.route", "swagger"),
            content: config.get_as_nullable_string("openapi_content"),
            file: config.get_as_nullable_string("openapi_file"),
            builder: OpenApiDocumentBuilder::from_config(config),
        }
    }

    /// Configured content, else the configured file, else the generated document.
    fn document(&self, routes: &RouteRegistrar) -> String {
        if let Some(content) = &self.content {
            return content.clone();
        }
        if let Some(file) = &self.file {
            match std::fs::read_to_string(file) {
                Ok(content) => return content,
                Err(e) => warn!("Failed to read OpenAPI file {}: {}", file, e),
            }
        }
        self.builder.build_string(&routes.route_docs())
    }
}

/// Registration handed to the endpoint.
struct Mount {
    base_route: String,
    controller: Arc<dyn RestController>,
    swagger: SwaggerConfig,
}

impl Registrable for Mount {
    fn register(&self, routes: &mut RouteRegistrar) {
        self.controller
            .register(&mut ServiceRoutes::new(routes, &self.base_route));

        if self.swagger.enabled {
            let document = self.swagger.document(routes);
            let content_type = if document.trim_start().starts_with('{') {
                "application/json"
            } else {
                "application/x-yaml"
            };
            let route = join_route(&self.base_route, &self.swagger.route);
            debug!(route = %route, "serving OpenAPI document");
            routes.register_route(
                Method::GET,
                &route,
                handler(move |_req| {
                    let reply = Reply::text(content_type, document.clone());
                    async move { Ok(reply) }
                }),
            );
        }
    }
}

pub struct RestService {
    endpoint: Arc<HttpEndpoint>,
    local_endpoint: bool,
    base_route: String,
    registration: Arc<dyn Registrable>,
}

impl std::fmt::Debug for RestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestService")
            .field("base_route", &self.base_route)
            .field("local_endpoint", &self.local_endpoint)
            .finish_non_exhaustive()
    }
}

impl RestService {
    /// Service with its own endpoint, configured from the same parameters.
    pub fn new(config: &ConfigParams, controller: Arc<dyn RestController>) -> Self {
        let endpoint = Arc::new(HttpEndpoint::from_config(config));
        Self::mount(endpoint, true, config, controller)
    }

    /// Service attached to a shared endpoint.
    pub fn with_endpoint(
        endpoint: Arc<HttpEndpoint>,
        config: &ConfigParams,
        controller: Arc<dyn RestController>,
    ) -> Self {
        Self::mount(endpoint, false, config, controller)
    }

    fn mount(
        endpoint: Arc<HttpEndpoint>,
        local_endpoint: bool,
        config: &ConfigParams,
        controller: Arc<dyn RestController>,
    ) -> Self {
        let base_route = config
            .get_as_nullable_string("base_route")
            .or_else(|| controller.default_base_route().map(str::to_string))
            .unwrap_or_default();
        let registration: Arc<dyn Registrable> = Arc::new(Mount {
            base_route: base_route.clone(),
            controller,
            swagger: SwaggerConfig::from_config(config),
        });
        endpoint.register(registration.clone());
        Self {
            endpoint,
            local_endpoint,
            base_route,
            registration,
        }
    }

    pub fn endpoint(&self) -> &Arc<HttpEndpoint> {
        &self.endpoint
    }

    pub fn base_route(&self) -> &str {
        &self.base_route
    }

    pub fn is_open(&self) -> bool {
        self.endpoint.is_open()
    }

    /// Open the endpoint if this service owns it.
    pub async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        if self.local_endpoint {
            self.endpoint.open(correlation_id).await?;
        }
        Ok(())
    }

    /// Close the endpoint if this service owns it.
    pub async fn close(&self, correlation_id: Option<&str>) {
        if self.local_endpoint {
            self.endpoint.close(correlation_id).await;
        }
    }

    /// Remove this service's routes from the endpoint.
    pub fn detach(&self) {
        self.endpoint.unregister(&self.registration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Ping;

    impl RestController for Ping {
        fn register(&self, routes: &mut ServiceRoutes<'_>) {
            routes.register_route_with_metadata(
                Method::GET,
                "/ping",
                None,
                handler(|_req| async { Ok(Reply::result(json!("pong"))) }),
                RouteMetadata::new().with_tags(["ping"]).sends_data(200, "Pong", None),
            );
        }

        fn default_base_route(&self) -> Option<&str> {
            Some("api/v1")
        }
    }

    fn mount(config: &ConfigParams) -> RouteRegistrar {
        let endpoint = Arc::new(HttpEndpoint::default());
        let service = RestService::with_endpoint(endpoint, config, Arc::new(Ping));
        let mut routes = RouteRegistrar::new();
        service.registration.register(&mut routes);
        routes
    }

    #[test]
    fn routes_are_prefixed() {
        let routes = mount(&ConfigParams::new());
        let docs = routes.route_docs();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].route, "/api/v1/ping");

        let routes = mount(&ConfigParams::from_tuples([("base_route", "/other/")]));
        assert_eq!(routes.route_docs()[0].route, "/other/ping");
    }

    #[test]
    fn swagger_route_is_opt_in() {
        let routes = mount(&ConfigParams::from_tuples([("swagger.enable", "true")]));
        assert!(format!("{routes:?}").contains("GET /api/v1/swagger"));

        let routes = mount(&ConfigParams::new());
        assert!(!format!("{routes:?}").contains("swagger"));
    }

    #[test]
    fn swagger_document_sources() {
        let routes = mount(&ConfigParams::new());
        let generated = SwaggerConfig::from_config(&ConfigParams::new()).document(&routes);
        let value: serde_json::Value = serde_json::from_str(&generated).unwrap();
        assert!(value["paths"]["/api/v1/ping"]["get"].is_object());

        let config = ConfigParams::from_tuples([("openapi_content", "openapi: 3.0.2")]);
        assert_eq!(SwaggerConfig::from_config(&config).document(&routes), "openapi: 3.0.2");
    }
}
