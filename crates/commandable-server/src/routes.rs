//! Route registration and the matching table behind a live endpoint.
//!
//! Path templates use `{name}` segments. Matching is positional: a request
//! path matches a template with the same number of segments whose literal
//! segments are equal. When several templates match, the one with the most
//! literal segments wins; ties go to the earliest registration.

use crate::handler::{HandlerFuture, Middleware, Next, RouteHandler};
use crate::{HttpRequest, RouteMetadata};
use axum::http::Method;
use percent_encoding::percent_decode_str;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Something that contributes routes to an endpoint.
///
/// `register` may run more than once: at every open of the endpoint, and
/// immediately when added to an endpoint that is already open.
pub trait Registrable: Send + Sync {
    fn register(&self, routes: &mut RouteRegistrar);
}

/// Documented route, as projected into an OpenAPI document.
#[derive(Debug, Clone)]
pub struct RouteDoc {
    pub method: Method,
    pub route: String,
    pub metadata: RouteMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Clone)]
pub(crate) struct RouteEntry {
    method: Method,
    route: Arc<str>,
    segments: Vec<Segment>,
    authorize: Option<Middleware>,
    handler: RouteHandler,
    metadata: Option<RouteMetadata>,
}

impl RouteEntry {
    pub(crate) fn route(&self) -> &Arc<str> {
        &self.route
    }

    /// Build the pipeline interceptor -> authorize -> handler and start it.
    pub(crate) fn invoke(
        &self,
        request: HttpRequest,
        interceptor: Option<&Interceptor>,
    ) -> HandlerFuture {
        let handler = self.handler.clone();
        let mut next = Next::new(move |req| handler(req));
        if let Some(authorize) = self.authorize.clone() {
            let inner = next;
            next = Next::new(move |req| authorize(req, inner));
        }
        if let Some(interceptor) = interceptor {
            let action = interceptor.action.clone();
            let inner = next;
            next = Next::new(move |req| action(req, inner));
        }
        next.run(request)
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    fn capture(&self, parts: &[&str]) -> Option<BTreeMap<String, String>> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit.as_str() == *part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    let value = percent_decode_str(part).decode_utf8_lossy().into_owned();
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }
}

#[derive(Clone)]
pub(crate) struct Interceptor {
    prefix: String,
    action: Middleware,
}

/// Collects the routes and interceptors of one registration.
#[derive(Clone, Default)]
pub struct RouteRegistrar {
    routes: Vec<RouteEntry>,
    interceptors: Vec<Interceptor>,
}

impl std::fmt::Debug for RouteRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: Vec<_> = self
            .routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.route))
            .collect();
        let interceptors: Vec<_> = self.interceptors.iter().map(|i| i.prefix.as_str()).collect();
        f.debug_struct("RouteRegistrar")
            .field("routes", &routes)
            .field("interceptors", &interceptors)
            .finish()
    }
}

impl RouteRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_route(&mut self, method: Method, path: &str, handler: RouteHandler) {
        self.push(method, path, None, handler, None);
    }

    /// Route whose handler only runs if `authorize` calls its continuation.
    pub fn register_route_with_auth(
        &mut self,
        method: Method,
        path: &str,
        authorize: Middleware,
        handler: RouteHandler,
    ) {
        self.push(method, path, Some(authorize), handler, None);
    }

    /// Route with documentation metadata and an optional authorization hook.
    pub fn register_route_with_metadata(
        &mut self,
        method: Method,
        path: &str,
        authorize: Option<Middleware>,
        handler: RouteHandler,
        metadata: RouteMetadata,
    ) {
        self.push(method, path, authorize, handler, Some(metadata));
    }

    /// Interceptor for every request whose path starts with `prefix`.
    pub fn register_interceptor(&mut self, prefix: &str, action: Middleware) {
        self.interceptors.push(Interceptor {
            prefix: normalize_route(prefix),
            action,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.interceptors.is_empty()
    }

    /// Routes that carry metadata.
    pub fn route_docs(&self) -> Vec<RouteDoc> {
        route_docs(&self.routes)
    }

    fn push(
        &mut self,
        method: Method,
        path: &str,
        authorize: Option<Middleware>,
        handler: RouteHandler,
        metadata: Option<RouteMetadata>,
    ) {
        let route = normalize_route(path);
        let segments = split(&route)
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        self.routes.push(RouteEntry {
            method,
            route: Arc::from(route),
            segments,
            authorize,
            handler,
            metadata,
        });
    }
}

/// Immutable snapshot served by a live endpoint.
#[derive(Default)]
pub(crate) struct RouteTable {
    routes: Vec<RouteEntry>,
    interceptors: Vec<Interceptor>,
}

pub(crate) enum RouteMatch<'a> {
    Found(&'a RouteEntry, BTreeMap<String, String>),
    MethodNotAllowed,
    NotFound,
}

impl RouteTable {
    /// Merge registrars in order. A repeated method and template keeps the first.
    pub(crate) fn build<'a>(sets: impl IntoIterator<Item = &'a RouteRegistrar>) -> Self {
        let mut table = Self::default();
        let mut seen = HashSet::new();
        for set in sets {
            for route in &set.routes {
                if seen.insert((route.method.clone(), route.route.clone())) {
                    table.routes.push(route.clone());
                } else {
                    warn!(
                        "Route {} {} is already registered; ignoring duplicate",
                        route.method, route.route
                    );
                }
            }
            table.interceptors.extend(set.interceptors.iter().cloned());
        }
        table
    }

    pub(crate) fn find(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let parts: Vec<&str> = split(path).collect();
        let mut best: Option<(&RouteEntry, BTreeMap<String, String>)> = None;
        let mut path_known = false;
        for route in &self.routes {
            let Some(params) = route.capture(&parts) else {
                continue;
            };
            path_known = true;
            if route.method != *method {
                continue;
            }
            let better = best
                .as_ref()
                .is_none_or(|(b, _)| route.literal_count() > b.literal_count());
            if better {
                best = Some((route, params));
            }
        }
        match best {
            Some((route, params)) => RouteMatch::Found(route, params),
            None if path_known => RouteMatch::MethodNotAllowed,
            None => RouteMatch::NotFound,
        }
    }

    /// First interceptor, in registration order, whose prefix starts the path.
    pub(crate) fn interceptor_for(&self, path: &str) -> Option<&Interceptor> {
        let path = normalize_route(path);
        self.interceptors
            .iter()
            .find(|i| i.prefix == "/" || path.starts_with(&i.prefix))
    }

    pub(crate) fn route_docs(&self) -> Vec<RouteDoc> {
        route_docs(&self.routes)
    }
}

fn route_docs(routes: &[RouteEntry]) -> Vec<RouteDoc> {
    routes
        .iter()
        .filter_map(|r| {
            r.metadata.as_ref().map(|m| RouteDoc {
                method: r.method.clone(),
                route: r.route.to_string(),
                metadata: m.clone(),
            })
        })
        .collect()
}

/// Collapse slashes and force a single leading one: `api//v1/` -> `/api/v1`.
pub fn normalize_route(path: &str) -> String {
    let joined = split(path).collect::<Vec<_>>().join("/");
    format!("/{joined}")
}

/// `base` + `path` with exactly one slash between segments.
pub fn join_route(base: &str, path: &str) -> String {
    normalize_route(&format!("{base}/{path}"))
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reply, handler::handler};
    use axum::body::Bytes;
    use axum::http::HeaderMap;
    use serde_json::json;

    fn reply_with(tag: &'static str) -> RouteHandler {
        handler(move |_req| async move { Ok(Reply::result(json!(tag))) })
    }

    fn table() -> RouteTable {
        let mut set = RouteRegistrar::new();
        set.register_route(Method::GET, "/dummies/{id}", reply_with("by_id"));
        set.register_route(Method::GET, "dummies/check/correlation_id", reply_with("check"));
        set.register_route(Method::GET, "/dummies/{id}/{part}", reply_with("part"));
        set.register_route(Method::POST, "/dummies", reply_with("create"));
        set.register_route(Method::POST, "/dummies/", reply_with("duplicate"));
        RouteTable::build([&set])
    }

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize_route(""), "/");
        assert_eq!(normalize_route("dummies"), "/dummies");
        assert_eq!(normalize_route("//api/v1//dummy/"), "/api/v1/dummy");
        assert_eq!(join_route("/api/v1", "/dummy"), "/api/v1/dummy");
        assert_eq!(join_route("", "heartbeat"), "/heartbeat");
    }

    #[test]
    fn extracts_path_params() {
        let table = table();
        let RouteMatch::Found(route, params) = table.find(&Method::GET, "/dummies/abc%20d") else {
            panic!("expected a match");
        };
        assert_eq!(&**route.route(), "/dummies/{id}");
        assert_eq!(params.get("id").map(String::as_str), Some("abc d"));

        let RouteMatch::Found(_, params) = table.find(&Method::GET, "/dummies/1/content") else {
            panic!("expected a match");
        };
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn literal_segments_win() {
        let table = table();
        let path = "/dummies/check/correlation_id";
        let RouteMatch::Found(route, params) = table.find(&Method::GET, path) else {
            panic!("expected a match");
        };
        assert_eq!(&**route.route(), "/dummies/check/correlation_id");
        assert!(params.is_empty());
    }

    #[test]
    fn method_and_path_misses() {
        let table = table();
        assert!(matches!(table.find(&Method::DELETE, "/dummies"), RouteMatch::MethodNotAllowed));
        assert!(matches!(table.find(&Method::GET, "/nothing/here/at/all"), RouteMatch::NotFound));
        assert_eq!(table.routes.len(), 4);
    }

    #[tokio::test]
    async fn single_interceptor_applies() {
        let mut set = RouteRegistrar::new();
        set.register_route(Method::GET, "/api/v1/ping", reply_with("pong"));
        set.register_interceptor(
            "/api",
            crate::handler::middleware(|req, next: Next| async move {
                next.run(req)
                    .await
                    .map(|reply| reply.with_status(axum::http::StatusCode::ACCEPTED))
            }),
        );
        set.register_interceptor(
            "/api/v1",
            crate::handler::middleware(|_req, _next| async move {
                Ok(Reply::result(json!("second")))
            }),
        );
        let table = RouteTable::build([&set]);

        let interceptor = table.interceptor_for("/api/v1/ping");
        assert_eq!(interceptor.map(|i| i.prefix.as_str()), Some("/api"));
        assert!(table.interceptor_for("/other").is_none());

        let RouteMatch::Found(route, params) = table.find(&Method::GET, "/api/v1/ping") else {
            panic!("expected a match");
        };
        let uri = "/api/v1/ping".parse().unwrap();
        let request = HttpRequest::new(Method::GET, uri, HeaderMap::new(), Bytes::new())
            .with_route(route.route().clone(), params);
        let reply = route.invoke(request, interceptor).await.unwrap();
        assert_eq!(reply.status(), axum::http::StatusCode::ACCEPTED);
        assert_eq!(reply.value(), Some(&json!("pong")));
    }
}
