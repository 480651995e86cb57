//! `GET {route}` describing the server and the calling client.

use crate::handler::{RouteHandler, handler};
use crate::{ContextInfo, HttpRequest, Reply, RestController, ServiceRoutes};
use axum::http::Method;
use chrono::{DateTime, SecondsFormat, Utc};
use commandable_core::ConfigParams;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct AboutBody<'a> {
    server: ServerSection<'a>,
    client: ClientSection<'a>,
}

#[derive(Debug, Serialize)]
struct ServerSection<'a> {
    name: &'a str,
    description: Option<&'a str>,
    properties: &'a BTreeMap<String, String>,
    uptime: i64,
    start_time: String,
    current_time: String,
    protocol: String,
    host: Option<String>,
    url: &'a str,
    ip: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ClientSection<'a> {
    user: Option<&'a str>,
}

#[derive(Debug)]
struct About {
    info: ContextInfo,
    start_time: DateTime<Utc>,
}

impl About {
    fn describe<'a>(&'a self, request: &'a HttpRequest, now: DateTime<Utc>) -> AboutBody<'a> {
        let protocol = request
            .header("x-forwarded-proto")
            .or_else(|| request.uri().scheme_str())
            .unwrap_or("http")
            .to_string();
        let host = request
            .header("host")
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()));
        let ip = request
            .header("x-forwarded-for")
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        AboutBody {
            server: ServerSection {
                name: &self.info.name,
                description: self.info.description.as_deref(),
                properties: &self.info.properties,
                uptime: (now - self.start_time).num_milliseconds(),
                start_time: self.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
                current_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
                protocol,
                host,
                url: request.path(),
                ip,
            },
            client: ClientSection {
                user: request.user().map(|u| u.name.as_str()),
            },
        }
    }
}

/// Server identity plus what the server sees of the caller.
#[derive(Debug, Clone)]
pub struct AboutRestService {
    route: String,
    about: Arc<About>,
}

impl AboutRestService {
    /// `route` (default `about`) and the same context info as the status service.
    pub fn from_config(config: &ConfigParams) -> Self {
        Self {
            route: config.get_as_string_or("route", "about"),
            about: Arc::new(About {
                info: ContextInfo::from_config(config),
                start_time: Utc::now(),
            }),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn info(&self) -> &ContextInfo {
        &self.about.info
    }

    /// The about handler on its own, for mounting under a controller's route
    /// or adding to [`RestOperations`](crate::RestOperations).
    pub fn operation(&self) -> RouteHandler {
        let about = self.about.clone();
        handler(move |req| {
            let reply = Reply::json(&about.describe(&req, Utc::now()));
            async move { reply }
        })
    }
}

impl RestController for AboutRestService {
    fn register(&self, routes: &mut ServiceRoutes<'_>) {
        routes.register_route(Method::GET, &self.route, self.operation());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Principal;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, HeaderValue};
    use chrono::Duration;
    use serde_json::{Value, json};

    fn get(uri: &str, headers: &[(&'static str, &'static str)]) -> HttpRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        HttpRequest::new(Method::GET, uri.parse().unwrap(), map, Bytes::new())
    }

    fn service() -> AboutRestService {
        AboutRestService::from_config(&ConfigParams::from_tuples([
            ("info.name", "dummy"),
            ("info.description", "Dummy service"),
            ("properties.region", "local"),
        ]))
    }

    #[test]
    fn describes_server_and_forwarded_client() {
        let service = service();
        assert_eq!(service.route(), "about");

        let mut request = get(
            "/about",
            &[
                ("host", "api.local:8080"),
                ("x-forwarded-proto", "https"),
                ("x-forwarded-for", "10.1.1.1, 10.0.0.2"),
            ],
        );
        request.set_user(Principal::new("alice"));
        let now = service.about.start_time + Duration::milliseconds(2500);
        let body = serde_json::to_value(service.about.describe(&request, now)).unwrap();

        let server = &body["server"];
        assert_eq!(server["name"], "dummy");
        assert_eq!(server["description"], "Dummy service");
        assert_eq!(server["properties"], json!({"region": "local"}));
        assert_eq!(server["uptime"], 2500);
        assert_eq!(server["protocol"], "https");
        assert_eq!(server["host"], "api.local:8080");
        assert_eq!(server["url"], "/about");
        assert_eq!(server["ip"], "10.1.1.1");
        assert!(server["current_time"].as_str().unwrap().ends_with('Z'));
        assert_eq!(body["client"]["user"], "alice");
    }

    #[tokio::test]
    async fn anonymous_direct_caller() {
        let request = get("http://localhost:3000/about", &[]);
        let reply = service().operation()(request).await.unwrap();
        let body = reply.value().cloned().unwrap_or(Value::Null);
        assert_eq!(body["server"]["protocol"], "http");
        assert_eq!(body["server"]["host"], "localhost:3000");
        assert_eq!(body["server"]["ip"], Value::Null);
        assert_eq!(body["client"]["user"], Value::Null);
    }
}
