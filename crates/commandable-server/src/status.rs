//! `GET {route}` describing the running process.

use crate::handler::handler;
use crate::{Reply, RestController, ServiceRoutes};
use axum::http::Method;
use chrono::{DateTime, SecondsFormat, Utc};
use commandable_core::ConfigParams;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identity of the running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextInfo {
    pub context_id: String,
    pub name: String,
    pub description: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl ContextInfo {
    /// `info.context_id`, `info.name`, `info.description` and `properties.*`.
    pub fn from_config(config: &ConfigParams) -> Self {
        Self {
            context_id: config
                .get_as_nullable_string("info.context_id")
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
            name: config.get_as_string_or("info.name", "unknown"),
            description: config.get_as_nullable_string("info.description"),
            properties: config
                .section("properties")
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    id: &'a str,
    name: &'a str,
    description: Option<&'a str>,
    start_time: String,
    current_time: String,
    uptime_ms: i64,
    properties: &'a BTreeMap<String, String>,
    components: &'a [String],
}

#[derive(Debug)]
struct Status {
    info: ContextInfo,
    start_time: DateTime<Utc>,
    components: Vec<String>,
}

impl Status {
    fn report(&self, now: DateTime<Utc>) -> StatusBody<'_> {
        StatusBody {
            id: &self.info.context_id,
            name: &self.info.name,
            description: self.info.description.as_deref(),
            start_time: self.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            current_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            uptime_ms: (now - self.start_time).num_milliseconds(),
            properties: &self.info.properties,
            components: &self.components,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusRestService {
    route: String,
    status: Arc<Status>,
}

impl StatusRestService {
    /// `route` (default `status`), context info and the `components` list.
    pub fn from_config(config: &ConfigParams) -> Self {
        Self {
            route: config.get_as_string_or("route", "status"),
            status: Arc::new(Status {
                info: ContextInfo::from_config(config),
                start_time: Utc::now(),
                components: config
                    .section("components")
                    .iter()
                    .map(|(_, v)| v.to_string())
                    .collect(),
            }),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn info(&self) -> &ContextInfo {
        &self.status.info
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.status.start_time
    }
}

impl RestController for StatusRestService {
    fn register(&self, routes: &mut ServiceRoutes<'_>) {
        let status = self.status.clone();
        routes.register_route(
            Method::GET,
            &self.route,
            handler(move |_req| {
                let reply = Reply::json(&status.report(Utc::now()));
                async move { reply }
            }),
        );
    }
}
