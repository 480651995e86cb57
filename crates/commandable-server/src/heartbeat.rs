//! `GET {route}` answering with the current UTC time.

use crate::handler::handler;
use crate::{Reply, RestController, ServiceRoutes};
use axum::http::Method;
use chrono::{SecondsFormat, Utc};
use commandable_core::ConfigParams;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRestService {
    route: String,
}

impl Default for HeartbeatRestService {
    fn default() -> Self {
        Self {
            route: "heartbeat".to_string(),
        }
    }
}

impl HeartbeatRestService {
    pub fn from_config(config: &ConfigParams) -> Self {
        Self {
            route: config.get_as_string_or("route", "heartbeat"),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

impl RestController for HeartbeatRestService {
    fn register(&self, routes: &mut ServiceRoutes<'_>) {
        routes.register_route(
            Method::GET,
            &self.route,
            handler(|_req| async {
                let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                Ok(Reply::result(json!(now)))
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_is_configurable() {
        assert_eq!(HeartbeatRestService::default().route(), "heartbeat");
        let config = ConfigParams::from_tuples([("route", "ping")]);
        let service = HeartbeatRestService::from_config(&config);
        assert_eq!(service.route(), "ping");
    }
}
