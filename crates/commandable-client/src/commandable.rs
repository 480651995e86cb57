//! Client side of the `POST {base_route}/{command}` mapping.

use crate::RestClient;
use commandable_core::{ApplicationError, ConfigParams};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Calls commands of a commandable HTTP service.
#[derive(Debug)]
pub struct CommandableHttpClient {
    rest: RestClient,
}

impl CommandableHttpClient {
    /// `base_route` applies unless the configuration sets its own.
    pub fn new(config: &ConfigParams, base_route: &str) -> Self {
        Self {
            rest: RestClient::from_config(config).with_default_base_route(base_route),
        }
    }

    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn is_open(&self) -> bool {
        self.rest.is_open()
    }

    pub async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        self.rest.open(correlation_id).await
    }

    pub async fn close(&self, correlation_id: Option<&str>) {
        self.rest.close(correlation_id).await
    }

    /// POST `params` to the command's route, counted as `<base_route>.<name>`.
    pub async fn call_command<T: DeserializeOwned>(
        &self,
        name: &str,
        correlation_id: Option<&str>,
        params: Value,
    ) -> Result<Option<T>, ApplicationError> {
        let counter = match self.rest.base_route().map(|b| b.trim_matches('/')) {
            Some(base) if !base.is_empty() => format!("{base}.{name}"),
            _ => name.to_string(),
        };
        let call = self.rest.call(Method::POST, name, correlation_id, Some(params));
        self.rest.instrumented(correlation_id, &counter, call).await
    }
}
