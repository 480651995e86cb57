//! One dummy client interface, three transports.

use crate::{Dummy, DummyController, services::DUMMY_BASE_ROUTE};
use async_trait::async_trait;
use commandable_client::{
    CommandableHttpClient, DirectClient, Method, RestClient, add_filter_params, add_paging_params,
};
use commandable_core::{ApplicationError, ConfigParams, DataPage, FilterParams, PagingParams};
use serde_json::{Value, json};
use std::sync::Arc;

#[async_trait]
pub trait DummyClient: Send + Sync {
    async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError>;

    async fn close(&self, correlation_id: Option<&str>);

    async fn get_dummies(
        &self,
        correlation_id: Option<&str>,
        filter: Option<FilterParams>,
        paging: Option<PagingParams>,
    ) -> Result<DataPage<Dummy>, ApplicationError>;

    async fn get_dummy_by_id(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError>;

    async fn create_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError>;

    async fn update_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError>;

    async fn delete_dummy(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError>;

    async fn raise_exception(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError>;

    async fn ping(&self, correlation_id: Option<&str>) -> Result<bool, ApplicationError>;

    async fn check_correlation_id(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<String, ApplicationError>;
}

fn empty_page() -> DataPage<Dummy> {
    DataPage::new(Vec::new(), None)
}

/// Talks to [`DummyCommandableHttpService`](crate::DummyCommandableHttpService).
#[derive(Debug)]
pub struct DummyCommandableHttpClient {
    client: CommandableHttpClient,
}

impl DummyCommandableHttpClient {
    pub fn new(config: &ConfigParams) -> Self {
        Self {
            client: CommandableHttpClient::new(config, DUMMY_BASE_ROUTE),
        }
    }

    pub fn inner(&self) -> &CommandableHttpClient {
        &self.client
    }
}

#[async_trait]
impl DummyClient for DummyCommandableHttpClient {
    async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        self.client.open(correlation_id).await
    }

    async fn close(&self, correlation_id: Option<&str>) {
        self.client.close(correlation_id).await
    }

    async fn get_dummies(
        &self,
        correlation_id: Option<&str>,
        filter: Option<FilterParams>,
        paging: Option<PagingParams>,
    ) -> Result<DataPage<Dummy>, ApplicationError> {
        let params = json!({ "filter": filter, "paging": paging });
        let page = self.client.call_command("get_dummies", correlation_id, params).await?;
        Ok(page.unwrap_or_else(empty_page))
    }

    async fn get_dummy_by_id(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        self.client
            .call_command("get_dummy_by_id", correlation_id, json!({ "dummy_id": id }))
            .await
    }

    async fn create_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError> {
        self.client
            .call_command("create_dummy", correlation_id, json!({ "dummy": dummy }))
            .await
    }

    async fn update_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError> {
        self.client
            .call_command("update_dummy", correlation_id, json!({ "dummy": dummy }))
            .await
    }

    async fn delete_dummy(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        self.client
            .call_command("delete_dummy", correlation_id, json!({ "dummy_id": id }))
            .await
    }

    async fn raise_exception(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        self.client
            .call_command::<Value>("raise_exception", correlation_id, json!({}))
            .await
            .map(|_| ())
    }

    async fn ping(&self, correlation_id: Option<&str>) -> Result<bool, ApplicationError> {
        let pong = self.client.call_command("ping_dummy", correlation_id, json!({})).await?;
        Ok(pong.unwrap_or(false))
    }

    async fn check_correlation_id(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<String, ApplicationError> {
        let echoed = self
            .client
            .call_command("check_correlation_id", correlation_id, json!({}))
            .await?;
        Ok(echoed.unwrap_or_default())
    }
}

/// Talks to [`DummyRestService`](crate::DummyRestService).
#[derive(Debug)]
pub struct DummyRestClient {
    client: RestClient,
}

impl DummyRestClient {
    pub fn new(config: &ConfigParams) -> Self {
        Self {
            client: RestClient::from_config(config),
        }
    }

    pub fn inner(&self) -> &RestClient {
        &self.client
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        method: Method,
        route: &str,
        correlation_id: Option<&str>,
        body: Option<Value>,
    ) -> Result<Option<T>, ApplicationError> {
        let call = self.client.call(method, route, correlation_id, body);
        self.client
            .instrumented(correlation_id, &format!("dummy.{name}"), call)
            .await
    }
}

fn dummy_body(correlation_id: Option<&str>, dummy: &Dummy) -> Result<Value, ApplicationError> {
    serde_json::to_value(dummy).map_err(|e| {
        ApplicationError::bad_request(
            correlation_id,
            "INVALID_DUMMY",
            "Failed to serialize dummy",
        )
        .with_cause(e)
    })
}

#[async_trait]
impl DummyClient for DummyRestClient {
    async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        self.client.open(correlation_id).await
    }

    async fn close(&self, correlation_id: Option<&str>) {
        self.client.close(correlation_id).await
    }

    async fn get_dummies(
        &self,
        correlation_id: Option<&str>,
        filter: Option<FilterParams>,
        paging: Option<PagingParams>,
    ) -> Result<DataPage<Dummy>, ApplicationError> {
        let route = add_filter_params("/dummies", filter.as_ref());
        let route = add_paging_params(&route, paging.as_ref());
        let page = self
            .call("get_dummies", Method::GET, &route, correlation_id, None)
            .await?;
        Ok(page.unwrap_or_else(empty_page))
    }

    async fn get_dummy_by_id(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        self.call("get_dummy_by_id", Method::GET, &format!("/dummies/{id}"), correlation_id, None)
            .await
    }

    async fn create_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let body = dummy_body(correlation_id, &dummy)?;
        self.call("create_dummy", Method::POST, "/dummies", correlation_id, Some(body))
            .await
    }

    async fn update_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let body = dummy_body(correlation_id, &dummy)?;
        self.call("update_dummy", Method::PUT, "/dummies", correlation_id, Some(body))
            .await
    }

    async fn delete_dummy(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        self.call("delete_dummy", Method::DELETE, &format!("/dummies/{id}"), correlation_id, None)
            .await
    }

    async fn raise_exception(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        let route = "/dummies/raise_exception";
        self.call::<Value>("raise_exception", Method::POST, route, correlation_id, None)
            .await
            .map(|_| ())
    }

    async fn ping(&self, correlation_id: Option<&str>) -> Result<bool, ApplicationError> {
        let pong = self.call("ping", Method::GET, "/ping", correlation_id, None).await?;
        Ok(pong.unwrap_or(false))
    }

    async fn check_correlation_id(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<String, ApplicationError> {
        let echoed = self
            .call(
                "check_correlation_id",
                Method::GET,
                "/dummies/check/correlation_id",
                correlation_id,
                None,
            )
            .await?;
        Ok(echoed.unwrap_or_default())
    }
}

/// Calls the controller in-process.
#[derive(Debug)]
pub struct DummyDirectClient {
    client: DirectClient<DummyController>,
}

impl DummyDirectClient {
    pub fn new(controller: Option<Arc<DummyController>>) -> Self {
        Self {
            client: match controller {
                Some(controller) => DirectClient::with_controller(controller),
                None => DirectClient::new(),
            },
        }
    }

    pub fn inner(&self) -> &DirectClient<DummyController> {
        &self.client
    }
}

#[async_trait]
impl DummyClient for DummyDirectClient {
    async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        self.client.open(correlation_id).await
    }

    async fn close(&self, correlation_id: Option<&str>) {
        self.client.close(correlation_id).await
    }

    async fn get_dummies(
        &self,
        correlation_id: Option<&str>,
        filter: Option<FilterParams>,
        paging: Option<PagingParams>,
    ) -> Result<DataPage<Dummy>, ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        let filter = filter.unwrap_or_default();
        let paging = paging.unwrap_or_default();
        let call = controller.get_page_by_filter(correlation_id, &filter, &paging);
        self.client.instrumented(correlation_id, "dummy.get_dummies", call).await
    }

    async fn get_dummy_by_id(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        let call = controller.get_one_by_id(correlation_id, id);
        self.client.instrumented(correlation_id, "dummy.get_dummy_by_id", call).await
    }

    async fn create_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        let call = controller.create(correlation_id, dummy);
        self.client
            .instrumented(correlation_id, "dummy.create_dummy", call)
            .await
            .map(Some)
    }

    async fn update_dummy(
        &self,
        correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        let call = controller.update(correlation_id, dummy);
        self.client.instrumented(correlation_id, "dummy.update_dummy", call).await
    }

    async fn delete_dummy(
        &self,
        correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        let call = controller.delete_by_id(correlation_id, id);
        self.client.instrumented(correlation_id, "dummy.delete_dummy", call).await
    }

    async fn raise_exception(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        let call = controller.raise_exception(correlation_id);
        self.client.instrumented(correlation_id, "dummy.raise_exception", call).await
    }

    async fn ping(&self, correlation_id: Option<&str>) -> Result<bool, ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        self.client
            .instrumented(correlation_id, "dummy.ping", controller.ping(correlation_id))
            .await
    }

    async fn check_correlation_id(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<String, ApplicationError> {
        let controller = self.client.controller(correlation_id)?;
        let call = controller.check_correlation_id(correlation_id);
        self.client
            .instrumented(correlation_id, "dummy.check_correlation_id", call)
            .await
    }
}
