//! HTTP client with connection resolution, retries and correlation ids.

use arc_swap::ArcSwapOption;
use commandable_core::{
    ApplicationError, CORRELATION_ID, CallCounters, ConfigParams, CorrelationIdPlace, Discovery,
    ErrorDescription, FilterParams, HttpConnectionResolver, PagingParams,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};
use url::Url;

const DEFAULT_RETRIES: i64 = 3;
const MAX_RETRIES: i64 = 5;
const DEFAULT_TIMEOUT_MS: i64 = 10_000;

/// `options.*` settings of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Attempts per call, between 1 and 5.
    pub retries: u32,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub correlation_id_place: CorrelationIdPlace,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_config(&ConfigParams::new())
    }
}

impl ClientOptions {
    pub fn from_config(config: &ConfigParams) -> Self {
        let millis = |key: &str| {
            let ms = config.get_as_integer_or(key, DEFAULT_TIMEOUT_MS).max(0);
            Duration::from_millis(ms.unsigned_abs())
        };
        let retries = config
            .get_as_integer_or("options.retries", DEFAULT_RETRIES)
            .clamp(1, MAX_RETRIES);
        Self {
            retries: u32::try_from(retries).unwrap_or(1),
            connect_timeout: millis("options.connect_timeout"),
            timeout: millis("options.timeout"),
            correlation_id_place: config
                .get("options.correlation_id_place")
                .map(CorrelationIdPlace::parse)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
struct Connected {
    client: reqwest::Client,
    address: String,
}

/// Client for a REST service.
///
/// Calls go to the resolved address plus the optional base route. Only
/// transport failures are retried; any HTTP response, error or not, ends
/// the call.
#[derive(Debug)]
pub struct RestClient {
    resolver: HttpConnectionResolver,
    options: ClientOptions,
    base_route: Option<String>,
    counters: Arc<CallCounters>,
    connected: ArcSwapOption<Connected>,
}

impl RestClient {
    /// Connection, `options.*` and `base_route` from `config`.
    pub fn from_config(config: &ConfigParams) -> Self {
        let mut resolver = HttpConnectionResolver::new();
        resolver.configure(config);
        Self {
            resolver,
            options: ClientOptions::from_config(config),
            base_route: config.get_as_nullable_string("base_route"),
            counters: Arc::new(CallCounters::new()),
            connected: ArcSwapOption::empty(),
        }
    }

    /// Base route used when the configuration names none.
    pub fn with_default_base_route(mut self, base_route: impl Into<String>) -> Self {
        if self.base_route.is_none() {
            self.base_route = Some(base_route.into());
        }
        self
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.resolver.set_discovery(discovery);
        self
    }

    pub fn with_counters(mut self, counters: Arc<CallCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn base_route(&self) -> Option<&str> {
        self.base_route.as_deref()
    }

    pub fn counters(&self) -> &Arc<CallCounters> {
        &self.counters
    }

    pub fn is_open(&self) -> bool {
        self.connected.load().is_some()
    }

    /// Resolved base address while open.
    pub fn address(&self) -> Option<String> {
        self.connected.load_full().map(|c| c.address.clone())
    }

    /// Resolve the connection and build the transport. Opening twice does nothing.
    pub async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        if self.is_open() {
            return Ok(());
        }
        let conn = self.resolver.resolve(correlation_id).await?;
        let address = conn.uri().unwrap_or_default().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .connect_timeout(self.options.connect_timeout)
            .timeout(self.options.timeout)
            .build()
            .map_err(|e| {
                ApplicationError::connection(
                    correlation_id,
                    "CANNOT_CONNECT",
                    "Failed to create HTTP client",
                )
                .with_details("url", address.clone())
                .with_cause(e)
            })?;

        info!(correlation_id, "Connected via REST to {}", address);
        self.connected.store(Some(Arc::new(Connected { client, address })));
        Ok(())
    }

    pub async fn close(&self, correlation_id: Option<&str>) {
        if let Some(conn) = self.connected.swap(None) {
            debug!(correlation_id, "Disconnected from {}", conn.address);
        }
    }

    /// Send one request and decode the reply.
    ///
    /// An empty reply body is `Ok(None)`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        correlation_id: Option<&str>,
        body: Option<Value>,
    ) -> Result<Option<T>, ApplicationError> {
        let Some(conn) = self.connected.load_full() else {
            return Err(ApplicationError::invalid_state(
                correlation_id,
                "NOT_OPENED",
                "Client is not opened",
            ));
        };

        let url = self.url_for(&conn.address, route, correlation_id)?;
        let attempts = self.options.retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = conn.client.request(method.clone(), url.clone());
            let in_headers = self.options.correlation_id_place.in_headers();
            if let Some(cid) = correlation_id.filter(|_| in_headers) {
                request = request.header(CORRELATION_ID, cid);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => return read_response(correlation_id, response).await,
                Err(e) if e.is_builder() => {
                    return Err(ApplicationError::bad_request(
                        correlation_id,
                        "INVALID_REQUEST",
                        "Failed to build HTTP request",
                    )
                    .with_details("url", url.as_str())
                    .with_cause(e));
                }
                Err(e) if attempt < attempts => {
                    debug!(correlation_id, attempt, "Request to {} failed, retrying: {}", url, e);
                }
                Err(e) => {
                    let (code, message) = if e.is_timeout() {
                        ("TIMEOUT", "Request timed out")
                    } else {
                        ("CONNECTION_FAILED", "Connection to the service failed")
                    };
                    return Err(ApplicationError::connection(correlation_id, code, message)
                        .with_details("url", url.as_str())
                        .with_details("attempts", attempt)
                        .with_cause(e));
                }
            }
        }
    }

    /// Run `call` under the `<name>.call_*` counters.
    pub async fn instrumented<T, F>(
        &self,
        correlation_id: Option<&str>,
        name: &str,
        call: F,
    ) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, ApplicationError>>,
    {
        let timing = self.counters.instrument_call(correlation_id, name);
        timing.end(call.await)
    }

    fn url_for(
        &self,
        address: &str,
        route: &str,
        correlation_id: Option<&str>,
    ) -> Result<Url, ApplicationError> {
        let raw = compose_url(address, self.base_route.as_deref(), route);
        let mut url = Url::parse(&raw).map_err(|e| {
            ApplicationError::bad_request(correlation_id, "INVALID_ROUTE", "Request URL is invalid")
                .with_details("url", raw.clone())
                .with_cause(e)
        })?;
        if let Some(cid) = correlation_id.filter(|_| self.options.correlation_id_place.in_query()) {
            url.query_pairs_mut().append_pair(CORRELATION_ID, cid);
        }
        trace!(correlation_id, url = %url, "composed request url");
        Ok(url)
    }
}

async fn read_response<T: DeserializeOwned>(
    correlation_id: Option<&str>,
    response: Response,
) -> Result<Option<T>, ApplicationError> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
        ApplicationError::connection(
            correlation_id,
            "CANNOT_READ_RESPONSE",
            "Failed to read response body",
        )
        .with_cause(e)
    })?;

    if status.as_u16() >= 400 {
        return Err(error_from_body(correlation_id, status, &body));
    }

    if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&body).map(Some).map_err(|e| {
        ApplicationError::bad_request(
            correlation_id,
            "UNEXPECTED_PROTOCOL_FORMAT",
            "Unexpected protocol format",
        )
        .with_cause(e)
    })
}

/// Rebuild the error a service sent back.
///
/// A description without its own status takes the response status. A body
/// that is not a description becomes `UNKNOWN_ERROR`.
fn error_from_body(
    correlation_id: Option<&str>,
    status: StatusCode,
    body: &[u8],
) -> ApplicationError {
    let parsed = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        let has_status = value.get("status").is_some_and(Value::is_u64);
        let description = serde_json::from_value::<ErrorDescription>(value).ok()?;
        Some((description, has_status))
    });
    let err = match parsed {
        Some((description, true)) => ApplicationError::from(description),
        Some((description, false)) => {
            ApplicationError::from(description).with_status(status.as_u16())
        }
        None => ApplicationError::unknown(
            correlation_id,
            "UNKNOWN_ERROR",
            format!("Service responded with status {status}"),
        )
        .with_status(status.as_u16())
        .with_details("body", String::from_utf8_lossy(body).into_owned()),
    };
    match err.correlation_id() {
        Some(_) => err,
        None => err.with_correlation_id(correlation_id),
    }
}

/// `address` + `base_route` + `route`, one slash between each.
pub fn compose_url(address: &str, base_route: Option<&str>, route: &str) -> String {
    let mut url = address.trim_end_matches('/').to_string();
    for part in [base_route.unwrap_or_default(), route] {
        let part = part.trim_matches('/');
        if !part.is_empty() {
            url.push('/');
            url.push_str(part);
        }
    }
    url
}

/// Append `filter=<k=v;...>` unless the filter is empty.
pub fn add_filter_params(route: &str, filter: Option<&FilterParams>) -> String {
    match filter.filter(|f| !f.is_empty()) {
        Some(filter) => append_query(route, [("filter", filter.to_string())]),
        None => route.to_string(),
    }
}

/// Append whichever of `skip`, `take` and `total` are set.
pub fn add_paging_params(route: &str, paging: Option<&PagingParams>) -> String {
    let Some(paging) = paging else {
        return route.to_string();
    };
    let pairs = paging
        .skip
        .map(|s| ("skip", s.to_string()))
        .into_iter()
        .chain(paging.take.map(|t| ("take", t.to_string())))
        .chain(paging.total.then(|| ("total", "true".to_string())));
    append_query(route, pairs)
}

fn append_query<'a>(route: &str, pairs: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        query.append_pair(key, &value);
    }
    let query = query.finish();
    if query.is_empty() {
        route.to_string()
    } else if route.contains('?') {
        format!("{route}&{query}")
    } else {
        format!("{route}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commandable_core::ErrorCategory;

    #[test]
    fn options_defaults_and_clamp() {
        let options = ClientOptions::default();
        assert_eq!(options.retries, 3);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.correlation_id_place, CorrelationIdPlace::Query);

        let config = ConfigParams::from_tuples([
            ("options.retries", "10"),
            ("options.connect_timeout", "250"),
            ("options.correlation_id_place", "both"),
        ]);
        let options = ClientOptions::from_config(&config);
        assert_eq!(options.retries, 5);
        assert_eq!(options.connect_timeout, Duration::from_millis(250));
        assert_eq!(options.correlation_id_place, CorrelationIdPlace::Both);

        let config = ConfigParams::from_tuples([("options.retries", "0")]);
        let options = ClientOptions::from_config(&config);
        assert_eq!(options.retries, 1);
    }

    #[test]
    fn composes_urls() {
        assert_eq!(
            compose_url("http://localhost:3000/", Some("/api/v1/"), "/dummy"),
            "http://localhost:3000/api/v1/dummy"
        );
        assert_eq!(
            compose_url("http://localhost:3000", None, "dummies/1"),
            "http://localhost:3000/dummies/1"
        );
        assert_eq!(compose_url("http://localhost:3000", Some(""), ""), "http://localhost:3000");
    }

    #[test]
    fn query_helpers() {
        let filter = FilterParams::new().with("key", "Key 1");
        let route = add_filter_params("/dummies", Some(&filter));
        assert_eq!(route, "/dummies?filter=key%3DKey+1");

        let paging = PagingParams::new(Some(5), Some(10), true);
        let route = add_paging_params(&route, Some(&paging));
        assert_eq!(route, "/dummies?filter=key%3DKey+1&skip=5&take=10&total=true");

        assert_eq!(add_filter_params("/dummies", Some(&FilterParams::new())), "/dummies");
        assert_eq!(add_paging_params("/dummies", Some(&PagingParams::default())), "/dummies");
    }

    #[tokio::test]
    async fn correlation_id_placement_in_url() {
        let mut client = RestClient::from_config(&ConfigParams::new());
        let url = client.url_for("http://localhost:3000", "/dummies?x=1", Some("c1")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/dummies?x=1&correlation_id=c1");

        client.options.correlation_id_place = CorrelationIdPlace::Headers;
        let url = client.url_for("http://localhost:3000", "/dummies", Some("c1")).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn error_bodies_keep_the_response_status() {
        let body = br#"{"code":"GONE","message":"missing"}"#;
        let err = error_from_body(Some("c"), StatusCode::NOT_FOUND, body);
        assert_eq!((err.code(), err.status()), ("GONE", 404));
        assert_eq!(err.category(), ErrorCategory::Unknown);
        assert_eq!(err.correlation_id(), Some("c"));

        let body = br#"{"category":"Conflict","code":"TAKEN","status":409,"correlation_id":"s"}"#;
        let err = error_from_body(Some("c"), StatusCode::BAD_REQUEST, body);
        assert_eq!((err.code(), err.status()), ("TAKEN", 409));
        assert_eq!(err.correlation_id(), Some("s"));

        let err = error_from_body(None, StatusCode::BAD_GATEWAY, b"<html>");
        assert_eq!((err.code(), err.status()), ("UNKNOWN_ERROR", 502));
    }

    #[tokio::test]
    async fn calls_require_open() {
        let config = ConfigParams::from_tuples([
            ("connection.protocol", "http"),
            ("connection.host", "localhost"),
            ("connection.port", "3199"),
        ]);
        let client = RestClient::from_config(&config);
        let err = client
            .call::<Value>(Method::GET, "/dummies", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_OPENED");

        client.open(None).await.unwrap();
        client.open(None).await.unwrap();
        assert_eq!(client.address().as_deref(), Some("http://localhost:3199"));
        client.close(None).await;
        assert!(!client.is_open());
    }
}
