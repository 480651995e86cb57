//! Request as seen by route handlers.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use commandable_core::{
    ApplicationError, CORRELATION_ID, FilterParams, PagingParams, Parameters, SortParams,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Query keys that carry paging, sorting or correlation rather than filter values.
const RESERVED_QUERY_KEYS: &[&str] = &["filter", "skip", "take", "total", "sort", CORRELATION_ID];

/// Authenticated caller, set by an interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    route: Arc<str>,
    path_params: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    body: Bytes,
    user: Option<Principal>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let query = uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self {
            route: Arc::from(uri.path()),
            method,
            uri,
            headers,
            path_params: BTreeMap::new(),
            query,
            body,
            user: None,
        }
    }

    pub(crate) fn with_route(
        mut self,
        route: Arc<str>,
        path_params: BTreeMap<String, String>,
    ) -> Self {
        self.route = route;
        self.path_params = path_params;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Registered template that matched, e.g. `/api/v1/dummies/{id}`.
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &BTreeMap<String, String> {
        &self.path_params
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Correlation id from the query string, else from the header.
    pub fn correlation_id(&self) -> Option<&str> {
        self.query(CORRELATION_ID)
            .or_else(|| self.header(CORRELATION_ID))
            .filter(|cid| !cid.is_empty())
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApplicationError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ApplicationError::bad_request(
                self.correlation_id(),
                "INVALID_JSON",
                "Request body is not valid JSON",
            )
            .with_cause(e)
        })
    }

    /// Body as a JSON value; an empty body is `null`.
    pub fn body_value(&self) -> Result<Value, ApplicationError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        self.json()
    }

    /// Body object merged with query values and path parameters.
    ///
    /// Path parameters win over query values, which win over body fields.
    pub fn parameters(&self) -> Result<Parameters, ApplicationError> {
        let mut params = Parameters::from_json(&self.body)
            .map_err(|e| e.with_correlation_id(self.correlation_id()))?;
        for (k, v) in self.query.iter().chain(self.path_params.iter()) {
            params.set(k.clone(), v.clone());
        }
        Ok(params)
    }

    /// `filter` query value, or every non-reserved query value.
    pub fn filter_params(&self) -> FilterParams {
        if let Some(filter) = self.query("filter") {
            return FilterParams::from_string(filter);
        }
        self.query
            .iter()
            .filter(|(k, _)| !RESERVED_QUERY_KEYS.contains(&k.as_str()))
            .fold(FilterParams::new(), |f, (k, v)| f.with(k.clone(), v.clone()))
    }

    pub fn paging_params(&self) -> PagingParams {
        PagingParams::from_strings(self.query("skip"), self.query("take"), self.query("total"))
    }

    pub fn sort_params(&self) -> SortParams {
        self.query("sort").map(SortParams::from_string).unwrap_or_default()
    }

    pub fn user(&self) -> Option<&Principal> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Principal) {
        self.user = Some(user);
    }
}
