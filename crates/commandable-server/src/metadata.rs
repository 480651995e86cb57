//! Documentation metadata attached to a route.

use commandable_core::{ArraySchema, ObjectSchema, Schema, TypeCode};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParam {
    pub name: String,
    pub type_code: TypeCode,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseData {
    pub status: u16,
    pub description: String,
    pub schema: Option<Schema>,
}

/// Tags, parameters and responses of one route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteMetadata {
    pub tags: Vec<String>,
    pub query_params: Vec<QueryParam>,
    pub body_schema: Option<Schema>,
    pub responses: Vec<ResponseData>,
    pub bearer_auth: bool,
}

impl RouteMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn receives_optional_query_param(
        self,
        name: impl Into<String>,
        type_code: TypeCode,
    ) -> Self {
        self.query_param(name, type_code, false)
    }

    pub fn receives_required_query_param(
        self,
        name: impl Into<String>,
        type_code: TypeCode,
    ) -> Self {
        self.query_param(name, type_code, true)
    }

    /// Fully described query parameter.
    pub fn receives_query_param(mut self, param: QueryParam) -> Self {
        self.query_params.push(param);
        self
    }

    pub fn receives_correlation_id_param(self) -> Self {
        self.query_param("correlation_id", TypeCode::String, false)
    }

    pub fn receives_filter_param(self) -> Self {
        self.query_param("filter", TypeCode::String, false)
    }

    pub fn receives_paging_params(self) -> Self {
        self.query_param("skip", TypeCode::Long, false)
            .query_param("take", TypeCode::Long, false)
            .query_param("total", TypeCode::Boolean, false)
    }

    pub fn receives_sort_param(self) -> Self {
        self.query_param("sort", TypeCode::String, false)
    }

    pub fn receives_body(mut self, schema: impl Into<Schema>) -> Self {
        self.body_schema = Some(schema.into());
        self
    }

    pub fn sends_data(
        mut self,
        status: u16,
        description: impl Into<String>,
        schema: Option<Schema>,
    ) -> Self {
        self.responses.push(ResponseData {
            status,
            description: description.into(),
            schema,
        });
        self
    }

    pub fn sends_data_200(self, schema: impl Into<Schema>) -> Self {
        self.sends_data(200, "Successful response", Some(schema.into()))
    }

    /// 200 with a `{data: [...], total}` page of `item`.
    pub fn sends_data_page_200(self, item: impl Into<Schema>) -> Self {
        let page = ObjectSchema::new()
            .with_required_property("data", ArraySchema::new(item))
            .with_optional_property("total", TypeCode::Long);
        self.sends_data_200(page)
    }

    pub fn sends_empty_204(self) -> Self {
        self.sends_data(204, "No content", None)
    }

    pub fn uses_bearer_authentication(mut self) -> Self {
        self.bearer_auth = true;
        self
    }

    fn query_param(mut self, name: impl Into<String>, type_code: TypeCode, required: bool) -> Self {
        self.query_params.push(QueryParam {
            name: name.into(),
            type_code,
            required,
            default: None,
            description: None,
        });
        self
    }
}
