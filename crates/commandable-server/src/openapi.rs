//! OpenAPI 3 document projected from route metadata.

use crate::{QueryParam, RouteDoc, RouteMetadata};
use commandable_core::{ConfigParams, Schema, TypeCode};
use serde_json::{Map, Value, json};

const OPENAPI_VERSION: &str = "3.0.2";

/// Builds a deterministic document from a set of documented routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenApiDocumentBuilder {
    title: String,
    description: String,
    version: String,
}

impl Default for OpenApiDocumentBuilder {
    fn default() -> Self {
        Self {
            title: "CommandableHttpService".to_string(),
            description: "Commandable microservice".to_string(),
            version: "1".to_string(),
        }
    }
}

impl OpenApiDocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the info block from `swagger.title`, `swagger.description`
    /// and `swagger.version`.
    pub fn from_config(config: &ConfigParams) -> Self {
        let defaults = Self::default();
        Self {
            title: config.get_as_string_or("swagger.title", &defaults.title),
            description: config.get_as_string_or("swagger.description", &defaults.description),
            version: config.get_as_string_or("swagger.version", &defaults.version),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn build(&self, routes: &[RouteDoc]) -> Value {
        let mut paths = Map::new();
        let mut bearer = false;
        for doc in routes {
            bearer |= doc.metadata.bearer_auth;
            let methods = paths
                .entry(doc.route.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(methods) = methods {
                methods.insert(doc.method.as_str().to_ascii_lowercase(), operation(doc));
            }
        }

        let mut document = json!({
            "openapi": OPENAPI_VERSION,
            "info": {
                "title": self.title,
                "description": self.description,
                "version": self.version,
            },
            "paths": paths,
        });
        if bearer {
            document["components"] = json!({
                "securitySchemes": {
                    "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
                }
            });
        }
        document
    }

    /// Pretty-printed JSON form of [`build`](Self::build).
    pub fn build_string(&self, routes: &[RouteDoc]) -> String {
        let document = self.build(routes);
        serde_json::to_string_pretty(&document).unwrap_or_else(|_| document.to_string())
    }
}

fn operation(doc: &RouteDoc) -> Value {
    let meta = &doc.metadata;
    let mut op = Map::new();
    if !meta.tags.is_empty() {
        op.insert("tags".into(), json!(meta.tags));
    }
    op.insert("operationId".into(), json!(operation_id(doc)));

    let parameters: Vec<Value> = path_params(&doc.route)
        .map(|name| {
            json!({
                "in": "path",
                "name": name,
                "required": true,
                "schema": { "type": "string" },
            })
        })
        .chain(meta.query_params.iter().map(query_param))
        .collect();
    if !parameters.is_empty() {
        op.insert("parameters".into(), Value::Array(parameters));
    }

    if let Some(body) = &meta.body_schema {
        op.insert(
            "requestBody".into(),
            json!({ "content": { "application/json": { "schema": schema(body) } } }),
        );
    }
    op.insert("responses".into(), responses(meta));
    if meta.bearer_auth {
        op.insert("security".into(), json!([{ "bearerAuth": [] }]));
    }
    Value::Object(op)
}

/// `post_dummy_create_dummy` for `POST /dummy/create_dummy`.
fn operation_id(doc: &RouteDoc) -> String {
    let mut id = doc.method.as_str().to_ascii_lowercase();
    for part in doc.route.split('/').filter(|p| !p.is_empty()) {
        id.push('_');
        id.extend(part.chars().filter(|c| *c != '{' && *c != '}'));
    }
    id
}

fn path_params(route: &str) -> impl Iterator<Item = &str> {
    route
        .split('/')
        .filter_map(|s| s.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
}

fn query_param(param: &QueryParam) -> Value {
    let mut schema_value = type_schema(param.type_code);
    if let (Some(default), Value::Object(map)) = (&param.default, &mut schema_value) {
        map.insert("default".into(), default.clone());
    }
    let mut value = json!({
        "in": "query",
        "name": param.name,
        "required": param.required,
        "schema": schema_value,
    });
    if let Some(description) = &param.description {
        value["description"] = json!(description);
    }
    value
}

fn responses(meta: &RouteMetadata) -> Value {
    let mut responses = Map::new();
    for response in &meta.responses {
        let mut entry = json!({ "description": response.description });
        if let Some(body) = &response.schema {
            entry["content"] = json!({ "application/json": { "schema": schema(body) } });
        }
        responses.insert(response.status.to_string(), entry);
    }
    if responses.is_empty() {
        responses.insert("200".into(), json!({ "description": "Successful response" }));
    }
    Value::Object(responses)
}

fn schema(schema: &Schema) -> Value {
    match schema {
        Schema::Type(code) => type_schema(*code),
        Schema::Array(array) => json!({
            "type": "array",
            "items": array.items().map(self::schema).unwrap_or_else(|| json!({})),
        }),
        Schema::Object(object) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for prop in object.properties() {
                let value = prop
                    .schema
                    .as_ref()
                    .map(self::schema)
                    .unwrap_or_else(|| json!({}));
                properties.insert(prop.name.clone(), value);
                if prop.required {
                    required.push(prop.name.clone());
                }
            }
            let mut value = json!({ "type": "object", "properties": properties });
            if !required.is_empty() {
                value["required"] = json!(required);
            }
            value
        }
    }
}

fn type_schema(code: TypeCode) -> Value {
    match code {
        TypeCode::Integer => json!({ "type": "integer", "format": "int32" }),
        TypeCode::Long => json!({ "type": "integer", "format": "int64" }),
        TypeCode::Float => json!({ "type": "number", "format": "float" }),
        TypeCode::Double => json!({ "type": "number", "format": "double" }),
        TypeCode::DateTime => json!({ "type": "string", "format": "date-time" }),
        TypeCode::Object | TypeCode::Map => json!({ "type": "object" }),
        TypeCode::Array => json!({ "type": "array", "items": {} }),
        TypeCode::Boolean => json!({ "type": "boolean" }),
        TypeCode::String | TypeCode::Enum | TypeCode::Duration => json!({ "type": "string" }),
        TypeCode::Unknown => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use commandable_core::{ArraySchema, ObjectSchema};

    fn docs() -> Vec<RouteDoc> {
        let dummy = ObjectSchema::new()
            .with_optional_property("id", TypeCode::String)
            .with_required_property("key", TypeCode::String)
            .with_optional_property("flag", TypeCode::Boolean);
        vec![
            RouteDoc {
                method: Method::GET,
                route: "/api/v1/dummies".to_string(),
                metadata: RouteMetadata::new()
                    .with_tags(["dummies"])
                    .receives_filter_param()
                    .receives_paging_params()
                    .sends_data_page_200(dummy.clone()),
            },
            RouteDoc {
                method: Method::DELETE,
                route: "/api/v1/dummies/{dummy_id}".to_string(),
                metadata: RouteMetadata::new().uses_bearer_authentication().sends_empty_204(),
            },
            RouteDoc {
                method: Method::POST,
                route: "/api/v1/dummies".to_string(),
                metadata: RouteMetadata::new()
                    .receives_body(ObjectSchema::new().with_required_property("dummy", dummy))
                    .sends_data_200(ArraySchema::new(TypeCode::DateTime)),
            },
        ]
    }

    #[test]
    fn groups_by_path_and_method() {
        let doc = OpenApiDocumentBuilder::new().build(&docs());
        assert_eq!(doc["openapi"], "3.0.2");
        assert_eq!(doc["info"]["title"], "CommandableHttpService");

        let list = &doc["paths"]["/api/v1/dummies"]["get"];
        assert_eq!(list["tags"], json!(["dummies"]));
        assert_eq!(list["parameters"][0]["name"], "filter");
        assert_eq!(list["parameters"][1]["schema"], json!({"type": "integer", "format": "int64"}));
        let page = &list["responses"]["200"]["content"]["application/json"]["schema"];
        assert_eq!(page["required"], json!(["data"]));
        assert_eq!(page["properties"]["data"]["items"]["required"], json!(["key"]));

        let create = &doc["paths"]["/api/v1/dummies"]["post"];
        assert_eq!(create["operationId"], "post_api_v1_dummies");
        let items = &create["responses"]["200"]["content"]["application/json"]["schema"]["items"];
        assert_eq!(*items, json!({"type": "string", "format": "date-time"}));
    }

    #[test]
    fn path_params_and_bearer() {
        let doc = OpenApiDocumentBuilder::new().build(&docs());
        let delete = &doc["paths"]["/api/v1/dummies/{dummy_id}"]["delete"];
        assert_eq!(delete["parameters"][0]["in"], "path");
        assert_eq!(delete["parameters"][0]["required"], true);
        assert_eq!(delete["security"], json!([{"bearerAuth": []}]));
        assert!(delete["responses"]["204"].is_object());
        assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
    }

    #[test]
    fn info_from_config() {
        let config =
            ConfigParams::from_tuples([("swagger.title", "Dummies"), ("swagger.version", "2")]);
        let doc = OpenApiDocumentBuilder::from_config(&config).build(&[]);
        assert_eq!(doc["info"]["title"], "Dummies");
        assert_eq!(doc["info"]["version"], "2");
        assert_eq!(doc["info"]["description"], "Commandable microservice");
        assert!(doc.get("components").is_none());
    }
}
