//! Validation schemas for command parameters and documented bodies.

use crate::ApplicationError;
use serde::Serialize;
use serde_json::Value;

/// Scalar and container type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Unknown,
    String,
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    DateTime,
    Duration,
    Object,
    Enum,
    Array,
    Map,
}

impl TypeCode {
    /// Whether a non-null JSON value has this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Unknown => true,
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Integer => value
                .as_i64()
                .is_some_and(|n| i32::try_from(n).is_ok()),
            Self::Long => value.is_i64() || value.is_u64(),
            Self::Float | Self::Double => value.is_number(),
            Self::DateTime => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            Self::Duration => value.is_number() || value.is_string(),
            Self::Object | Self::Map => value.is_object(),
            Self::Enum => value.is_string() || value.is_number(),
            Self::Array => value.is_array(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::DateTime => "datetime",
            Self::Duration => "duration",
            Self::Object => "object",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Map => "map",
        }
    }
}

/// Any schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Type(TypeCode),
    Object(ObjectSchema),
    Array(ArraySchema),
}

impl From<TypeCode> for Schema {
    fn from(code: TypeCode) -> Self {
        Self::Type(code)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Self::Object(schema)
    }
}

impl From<ArraySchema> for Schema {
    fn from(schema: ArraySchema) -> Self {
        Self::Array(schema)
    }
}

impl Schema {
    fn validate_at(&self, path: &str, value: &Value, results: &mut Vec<ValidationResult>) {
        match self {
            Self::Type(code) => {
                if !code.matches(value) {
                    results.push(ValidationResult::type_mismatch(path, code.name(), value));
                }
            }
            Self::Object(schema) => schema.validate_at(path, value, results),
            Self::Array(schema) => schema.validate_at(path, value, results),
        }
    }
}

/// One named property of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    pub schema: Option<Schema>,
    pub required: bool,
}

/// Object with declared properties.
///
/// Undeclared properties produce warnings, not errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    properties: Vec<PropertySchema>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required_property(
        mut self,
        name: impl Into<String>,
        schema: impl Into<Schema>,
    ) -> Self {
        self.properties.push(PropertySchema {
            name: name.into(),
            schema: Some(schema.into()),
            required: true,
        });
        self
    }

    pub fn with_optional_property(
        mut self,
        name: impl Into<String>,
        schema: impl Into<Schema>,
    ) -> Self {
        self.properties.push(PropertySchema {
            name: name.into(),
            schema: Some(schema.into()),
            required: false,
        });
        self
    }

    pub fn properties(&self) -> &[PropertySchema] {
        &self.properties
    }

    pub fn validate(&self, value: &Value) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        self.validate_at("", value, &mut results);
        results
    }

    /// Fail with `INVALID_DATA` when validation reports any error.
    pub fn validate_and_throw(
        &self,
        correlation_id: Option<&str>,
        value: &Value,
    ) -> Result<(), ApplicationError> {
        let results = self.validate(value);
        let errors: Vec<&ValidationResult> = results
            .iter()
            .filter(|r| r.kind == ValidationResultType::Error)
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        let message = errors
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let details = serde_json::to_value(&results).unwrap_or(Value::Null);
        let message = format!("Validation failed: {message}");
        Err(ApplicationError::bad_request(correlation_id, "INVALID_DATA", message)
            .with_details("results", details))
    }

    fn validate_at(&self, path: &str, value: &Value, results: &mut Vec<ValidationResult>) {
        let Some(object) = value.as_object() else {
            results.push(ValidationResult::type_mismatch(path, "object", value));
            return;
        };
        for property in &self.properties {
            let child = join(path, &property.name);
            match object.get(&property.name).filter(|v| !v.is_null()) {
                None if property.required => results.push(ValidationResult {
                    path: child,
                    kind: ValidationResultType::Error,
                    code: "VALUE_IS_NULL".to_string(),
                    message: format!("{} must not be null", property.name),
                }),
                None => {}
                Some(v) => {
                    if let Some(schema) = &property.schema {
                        schema.validate_at(&child, v, results);
                    }
                }
            }
        }
        for key in object.keys() {
            if !self.properties.iter().any(|p| &p.name == key) {
                results.push(ValidationResult {
                    path: join(path, key),
                    kind: ValidationResultType::Warning,
                    code: "UNEXPECTED_PROPERTY".to_string(),
                    message: format!("{key} is not expected"),
                });
            }
        }
    }
}

/// Array of items, optionally typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    items: Option<Box<Schema>>,
}

impl ArraySchema {
    pub fn new(items: impl Into<Schema>) -> Self {
        Self {
            items: Some(Box::new(items.into())),
        }
    }

    pub fn untyped() -> Self {
        Self { items: None }
    }

    pub fn items(&self) -> Option<&Schema> {
        self.items.as_deref()
    }

    fn validate_at(&self, path: &str, value: &Value, results: &mut Vec<ValidationResult>) {
        let Some(items) = value.as_array() else {
            results.push(ValidationResult::type_mismatch(path, "array", value));
            return;
        };
        if let Some(schema) = &self.items {
            for (i, item) in items.iter().enumerate() {
                if !item.is_null() {
                    schema.validate_at(&join(path, &i.to_string()), item, results);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResultType {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ValidationResultType,
    pub code: String,
    pub message: String,
}

impl ValidationResult {
    fn type_mismatch(path: &str, expected: &str, value: &Value) -> Self {
        let name = if path.is_empty() { "value" } else { path };
        Self {
            path: path.to_string(),
            kind: ValidationResultType::Error,
            code: "TYPE_MISMATCH".to_string(),
            message: format!("{name} type must be {expected} but found {value}"),
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dummy_schema() -> ObjectSchema {
        ObjectSchema::new()
            .with_optional_property("id", TypeCode::String)
            .with_required_property("key", TypeCode::String)
            .with_optional_property("content", TypeCode::String)
            .with_optional_property("flag", TypeCode::Boolean)
    }

    #[test]
    fn valid_object() {
        let results = dummy_schema().validate(&json!({"key": "k", "flag": true}));
        assert!(results.is_empty());
    }

    #[test]
    fn missing_required() {
        let results = dummy_schema().validate(&json!({"content": "c"}));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, "VALUE_IS_NULL");
        assert_eq!(results[0].path, "key");
    }

    #[test]
    fn nested_type_mismatch() {
        let schema = ObjectSchema::new()
            .with_required_property("dummy", dummy_schema())
            .with_optional_property("tags", ArraySchema::new(TypeCode::String));
        let results = schema.validate(&json!({"dummy": {"key": 5}, "tags": ["a", 1]}));
        let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["dummy.key", "tags.1"]);
    }

    #[test]
    fn unexpected_property_is_only_a_warning() {
        let value = json!({"key": "k", "correlation_id": "123"});
        let results = dummy_schema().validate(&value);
        assert_eq!(results[0].kind, ValidationResultType::Warning);
        assert!(dummy_schema().validate_and_throw(None, &value).is_ok());
    }

    #[test]
    fn throw_is_bad_request() {
        let err = dummy_schema()
            .validate_and_throw(Some("cid"), &json!({}))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA");
        assert_eq!(err.status(), 400);
        assert!(err.details().contains_key("results"));
    }

    #[test]
    fn type_codes() {
        assert!(TypeCode::Integer.matches(&json!(5)));
        assert!(!TypeCode::Integer.matches(&json!(5_000_000_000i64)));
        assert!(TypeCode::Long.matches(&json!(5_000_000_000i64)));
        assert!(TypeCode::DateTime.matches(&json!("2024-01-01T00:00:00Z")));
        assert!(!TypeCode::DateTime.matches(&json!("yesterday")));
    }
}
