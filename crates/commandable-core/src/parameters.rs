//! JSON object used as the argument bag of a command.

use crate::ApplicationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters from a JSON value. `null` gives an empty bag; anything other
    /// than an object is a bad request.
    pub fn from_value(value: Value) -> Result<Self, ApplicationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(ApplicationError::bad_request(
                None,
                "INVALID_PARAMETERS",
                "Parameters must be a JSON object",
            )
            .with_details("value", other)),
        }
    }

    /// Parse a JSON body. An empty body gives an empty bag.
    pub fn from_json(body: &[u8]) -> Result<Self, ApplicationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            ApplicationError::bad_request(None, "INVALID_JSON", "Request body is not valid JSON")
                .with_cause(e)
        })?;
        Self::from_value(value)
    }

    /// Build from `(key, value)` pairs.
    pub fn from_tuples<I, K, V>(tuples: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(tuples.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// String form of a scalar value.
    pub fn get_as_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_as_string_or(&self, key: &str, default: &str) -> String {
        self.get_as_string(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_as_integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_as_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_as_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key)?.as_object()
    }

    /// Deserialize one entry into a typed value.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApplicationError> {
        self.get(key)
            .map(|v| {
                serde_json::from_value(v.clone()).map_err(|e| {
                    ApplicationError::bad_request(
                        None,
                        "INVALID_PARAMETER",
                        "Parameter has unexpected shape",
                    )
                    .with_details("parameter", key)
                    .with_cause(e)
                })
            })
            .transpose()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_is_empty_bag() {
        assert!(Parameters::from_json(b"").unwrap().is_empty());
        assert!(Parameters::from_json(b"  \n").unwrap().is_empty());
        assert!(Parameters::from_json(b"null").unwrap().is_empty());
    }

    #[test]
    fn non_object_is_bad_request() {
        let err = Parameters::from_json(b"[1,2]").unwrap_err();
        assert_eq!(err.status(), 400);
        let err = Parameters::from_json(b"{oops").unwrap_err();
        assert_eq!(err.code(), "INVALID_JSON");
    }

    #[test]
    fn typed_getters() {
        let params = Parameters::from_value(json!({
            "id": 42,
            "name": "dummy",
            "flag": "true",
            "nothing": null,
            "page": {"skip": 1}
        }))
        .unwrap();
        assert_eq!(params.get_as_string("id").as_deref(), Some("42"));
        assert_eq!(params.get_as_integer("id"), Some(42));
        assert_eq!(params.get_as_bool("flag"), Some(true));
        assert!(!params.contains_key("nothing"));
        assert!(params.get_as_object("page").is_some());
        assert_eq!(params.get_as::<String>("name").unwrap().as_deref(), Some("dummy"));
        assert!(params.get_as::<Vec<u8>>("name").is_err());
    }
}
