//! The dummy entity and its schema.

use commandable_core::{ObjectSchema, TypeCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dummy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub flag: bool,
}

impl Dummy {
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            content: content.into(),
            flag: false,
        }
    }
}

pub fn dummy_schema() -> ObjectSchema {
    ObjectSchema::new()
        .with_optional_property("id", TypeCode::String)
        .with_required_property("key", TypeCode::String)
        .with_optional_property("content", TypeCode::String)
        .with_optional_property("flag", TypeCode::Boolean)
}
