//! Categorized application errors and their wire form.
//!
//! An [`ApplicationError`] is what every fallible operation in the workspace
//! returns. When it crosses the network it travels as an [`ErrorDescription`],
//! and the receiving side turns the description back into the same error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Error category. Each category carries a default HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCategory {
    Unknown,
    Internal,
    /// Bad or missing configuration. Wire name `Misconfiguration`.
    Configuration,
    /// Transport or connectivity failure. Wire name `NoResponse`.
    Connection,
    /// A call reached its target but failed there. Wire name `FailedInvocation`.
    InvocationFailed,
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    InvalidState,
    Unsupported,
}

impl ErrorCategory {
    /// Name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Internal => "Internal",
            Self::Configuration => "Misconfiguration",
            Self::Connection => "NoResponse",
            Self::InvocationFailed => "FailedInvocation",
            Self::BadRequest => "BadRequest",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::InvalidState => "InvalidState",
            Self::Unsupported => "Unsupported",
        }
    }

    /// Default HTTP status for errors of this category.
    pub fn default_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::Conflict => 409,
            _ => 500,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ErrorCategory {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Internal" => Self::Internal,
            "Misconfiguration" | "Configuration" => Self::Configuration,
            "NoResponse" | "Connection" => Self::Connection,
            "FailedInvocation" | "InvocationFailed" => Self::InvocationFailed,
            "BadRequest" => Self::BadRequest,
            "Unauthorized" => Self::Unauthorized,
            "NotFound" => Self::NotFound,
            "Conflict" => Self::Conflict,
            "InvalidState" => Self::InvalidState,
            "Unsupported" => Self::Unsupported,
            _ => Self::Unknown,
        }
    }
}

impl From<ErrorCategory> for String {
    fn from(category: ErrorCategory) -> Self {
        category.as_str().to_string()
    }
}

/// A categorized error with a machine-readable code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApplicationError {
    category: ErrorCategory,
    status: u16,
    code: String,
    message: String,
    correlation_id: Option<String>,
    cause: Option<String>,
    stack_trace: Option<String>,
    details: Map<String, Value>,
}

impl ApplicationError {
    pub fn new(
        category: ErrorCategory,
        correlation_id: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            status: category.default_status(),
            code: code.into(),
            message: message.into(),
            correlation_id: correlation_id.map(str::to_string),
            cause: None,
            stack_trace: None,
            details: Map::new(),
        }
    }

    pub fn unknown(cid: Option<&str>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unknown, cid, code, message)
    }

    pub fn internal(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Internal, cid, code, message)
    }

    pub fn config(cid: Option<&str>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Configuration, cid, code, message)
    }

    pub fn connection(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Connection, cid, code, message)
    }

    pub fn invocation(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::InvocationFailed, cid, code, message)
    }

    pub fn bad_request(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::BadRequest, cid, code, message)
    }

    pub fn unauthorized(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Unauthorized, cid, code, message)
    }

    pub fn not_found(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::NotFound, cid, code, message)
    }

    pub fn conflict(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Conflict, cid, code, message)
    }

    pub fn invalid_state(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::InvalidState, cid, code, message)
    }

    pub fn unsupported(
        cid: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Unsupported, cid, code, message)
    }

    /// Override the default status of the category.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Attach a detail value.
    pub fn with_details(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Record the underlying cause as text.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<&str>) -> Self {
        self.correlation_id = correlation_id.map(str::to_string);
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Wrap any foreign error as `Unknown`, keeping its text as the cause.
    pub fn wrap(cid: Option<&str>, err: &(dyn std::error::Error + 'static)) -> Self {
        Self::unknown(cid, "UNKNOWN", err.to_string()).with_cause(err)
    }
}

/// Serializable description of an [`ApplicationError`].
///
/// Every field is optional on input so that partial or foreign error
/// bodies still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescription {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default = "unknown_category")]
    pub category: ErrorCategory,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default = "unknown_code")]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

fn unknown_category() -> ErrorCategory {
    ErrorCategory::Unknown
}

fn default_status() -> u16 {
    500
}

fn unknown_code() -> String {
    "UNKNOWN".to_string()
}

impl From<&ApplicationError> for ErrorDescription {
    fn from(err: &ApplicationError) -> Self {
        Self {
            type_name: None,
            category: err.category,
            status: err.status,
            code: err.code.clone(),
            message: err.message.clone(),
            details: (!err.details.is_empty()).then(|| err.details.clone()),
            correlation_id: err.correlation_id.clone(),
            cause: err.cause.clone(),
            stack_trace: err.stack_trace.clone(),
        }
    }
}

impl From<ErrorDescription> for ApplicationError {
    fn from(desc: ErrorDescription) -> Self {
        Self {
            category: desc.category,
            status: desc.status,
            code: desc.code,
            message: desc.message,
            correlation_id: desc.correlation_id,
            cause: desc.cause,
            stack_trace: desc.stack_trace,
            details: desc.details.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_statuses() {
        assert_eq!(ErrorCategory::BadRequest.default_status(), 400);
        assert_eq!(ErrorCategory::Unauthorized.default_status(), 401);
        assert_eq!(ErrorCategory::NotFound.default_status(), 404);
        assert_eq!(ErrorCategory::Conflict.default_status(), 409);
        assert_eq!(ErrorCategory::Connection.default_status(), 500);
    }

    #[test]
    fn description_roundtrip_keeps_fields() {
        let err = ApplicationError::not_found(Some("123"), "TEST_ERROR", "Dummy error")
            .with_details("id", "abc")
            .with_cause("missing row");

        let json = serde_json::to_string(&ErrorDescription::from(&err)).unwrap();
        let desc: ErrorDescription = serde_json::from_str(&json).unwrap();
        let back = ApplicationError::from(desc);

        assert_eq!(back, err);
        assert_eq!(back.category(), ErrorCategory::NotFound);
        assert_eq!(back.correlation_id(), Some("123"));
    }

    #[test]
    fn wire_names() {
        let err = ApplicationError::config(None, "NO_HOST", "Connection host is not set");
        let value = serde_json::to_value(ErrorDescription::from(&err)).unwrap();
        assert_eq!(value["category"], "Misconfiguration");
        assert_eq!(value["status"], 500);
        assert!(value.get("details").is_none());
    }

    #[test]
    fn unknown_category_degrades() {
        let desc: ErrorDescription =
            serde_json::from_str(r#"{"category":"Exotic","message":"boom"}"#).unwrap();
        assert_eq!(desc.category, ErrorCategory::Unknown);
        assert_eq!(desc.status, 500);
        assert_eq!(desc.code, "UNKNOWN");
    }
}
