//! Replies and the single place where errors become HTTP responses.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use commandable_core::{ApplicationError, ErrorDescription};
use serde::Serialize;
use serde_json::Value;

/// Successful outcome of a route handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    body: ReplyBody,
}

#[derive(Debug, Clone, PartialEq)]
enum ReplyBody {
    Empty,
    Json(Value),
    Text { content_type: String, content: String },
}

impl Reply {
    /// 200 with the value, or 204 when it is `null`.
    pub fn result(value: Value) -> Self {
        Self::with_value(StatusCode::OK, value)
    }

    /// Serialize and send as [`result`](Self::result).
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApplicationError> {
        let value = serde_json::to_value(value).map_err(|e| {
            ApplicationError::internal(
                None,
                "SERIALIZATION_FAILED",
                "Failed to serialize result",
            )
            .with_cause(e)
        })?;
        Ok(Self::result(value))
    }

    /// 201 with the created value, or 204 when it is `null`.
    pub fn created(value: Value) -> Self {
        Self::with_value(StatusCode::CREATED, value)
    }

    /// 200 with the deleted value, or 204 when it is `null`.
    pub fn deleted(value: Value) -> Self {
        Self::with_value(StatusCode::OK, value)
    }

    pub fn empty() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ReplyBody::Empty,
        }
    }

    /// Raw text with an explicit content type.
    pub fn text(content_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Text {
                content_type: content_type.into(),
                content: content.into(),
            },
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// JSON payload, if any.
    pub fn value(&self) -> Option<&Value> {
        match &self.body {
            ReplyBody::Json(v) => Some(v),
            _ => None,
        }
    }

    fn with_value(status: StatusCode, value: Value) -> Self {
        if value.is_null() {
            Self::empty()
        } else {
            Self {
                status,
                body: ReplyBody::Json(value),
            }
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            ReplyBody::Empty => self.status.into_response(),
            ReplyBody::Json(value) => (self.status, Json(value)).into_response(),
            ReplyBody::Text { content_type, content } => {
                (self.status, [(header::CONTENT_TYPE, content_type)], content).into_response()
            }
        }
    }
}

/// `ErrorDescription` body with the error's status.
pub fn error_response(err: &ApplicationError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorDescription::from(err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_results_are_no_content() {
        assert_eq!(Reply::result(Value::Null).status(), StatusCode::NO_CONTENT);
        assert_eq!(Reply::created(Value::Null).status(), StatusCode::NO_CONTENT);
        assert_eq!(Reply::created(json!({"id": "1"})).status(), StatusCode::CREATED);
        assert_eq!(Reply::result(json!(true)).value(), Some(&json!(true)));
    }

    #[test]
    fn error_status_is_kept() {
        let err = ApplicationError::not_found(None, "TEST_ERROR", "Dummy error");
        assert_eq!(error_response(&err).status(), StatusCode::NOT_FOUND);

        let odd = ApplicationError::unknown(None, "ODD", "odd").with_status(1000);
        assert_eq!(error_response(&odd).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
