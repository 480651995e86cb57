//! Named route handlers, looked up by operation name.

use crate::handler::{HandlerFuture, RouteHandler};
use crate::HttpRequest;
use commandable_core::ApplicationError;
use futures_util::FutureExt;
use std::collections::HashMap;

/// A controller's operations, for wiring routes by name.
#[derive(Clone, Default)]
pub struct RestOperations {
    operations: HashMap<String, RouteHandler>,
}

impl std::fmt::Debug for RestOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.operations.keys().collect();
        names.sort();
        f.debug_struct("RestOperations").field("operations", &names).finish()
    }
}

impl RestOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, name: impl Into<String>, handler: RouteHandler) -> Self {
        self.operations.insert(name.into(), handler);
        self
    }

    pub fn operation(&self, name: &str) -> Option<RouteHandler> {
        self.operations.get(name).cloned()
    }

    /// Run the named operation.
    pub fn invoke(&self, name: &str, request: HttpRequest) -> HandlerFuture {
        match self.operations.get(name) {
            Some(handler) => handler(request),
            None => {
                let err = ApplicationError::not_found(
                    request.correlation_id(),
                    "OPERATION_NOT_FOUND",
                    format!("Operation {name} is not defined"),
                )
                .with_details("operation", name);
                async move { Err(err) }.boxed()
            }
        }
    }
}
