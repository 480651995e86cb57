//! Handler, middleware and continuation types.
//!
//! Authorization hooks and interceptors share one shape: they receive the
//! request and a [`Next`] continuation. Calling `next.run(request)` passes
//! control on; returning without calling it short-circuits the request.

use crate::{HttpRequest, Reply};
use commandable_core::ApplicationError;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

pub type HttpResult = Result<Reply, ApplicationError>;

pub type HandlerFuture = BoxFuture<'static, HttpResult>;

/// Final handler of a route.
pub type RouteHandler = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Authorization hook or interceptor.
pub type Middleware = Arc<dyn Fn(HttpRequest, Next) -> HandlerFuture + Send + Sync>;

/// The rest of the pipeline after a middleware.
pub struct Next {
    inner: Box<dyn FnOnce(HttpRequest) -> HandlerFuture + Send>,
}

impl Next {
    pub(crate) fn new(inner: impl FnOnce(HttpRequest) -> HandlerFuture + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Continue with the wrapped handler.
    pub fn run(self, request: HttpRequest) -> HandlerFuture {
        (self.inner)(request)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Next")
    }
}

/// Box an async function as a [`RouteHandler`].
pub fn handler<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResult> + Send + 'static,
{
    Arc::new(move |request| f(request).boxed())
}

/// Box an async function as a [`Middleware`].
pub fn middleware<F, Fut>(f: F) -> Middleware
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResult> + Send + 'static,
{
    Arc::new(move |request, next| f(request, next).boxed())
}
