//! Basic authorization hooks for
//! [`register_route_with_auth`](crate::RouteRegistrar::register_route_with_auth).

use crate::handler::{HttpResult, Middleware, Next, middleware};
use crate::HttpRequest;
use commandable_core::ApplicationError;

pub struct BasicAuthorizer;

impl BasicAuthorizer {
    /// Let every request through.
    pub fn anybody() -> Middleware {
        middleware(allow)
    }

    /// Require a signed-in user, set earlier by an interceptor.
    pub fn signed() -> Middleware {
        middleware(require_user)
    }
}

async fn allow(request: HttpRequest, next: Next) -> HttpResult {
    next.run(request).await
}

async fn require_user(request: HttpRequest, next: Next) -> HttpResult {
    if request.user().is_none() {
        return Err(ApplicationError::unauthorized(
            request.correlation_id(),
            "NOT_SIGNED",
            "User must be signed in to perform this operation",
        ));
    }
    next.run(request).await
}
