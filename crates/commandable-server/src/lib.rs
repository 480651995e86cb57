//! HTTP side of commandable services.
//!
//! An [`HttpEndpoint`] owns the listening socket and the live route table.
//! Services attach to it: [`RestService`] mounts a [`RestController`] under a
//! base route, [`CommandableHttpService`] turns a command set into POST
//! routes, and the heartbeat, status and about services answer operational
//! checks.
//! Every failure leaves the endpoint as an `ErrorDescription` JSON body.

mod about;
mod auth;
mod commandable;
mod endpoint;
mod handler;
mod heartbeat;
mod metadata;
mod openapi;
mod operations;
mod request;
mod response;
mod routes;
mod service;
mod status;
mod tls;

pub use about::AboutRestService;
pub use auth::BasicAuthorizer;
pub use commandable::CommandableHttpService;
pub use endpoint::{EndpointState, HttpEndpoint};
pub use handler::{HandlerFuture, HttpResult, Middleware, Next, RouteHandler, handler, middleware};
pub use heartbeat::HeartbeatRestService;
pub use metadata::{QueryParam, ResponseData, RouteMetadata};
pub use openapi::OpenApiDocumentBuilder;
pub use operations::RestOperations;
pub use request::{HttpRequest, Principal};
pub use response::{Reply, error_response};
pub use routes::{Registrable, RouteDoc, RouteRegistrar, join_route, normalize_route};
pub use service::{RestController, RestService, ServiceRoutes};
pub use status::{ContextInfo, StatusRestService};
pub use tls::CredentialParams;

pub use axum::http::{Method, StatusCode};
