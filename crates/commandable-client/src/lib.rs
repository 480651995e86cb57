//! Clients for commandable and REST services.
//!
//! [`RestClient`] resolves its connection on open, retries transport
//! failures and rebuilds `ErrorDescription` bodies into [`ApplicationError`]s.
//! [`CommandableHttpClient`] posts parameter objects to command routes and
//! [`DirectClient`] calls a controller in-process under the same counters.
//!
//! [`ApplicationError`]: commandable_core::ApplicationError

mod commandable;
mod direct;
mod rest;

pub use commandable::CommandableHttpClient;
pub use direct::DirectClient;
pub use rest::{ClientOptions, RestClient, add_filter_params, add_paging_params, compose_url};

pub use reqwest::Method;
