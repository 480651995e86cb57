//! Dummy CRUD microservice used to exercise commandable services and clients.
//!
//! One in-memory [`DummyController`] is exposed three ways: as a command set
//! behind [`DummyCommandableHttpService`], as REST routes behind
//! [`DummyRestService`], and in-process through [`DummyDirectClient`]. All
//! three clients implement [`DummyClient`] so one test fixture drives them.

mod clients;
mod commands;
mod controller;
mod dummy;
mod services;

pub use clients::{DummyClient, DummyCommandableHttpClient, DummyDirectClient, DummyRestClient};
pub use commands::DummyCommands;
pub use controller::DummyController;
pub use dummy::{Dummy, dummy_schema};
pub use services::{DUMMY_BASE_ROUTE, DummyCommandableHttpService, DummyRestService};
