//! Core types for commandable HTTP services.
//!
//! This crate holds everything the server and client sides share: the
//! configuration map, connection resolution, the categorized error model and
//! its wire description, parameter bags and schemas, the command registry,
//! data-query helpers and instance-scoped counters. It does no networking.

mod commands;
mod config;
mod connection;
mod counters;
mod data;
mod discovery;
mod errors;
mod parameters;
mod resolver;
mod schema;

pub use commands::{Command, CommandResult, CommandSet, Commandable};
pub use config::ConfigParams;
pub use connection::ConnectionParams;
pub use counters::{CallCounters, Counter, InstrumentTiming, Timing};
pub use data::{DataPage, FilterParams, PagingParams, SortField, SortParams};
pub use discovery::{Discovery, MemoryDiscovery};
pub use errors::{ApplicationError, ErrorCategory, ErrorDescription};
pub use parameters::Parameters;
pub use resolver::{HttpConnectionResolver, compose_uri, validate as validate_connection};
pub use schema::{
    ArraySchema, ObjectSchema, PropertySchema, Schema, TypeCode, ValidationResult,
    ValidationResultType,
};

/// Where a client puts the correlation id of an outgoing request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationIdPlace {
    #[default]
    Query,
    Headers,
    Both,
}

impl CorrelationIdPlace {
    /// Parse a configured value; anything unrecognized falls back to `Query`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "headers" | "header" => Self::Headers,
            "both" => Self::Both,
            _ => Self::Query,
        }
    }

    pub fn in_query(&self) -> bool {
        matches!(self, Self::Query | Self::Both)
    }

    pub fn in_headers(&self) -> bool {
        matches!(self, Self::Headers | Self::Both)
    }
}

/// Query key and header name carrying the correlation id.
pub const CORRELATION_ID: &str = "correlation_id";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_place_parse() {
        assert_eq!(CorrelationIdPlace::parse("headers"), CorrelationIdPlace::Headers);
        assert_eq!(CorrelationIdPlace::parse("BOTH"), CorrelationIdPlace::Both);
        assert_eq!(CorrelationIdPlace::parse("whatever"), CorrelationIdPlace::Query);
        assert!(CorrelationIdPlace::Both.in_query() && CorrelationIdPlace::Both.in_headers());
        assert!(!CorrelationIdPlace::Headers.in_query());
    }
}
