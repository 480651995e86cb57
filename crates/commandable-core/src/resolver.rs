//! Resolution and validation of HTTP connections.
//!
//! Checks run in a fixed order and stop at the first failure:
//! connection present, protocol is `http`/`https`, host set, port set.

use crate::{ApplicationError, ConfigParams, ConnectionParams, Discovery};
use std::sync::Arc;
use url::Url;

const DEFAULT_PROTOCOL: &str = "http";

/// Resolves configured connections into validated HTTP addresses.
#[derive(Clone, Default)]
pub struct HttpConnectionResolver {
    connections: Vec<ConnectionParams>,
    discovery: Option<Arc<dyn Discovery>>,
}

impl std::fmt::Debug for HttpConnectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnectionResolver")
            .field("connections", &self.connections)
            .field("discovery", &self.discovery.is_some())
            .finish()
    }
}

impl HttpConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `connection.*` and `connections.<name>.*` definitions.
    pub fn configure(&mut self, config: &ConfigParams) {
        self.connections = ConnectionParams::many_from_config(config);
    }

    pub fn add_connection(&mut self, connection: ConnectionParams) {
        self.connections.push(connection);
    }

    pub fn set_discovery(&mut self, discovery: Arc<dyn Discovery>) {
        self.discovery = Some(discovery);
    }

    pub fn connections(&self) -> &[ConnectionParams] {
        &self.connections
    }

    /// First definition that resolves and validates.
    ///
    /// When none do, the error of the first failing candidate is returned.
    pub async fn resolve(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<ConnectionParams, ApplicationError> {
        let mut first_error = None;
        for candidate in &self.connections {
            for conn in self.lookup(correlation_id, candidate, false).await? {
                match validate(correlation_id, conn) {
                    Ok(valid) => return Ok(valid),
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        Err(first_error.unwrap_or_else(|| no_connection(correlation_id)))
    }

    /// Every definition that resolves and validates, in order.
    pub async fn resolve_all(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<Vec<ConnectionParams>, ApplicationError> {
        if self.connections.is_empty() {
            return Err(no_connection(correlation_id));
        }
        let mut resolved = Vec::new();
        for candidate in &self.connections {
            for conn in self.lookup(correlation_id, candidate, true).await? {
                resolved.push(validate(correlation_id, conn)?);
            }
        }
        Ok(resolved)
    }

    /// Publish the first connection that carries a discovery key.
    ///
    /// A resolver without discovery, or without keyed connections, does nothing.
    pub async fn register(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        let Some(discovery) = &self.discovery else {
            return Ok(());
        };
        let Some(conn) = self.connections.iter().find(|c| c.uses_discovery()) else {
            return Ok(());
        };
        let key = conn.discovery_key().unwrap_or_default().to_string();
        let valid = validate(correlation_id, conn.clone())?;
        discovery.register(correlation_id, &key, valid).await
    }

    async fn lookup(
        &self,
        correlation_id: Option<&str>,
        candidate: &ConnectionParams,
        all: bool,
    ) -> Result<Vec<ConnectionParams>, ApplicationError> {
        let Some(key) = candidate.discovery_key() else {
            return Ok(vec![candidate.clone()]);
        };
        let discovery = self.discovery.as_ref().ok_or_else(|| {
            ApplicationError::config(
                correlation_id,
                "CANNOT_RESOLVE",
                "Discovery wasn't found to make resolution",
            )
            .with_details("discovery_key", key)
        })?;
        if all {
            discovery.resolve_all(correlation_id, key).await
        } else {
            Ok(discovery
                .resolve_one(correlation_id, key)
                .await?
                .into_iter()
                .collect())
        }
    }
}

/// Validate one connection and make `uri` and the address triple agree.
pub fn validate(
    correlation_id: Option<&str>,
    mut conn: ConnectionParams,
) -> Result<ConnectionParams, ApplicationError> {
    if let Some(uri) = conn.uri().map(str::to_string) {
        let url = Url::parse(&uri).map_err(|e| bad_uri(correlation_id, &uri, e))?;
        let protocol = url.scheme().to_string();
        check_protocol(correlation_id, &protocol)?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .ok_or_else(|| no_host(correlation_id))?;
        let port = url
            .port_or_known_default()
            .filter(|p| *p != 0)
            .ok_or_else(|| no_port(correlation_id))?;
        conn.set_address(protocol, host, port, uri);
        return Ok(conn);
    }

    let protocol = conn.protocol_or(DEFAULT_PROTOCOL).to_string();
    check_protocol(correlation_id, &protocol)?;
    let host = conn
        .host()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| no_host(correlation_id))?
        .to_string();
    let port = conn.port();
    if port == 0 {
        return Err(no_port(correlation_id));
    }
    let uri = compose_uri(&protocol, &host, port);
    conn.set_address(protocol, host, port, uri);
    Ok(conn)
}

/// `protocol://host:port`, bracketing IPv6 hosts.
pub fn compose_uri(protocol: &str, host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("{protocol}://[{host}]:{port}")
    } else {
        format!("{protocol}://{host}:{port}")
    }
}

fn check_protocol(correlation_id: Option<&str>, protocol: &str) -> Result<(), ApplicationError> {
    if protocol == "http" || protocol == "https" {
        Ok(())
    } else {
        Err(ApplicationError::config(
            correlation_id,
            "WRONG_PROTOCOL",
            "Protocol is not supported by REST connection",
        )
        .with_details("protocol", protocol))
    }
}

fn no_connection(correlation_id: Option<&str>) -> ApplicationError {
    ApplicationError::config(correlation_id, "NO_CONNECTION", "HTTP connection is not set")
}

fn no_host(correlation_id: Option<&str>) -> ApplicationError {
    ApplicationError::config(correlation_id, "NO_HOST", "Connection host is not set")
}

fn no_port(correlation_id: Option<&str>) -> ApplicationError {
    ApplicationError::config(correlation_id, "NO_PORT", "Connection port is not set")
}

fn bad_uri(correlation_id: Option<&str>, uri: &str, err: url::ParseError) -> ApplicationError {
    let base = match err {
        url::ParseError::EmptyHost => no_host(correlation_id),
        url::ParseError::InvalidPort => no_port(correlation_id),
        _ => ApplicationError::config(
            correlation_id,
            "WRONG_PROTOCOL",
            "Connection uri cannot be parsed",
        ),
    };
    base.with_details("uri", uri).with_cause(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDiscovery;

    fn resolver(tuples: &[(&str, &str)]) -> HttpConnectionResolver {
        let mut resolver = HttpConnectionResolver::new();
        resolver.configure(&ConfigParams::from_tuples(tuples.iter().copied()));
        resolver
    }

    #[tokio::test]
    async fn composes_uri() {
        let conn = resolver(&[
            ("connection.protocol", "http"),
            ("connection.host", "somewhere.com"),
            ("connection.port", "123"),
        ])
        .resolve(None)
        .await
        .unwrap();
        assert_eq!(conn.uri(), Some("http://somewhere.com:123"));
    }

    #[tokio::test]
    async fn parses_uri() {
        let conn = resolver(&[("connection.uri", "https://somewhere.com:123")])
            .resolve(None)
            .await
            .unwrap();
        assert_eq!(conn.protocol(), Some("https"));
        assert_eq!(conn.host(), Some("somewhere.com"));
        assert_eq!(conn.port(), 123);
    }

    #[tokio::test]
    async fn uri_roundtrip() {
        let cases = [
            ("http", "localhost", 3000),
            ("https", "10.0.0.1", 443),
            ("http", "::1", 8080),
        ];
        for (protocol, host, port) in cases {
            let built = validate(
                None,
                ConnectionParams::new().with_protocol(protocol).with_host(host).with_port(port),
            )
            .unwrap();
            let uri = built.uri().unwrap();
            let parsed = validate(None, ConnectionParams::new().with_uri(uri)).unwrap();
            assert_eq!(parsed.protocol(), Some(protocol));
            assert_eq!(parsed.host(), Some(host));
            assert_eq!(parsed.port(), port);
        }
    }

    #[tokio::test]
    async fn validation_order() {
        let err = resolver(&[]).resolve(None).await.unwrap_err();
        assert_eq!(err.code(), "NO_CONNECTION");

        let err = resolver(&[("connection.protocol", "ftp")]).resolve(None).await.unwrap_err();
        assert_eq!(err.code(), "WRONG_PROTOCOL");

        let err = resolver(&[("connection.protocol", "http"), ("connection.port", "0")])
            .resolve(None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NO_HOST");

        let err = resolver(&[("connection.host", "localhost")]).resolve(None).await.unwrap_err();
        assert_eq!(err.code(), "NO_PORT");
    }

    #[tokio::test]
    async fn bad_uri_maps_to_protocol_error() {
        let err = resolver(&[("connection.uri", "ftp://somewhere.com:21")])
            .resolve(Some("cid"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WRONG_PROTOCOL");
        assert_eq!(err.correlation_id(), Some("cid"));
    }

    #[tokio::test]
    async fn first_valid_wins() {
        let conn = resolver(&[
            ("connections.a.protocol", "ftp"),
            ("connections.b.host", "good.com"),
            ("connections.b.port", "80"),
        ])
        .resolve(None)
        .await
        .unwrap();
        assert_eq!(conn.host(), Some("good.com"));
    }

    #[tokio::test]
    async fn discovery_lookup_and_register() {
        let mut missing = resolver(&[("connection.discovery_key", "svc")]);
        assert_eq!(missing.resolve(None).await.unwrap_err().code(), "CANNOT_RESOLVE");

        let discovery = Arc::new(MemoryDiscovery::new().with_connection(
            "svc",
            ConnectionParams::new().with_host("found.com").with_port(8080),
        ));
        missing.set_discovery(discovery.clone());
        let conn = missing.resolve(None).await.unwrap();
        assert_eq!(conn.uri(), Some("http://found.com:8080"));

        let mut publisher = resolver(&[
            ("connection.discovery_key", "published"),
            ("connection.host", "me.com"),
            ("connection.port", "9000"),
        ]);
        publisher.set_discovery(discovery.clone());
        publisher.register(None).await.unwrap();
        let all = discovery.resolve_all(None, "published").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].uri(), Some("http://me.com:9000"));
    }
}
