//! Connection parameters read from configuration.

use crate::ConfigParams;
use std::collections::BTreeMap;

/// One network endpoint definition.
///
/// Either `uri` or the `(protocol, host, port)` triple is authoritative; the
/// resolver fills in the other side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    protocol: Option<String>,
    host: Option<String>,
    port: u16,
    uri: Option<String>,
    discovery_key: Option<String>,
    properties: BTreeMap<String, String>,
}

impl ConnectionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a connection section (keys without the `connection.` prefix).
    pub fn from_config(section: &ConfigParams) -> Self {
        let mut conn = Self::new();
        for (key, value) in section.iter() {
            match key {
                "protocol" => conn.protocol = non_empty(value),
                "host" => conn.host = non_empty(value),
                "port" => conn.port = value.trim().parse().unwrap_or(0),
                "uri" => conn.uri = non_empty(value),
                "discovery_key" => conn.discovery_key = non_empty(value),
                _ => {
                    conn.properties.insert(key.to_string(), value.to_string());
                }
            }
        }
        conn
    }

    /// All connections in a configuration: `connection.*` first, then every
    /// `connections.<name>.*` section in key order.
    pub fn many_from_config(config: &ConfigParams) -> Vec<Self> {
        let mut result = Vec::new();
        let single = config.section("connection");
        if !single.is_empty() {
            result.push(Self::from_config(&single));
        }
        let many = config.section("connections");
        for name in many.section_names() {
            result.push(Self::from_config(&many.section(&name)));
        }
        result
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_discovery_key(mut self, key: impl Into<String>) -> Self {
        self.discovery_key = Some(key.into());
        self
    }

    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub fn protocol_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.protocol.as_deref().unwrap_or(default)
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn discovery_key(&self) -> Option<&str> {
        self.discovery_key.as_deref()
    }

    /// Whether this definition must be looked up through discovery.
    pub fn uses_discovery(&self) -> bool {
        self.discovery_key.is_some()
    }

    /// Extra keys that are not part of the address.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub(crate) fn set_address(&mut self, protocol: String, host: String, port: u16, uri: String) {
        self.protocol = Some(protocol);
        self.host = Some(host);
        self.port = port;
        self.uri = Some(uri);
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
