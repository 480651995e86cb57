//! Discovery services that map a key to connection definitions.

use crate::{ApplicationError, ConnectionParams};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Looks up and publishes connections by key.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Publish a connection under `key`.
    async fn register(
        &self,
        correlation_id: Option<&str>,
        key: &str,
        connection: ConnectionParams,
    ) -> Result<(), ApplicationError>;

    /// First connection registered under `key`.
    async fn resolve_one(
        &self,
        correlation_id: Option<&str>,
        key: &str,
    ) -> Result<Option<ConnectionParams>, ApplicationError>;

    /// Every connection registered under `key`.
    async fn resolve_all(
        &self,
        correlation_id: Option<&str>,
        key: &str,
    ) -> Result<Vec<ConnectionParams>, ApplicationError>;
}

/// Discovery backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryDiscovery {
    items: RwLock<HashMap<String, Vec<ConnectionParams>>>,
}

impl MemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry.
    pub fn with_connection(self, key: impl Into<String>, connection: ConnectionParams) -> Self {
        self.items.write().entry(key.into()).or_default().push(connection);
        self
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn register(
        &self,
        correlation_id: Option<&str>,
        key: &str,
        connection: ConnectionParams,
    ) -> Result<(), ApplicationError> {
        tracing::debug!(correlation_id, key, "registering connection in memory discovery");
        self.items.write().entry(key.to_string()).or_default().push(connection);
        Ok(())
    }

    async fn resolve_one(
        &self,
        _correlation_id: Option<&str>,
        key: &str,
    ) -> Result<Option<ConnectionParams>, ApplicationError> {
        Ok(self.items.read().get(key).and_then(|v| v.first().cloned()))
    }

    async fn resolve_all(
        &self,
        _correlation_id: Option<&str>,
        key: &str,
    ) -> Result<Vec<ConnectionParams>, ApplicationError> {
        Ok(self.items.read().get(key).cloned().unwrap_or_default())
    }
}
