//! Ordered registry of connections.

use std::sync::{Arc, RwLock};

use solvelink_core::config::TransportConfig;

use crate::connection::Connection;
use crate::error::{DiscoveryError, Result};

/// Connections in registration order. Order is priority: federated search
/// returns the first match.
#[derive(Debug, Default)]
pub struct ConnectionStore {
    connections: RwLock<Vec<Arc<Connection>>>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every URL in order. URLs that fail to open are returned with
    /// their error and left out of the store.
    pub async fn open_all(urls: &[String], cfg: &TransportConfig) -> (Self, Vec<DiscoveryError>) {
        let store = Self::new();
        let mut failures = Vec::new();
        for url in urls {
            let added = match Connection::open(url, cfg).await {
                Ok(conn) => store.add(conn).map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = added {
                tracing::warn!(url = %url, error = %e, "Skipping connection");
                failures.push(e);
            }
        }
        (store, failures)
    }

    /// Register a connection. A URL may be registered once.
    pub fn add(&self, conn: Connection) -> Result<Arc<Connection>> {
        let mut guard = self.write();
        if guard.iter().any(|c| c.url() == conn.url()) {
            return Err(DiscoveryError::DuplicateConnection(conn.url().to_string()));
        }
        let conn = Arc::new(conn);
        guard.push(conn.clone());
        tracing::info!(url = %conn.url(), name = %conn.name(), "Connection registered");
        Ok(conn)
    }

    /// Unregister and return the connection for `url`. The caller closes it.
    pub fn remove(&self, url: &str) -> Result<Arc<Connection>> {
        let mut guard = self.write();
        let pos = guard
            .iter()
            .position(|c| c.url() == url)
            .ok_or_else(|| DiscoveryError::UnknownConnection(url.to_string()))?;
        Ok(guard.remove(pos))
    }

    pub fn get(&self, url: &str) -> Option<Arc<Connection>> {
        self.read().iter().find(|c| c.url() == url).cloned()
    }

    /// Snapshot in registration order.
    pub fn list(&self) -> Vec<Arc<Connection>> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Connection>>> {
        self.connections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Connection>>> {
        self.connections.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvelink_transport::{LocalBackend, LocalTransport};

    fn conn(url: &str) -> Connection {
        Connection::new(url, url, Box::new(LocalTransport::new(Arc::new(LocalBackend::new()))))
    }

    #[test]
    fn test_add_keeps_order_and_rejects_duplicates() {
        let store = ConnectionStore::new();
        store.add(conn("local://b")).unwrap();
        store.add(conn("local://a")).unwrap();
        assert!(matches!(
            store.add(conn("local://b")),
            Err(DiscoveryError::DuplicateConnection(_))
        ));
        let urls: Vec<_> = store.list().iter().map(|c| c.url().to_string()).collect();
        assert_eq!(urls, vec!["local://b", "local://a"]);
    }

    #[test]
    fn test_remove_and_get() {
        let store = ConnectionStore::new();
        store.add(conn("local://a")).unwrap();
        assert!(store.get("local://a").is_some());
        store.remove("local://a").unwrap();
        assert!(store.get("local://a").is_none());
        assert!(store.is_empty());
        assert!(matches!(
            store.remove("local://a"),
            Err(DiscoveryError::UnknownConnection(_))
        ));
    }

    #[tokio::test]
    async fn test_open_all_reports_bad_urls() {
        let urls = vec!["ws://nowhere".to_string(), "http://127.0.0.1:9".to_string()];
        let (store, failures) = ConnectionStore::open_all(&urls, &TransportConfig::default()).await;
        assert_eq!(store.len(), 1);
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], DiscoveryError::Open { .. }));
    }
}
