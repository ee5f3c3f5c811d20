//! A logical handle to one solver backend.

use std::sync::RwLock;
use std::time::Duration;

use serde_json::Value;
use solvelink_core::config::TransportConfig;
use solvelink_core::protocol::{CheckConnection, ConnectionInfo, Method};
use solvelink_transport::{Transport, TransportError};

use crate::error::{DiscoveryError, Result};

/// Last observed liveness of a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Unknown,
    Connected(ConnectionInfo),
    Unreachable(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected(_))
    }
}

/// A backend endpoint and the transport that reaches it.
///
/// `url` and `name` are fixed at construction. The transport is owned
/// exclusively and closed with the connection.
#[derive(Debug)]
pub struct Connection {
    url: String,
    name: String,
    transport: Box<dyn Transport>,
    status: RwLock<ConnectionStatus>,
}

impl Connection {
    pub fn new(url: impl Into<String>, name: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            transport,
            status: RwLock::new(ConnectionStatus::Unknown),
        }
    }

    /// Open a transport for `url` and wrap it. The name defaults to the URL.
    pub async fn open(url: &str, cfg: &TransportConfig) -> Result<Self> {
        let transport = solvelink_transport::connect(url, cfg)
            .await
            .map_err(|source| DiscoveryError::Open {
                url: url.to_string(),
                source,
            })?;
        Ok(Self::new(url, url, transport))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
            .read()
            .map(|s| s.clone())
            .unwrap_or(ConnectionStatus::Unknown)
    }

    /// Typed call: `M` fixes the request and response shapes.
    pub async fn call<M: Method>(&self, request: M::Request) -> std::result::Result<M::Response, TransportError> {
        let params = serde_json::to_value(&request)?;
        let result = self.call_raw(M::NAME, params).await?;
        serde_json::from_value(result).map_err(|e| {
            TransportError::Codec(format!("unexpected {} response from {}: {}", M::NAME, self.url, e))
        })
    }

    /// Untyped call, for debugging arbitrary methods.
    pub async fn call_raw(&self, method: &str, params: Value) -> std::result::Result<Value, TransportError> {
        let result = self.transport.call(method, params).await;
        match &result {
            Ok(_) => tracing::debug!(connection = %self.url, method, "call ok"),
            Err(e) => tracing::debug!(connection = %self.url, method, error = %e, "call failed"),
        }
        if let Err(e) = &result {
            if e.is_connection_failure() {
                self.set_status(ConnectionStatus::Unreachable(e.to_string()));
            }
        }
        result
    }

    /// Probe with `checkConnection` and record the outcome.
    pub async fn check(&self, timeout: Duration) -> ConnectionStatus {
        let status = match tokio::time::timeout(timeout, self.call::<CheckConnection>(())).await {
            Ok(Ok(info)) => ConnectionStatus::Connected(info),
            Ok(Err(e)) => ConnectionStatus::Unreachable(e.to_string()),
            Err(_) => ConnectionStatus::Unreachable(format!("no answer within {:?}", timeout)),
        };
        self.set_status(status.clone());
        status
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }

    fn set_status(&self, status: ConnectionStatus) {
        if let Ok(mut guard) = self.status.write() {
            *guard = status;
        }
    }
}
