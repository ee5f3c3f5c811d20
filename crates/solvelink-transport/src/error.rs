//! Transport failure kinds.

use serde_json::Value;
use thiserror::Error;

/// Why a call did not produce a result.
///
/// `ConnectionLost` means the channel itself is unusable; every call still in
/// flight on it fails the same way. `MethodNotSupported` and `Application`
/// are per-call: the backend answered, and other calls are unaffected.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("method not supported by backend: {0}")]
    MethodNotSupported(String),

    #[error("solver error {code}: {message}")]
    Application {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("malformed message: {0}")]
    Codec(String),

    #[error("transport closed")]
    Closed,

    #[error("unsupported transport URL '{0}': expected http://, https:// or tcp://")]
    UnsupportedScheme(String),
}

impl TransportError {
    /// Whether the channel is gone (as opposed to one call failing).
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, TransportError::ConnectionLost(_) | TransportError::Closed)
    }

    /// Application-level errors are never retried.
    pub fn is_application(&self) -> bool {
        matches!(self, TransportError::Application { .. })
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Codec(err.to_string())
    }
}
