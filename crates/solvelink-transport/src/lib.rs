//! solvelink transports: how a call reaches a solver backend.
//!
//! Higher layers only rely on [`Transport::call`]: send a named method with
//! JSON params, get a JSON result or a [`TransportError`]. Implementations:
//! - **HTTP** (`http://`, `https://`): one JSON-RPC POST per call
//! - **Stream** (`tcp://host:port`): newline-delimited JSON-RPC, multiplexed
//! - **Local**: in-process [`LocalHandler`]
//!
//! [`serve_stream`] is the matching backend side for hosting a handler on a
//! socket.

mod error;
mod http;
pub mod jsonrpc;
mod local;
mod serve;
mod stream;

use async_trait::async_trait;
use serde_json::Value;
use solvelink_core::config::TransportConfig;

pub use error::TransportError;
pub use http::HttpTransport;
pub use local::{LocalBackend, LocalHandler, LocalTransport};
pub use serve::serve_stream;
pub use stream::StreamTransport;

/// A channel to one backend. Calls may overlap; each resolves on its own.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Short name for logs ("http", "stream", "local").
    fn kind(&self) -> &'static str;

    /// Call `method` with `params`.
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Release the channel. Outstanding and later calls fail.
    async fn close(&self) {}
}

/// Open a transport for `url`, chosen by scheme.
pub async fn connect(url: &str, cfg: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Box::new(HttpTransport::new(url, cfg)?));
    }
    if let Some(addr) = url.strip_prefix("tcp://") {
        let addr = addr.trim_end_matches('/');
        if addr.is_empty() {
            return Err(TransportError::UnsupportedScheme(url.to_string()));
        }
        return Ok(Box::new(StreamTransport::connect_tcp(addr, cfg).await?));
    }
    Err(TransportError::UnsupportedScheme(url.to_string()))
}
