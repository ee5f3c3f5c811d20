//! In-process transport: calls are dispatched to a [`LocalHandler`].
//!
//! Used to embed a backend in the same process and to drive the upper layers
//! in tests. Params and results still cross a `serde_json::Value` boundary,
//! so shape mismatches surface exactly as they would over a socket.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;
use solvelink_core::protocol::Method;

use crate::error::TransportError;
use crate::jsonrpc::INVALID_PARAMS;
use crate::Transport;

/// Something that answers calls in-process.
#[async_trait]
pub trait LocalHandler: Send + Sync {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}

type Route = Box<dyn Fn(Value) -> BoxFuture<'static, Result<Value, TransportError>> + Send + Sync>;

/// A [`LocalHandler`] assembled from typed per-method routes.
/// Unknown methods answer `MethodNotSupported`.
#[derive(Default)]
pub struct LocalBackend {
    routes: HashMap<&'static str, Route>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer method `M` with `f`.
    pub fn route<M, F, Fut>(mut self, f: F) -> Self
    where
        M: Method + 'static,
        M::Request: 'static,
        M::Response: 'static,
        F: Fn(M::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Response, TransportError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let route: Route = Box::new(move |params: Value| {
            let f = f.clone();
            Box::pin(async move {
                let request: M::Request =
                    serde_json::from_value(params).map_err(|e| TransportError::Application {
                        code: INVALID_PARAMS,
                        message: format!("invalid params for {}: {}", M::NAME, e),
                        data: None,
                    })?;
                let response = f(request).await?;
                Ok(serde_json::to_value(response)?)
            })
        });
        self.routes.insert(M::NAME, route);
        self
    }

    pub fn supports(&self, method: &str) -> bool {
        self.routes.contains_key(method)
    }
}

#[async_trait]
impl LocalHandler for LocalBackend {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        match self.routes.get(method) {
            Some(route) => route(params).await,
            None => Err(TransportError::MethodNotSupported(method.to_string())),
        }
    }
}

/// Transport that calls a handler in the same process.
pub struct LocalTransport {
    handler: Arc<dyn LocalHandler>,
    closed: AtomicBool,
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl LocalTransport {
    pub fn new(handler: Arc<dyn LocalHandler>) -> Self {
        Self {
            handler,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.handler.handle(method, params).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
