//! JSON-RPC over HTTP: one POST per call.
//!
//! Requests are independent, so concurrency is whatever the connection pool
//! allows. Network failures and timeouts count as connection loss.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use solvelink_core::config::TransportConfig;

use crate::error::TransportError;
use crate::jsonrpc::{Request, Response};
use crate::Transport;

#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: &str, cfg: &TransportConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.call_timeout)
            .build()
            .map_err(|e| TransportError::ConnectionLost(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = Request::new(id, method, params);

        let resp = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionLost(format!("{} request failed: {}", self.url, e)))?;

        let status = resp.status();
        let body_text = resp
            .text()
            .await
            .map_err(|e| TransportError::ConnectionLost(format!("response read failed: {}", e)))?;

        // Backends may answer JSON-RPC errors with a non-2xx status; the body wins.
        match serde_json::from_str::<Response>(&body_text) {
            Ok(parsed) => {
                if let Some(echoed) = parsed.request_id() {
                    if echoed != id {
                        return Err(TransportError::Codec(format!(
                            "response id {} does not match request id {}",
                            echoed, id
                        )));
                    }
                }
                parsed.into_result()
            }
            Err(_) if status == reqwest::StatusCode::NOT_FOUND
                || status == reqwest::StatusCode::NOT_IMPLEMENTED =>
            {
                Err(TransportError::MethodNotSupported(method.to_string()))
            }
            Err(_) if !status.is_success() => Err(TransportError::ConnectionLost(format!(
                "HTTP {}: {}",
                status,
                solvelink_core::tree::redact(&body_text, 200)
            ))),
            Err(e) => Err(TransportError::Codec(format!("invalid JSON-RPC response: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&format!("{}/rpc", server.uri()), &TransportConfig::default()).unwrap()
    }

    async fn answer(server: &MockServer, rpc_method: &str, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .and(body_partial_json(json!({"jsonrpc": "2.0", "method": rpc_method})))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_success_result() {
        let server = MockServer::start().await;
        answer(
            &server,
            "features/algorithms",
            ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": [{"id": "bfs", "name": "BFS"}]})),
        )
        .await;
        let t = transport_for(&server).await;
        let result = t.call("features/algorithms", Value::Null).await.unwrap();
        assert_eq!(result[0]["id"], "bfs");
    }

    #[tokio::test]
    async fn test_rpc_error_body_wins_over_status() {
        let server = MockServer::start().await;
        answer(
            &server,
            "solve/pathfinding",
            ResponseTemplate::new(500).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": 5, "message": "goal unreachable", "data": {"node": 9}}
            })),
        )
        .await;
        let t = transport_for(&server).await;
        match t.call("solve/pathfinding", json!({})).await {
            Err(TransportError::Application { code, message, data }) => {
                assert_eq!(code, 5);
                assert_eq!(message, "goal unreachable");
                assert_eq!(data, Some(json!({"node": 9})));
            }
            other => panic!("expected application error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_method_not_supported() {
        for status in [404, 501] {
            let server = MockServer::start().await;
            answer(&server, "features/traces", ResponseTemplate::new(status).set_body_string("no such route")).await;
            let t = transport_for(&server).await;
            assert!(
                matches!(
                    t.call("features/traces", Value::Null).await,
                    Err(TransportError::MethodNotSupported(ref m)) if m == "features/traces"
                ),
                "status {}",
                status
            );
        }
    }

    #[tokio::test]
    async fn test_other_error_status_is_connection_lost() {
        let server = MockServer::start().await;
        answer(&server, "checkConnection", ResponseTemplate::new(502).set_body_string("bad gateway")).await;
        let t = transport_for(&server).await;
        match t.call("checkConnection", Value::Null).await {
            Err(TransportError::ConnectionLost(reason)) => assert!(reason.contains("502")),
            other => panic!("expected connection loss, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_success_bodies_are_codec_errors() {
        let server = MockServer::start().await;
        answer(
            &server,
            "features/formats",
            ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 99, "result": []})),
        )
        .await;
        answer(&server, "features/maps", ResponseTemplate::new(200).set_body_string("<html>ok</html>")).await;
        let t = transport_for(&server).await;
        assert!(matches!(
            t.call("features/formats", Value::Null).await,
            Err(TransportError::Codec(ref m)) if m.contains("does not match")
        ));
        assert!(matches!(
            t.call("features/maps", Value::Null).await,
            Err(TransportError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_lost() {
        let server = MockServer::start().await;
        let url = format!("{}/rpc", server.uri());
        drop(server);
        let t = HttpTransport::new(&url, &TransportConfig::default()).unwrap();
        let err = t.call("checkConnection", Value::Null).await.unwrap_err();
        assert!(err.is_connection_failure());
    }
}
