//! Newline-delimited JSON-RPC over a byte stream (TCP, pipes, in-memory duplex).
//!
//! Many calls may be in flight at once. Each request gets a fresh id and a
//! oneshot slot in the pending table; a background reader task routes every
//! response line to its slot, so a slow call never blocks a fast one.
//!
//! When the reader hits EOF or an IO error, the stream is marked lost: every
//! pending call fails with `ConnectionLost`, and later calls fail immediately
//! instead of hanging. A response line over the frame limit is skipped and
//! fails only its own call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use solvelink_core::config::TransportConfig;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::TransportError;
use crate::jsonrpc::{read_frame, scan_id, Frame, Request, Response};
use crate::Transport;

type Slot = oneshot::Sender<Result<Value, TransportError>>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Default)]
struct PendingTable {
    slots: HashMap<u64, Slot>,
    /// Set once the stream is unusable; the reason is reported to callers.
    lost: Option<String>,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<PendingTable>,
}

impl Shared {
    fn table(&self) -> std::sync::MutexGuard<'_, PendingTable> {
        // A poisoned table only means a panicking caller; the map is still consistent.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, id: u64) -> Result<oneshot::Receiver<Result<Value, TransportError>>, TransportError> {
        let mut table = self.table();
        if let Some(reason) = &table.lost {
            return Err(TransportError::ConnectionLost(reason.clone()));
        }
        let (tx, rx) = oneshot::channel();
        table.slots.insert(id, tx);
        Ok(rx)
    }

    fn forget(&self, id: u64) {
        self.table().slots.remove(&id);
    }

    fn deliver(&self, id: u64, result: Result<Value, TransportError>) {
        let slot = self.table().slots.remove(&id);
        match slot {
            // Receiver gone means the caller was canceled; drop the result.
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => tracing::debug!(id, "Response for unknown or abandoned call"),
        }
    }

    /// Fail every pending call without giving up on the stream.
    fn fail_pending(&self, err: &TransportError) {
        let slots = std::mem::take(&mut self.table().slots);
        for (_, tx) in slots {
            let _ = tx.send(Err(err.clone()));
        }
    }

    fn fail_all(&self, reason: &str) {
        let slots = {
            let mut table = self.table();
            if table.lost.is_none() {
                table.lost = Some(reason.to_string());
            }
            std::mem::take(&mut table.slots)
        };
        if !slots.is_empty() {
            tracing::warn!(pending = slots.len(), reason, "Failing in-flight calls");
        }
        for (_, tx) in slots {
            let _ = tx.send(Err(TransportError::ConnectionLost(reason.to_string())));
        }
    }
}

/// Removes the pending slot if the call future is dropped before completion.
struct SlotGuard<'a> {
    shared: &'a Shared,
    id: u64,
    armed: bool,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.forget(self.id);
        }
    }
}

/// JSON-RPC over any async byte stream.
pub struct StreamTransport {
    label: String,
    next_id: AtomicU64,
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<BoxWriter>,
    reader_task: JoinHandle<()>,
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl StreamTransport {
    /// Wrap a reader/writer pair with the default frame limit. Must be called
    /// inside a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, label: impl Into<String>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_frame_limit(reader, writer, label, TransportConfig::default().max_frame_bytes)
    }

    /// Like [`new`](Self::new), reading response lines of at most `max_frame` bytes.
    pub fn with_frame_limit<R, W>(reader: R, writer: W, label: impl Into<String>, max_frame: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let label = label.into();
        let shared = Arc::new(Shared::default());
        let reader_task = tokio::spawn(read_loop(
            BufReader::new(reader),
            shared.clone(),
            label.clone(),
            max_frame,
        ));
        Self {
            label,
            next_id: AtomicU64::new(1),
            shared,
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            reader_task,
        }
    }

    /// Connect to `host:port` over TCP.
    pub async fn connect_tcp(addr: &str, cfg: &TransportConfig) -> Result<Self, TransportError> {
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::ConnectionLost(format!("connect {}: {}", addr, e)))?;
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        tracing::debug!(addr, "Connected stream transport");
        Ok(Self::with_frame_limit(
            read_half,
            write_half,
            format!("tcp://{}", addr),
            cfg.max_frame_bytes,
        ))
    }

    /// Number of calls awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.shared.table().slots.len()
    }

    async fn send_frame(&self, frame: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn read_loop<R>(mut reader: BufReader<R>, shared: Arc<Shared>, label: String, max_frame: usize)
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = match read_frame(&mut reader, max_frame).await {
            Ok(Some(Frame::Line(line))) => line,
            Ok(Some(Frame::Oversized { head, len })) => {
                let err = TransportError::Codec(format!(
                    "response of {} bytes exceeds the {} byte frame limit",
                    len, max_frame
                ));
                match scan_id(&head) {
                    Some(id) => shared.deliver(id, Err(err)),
                    None => {
                        // Unattributable: fail what is pending rather than leave it hanging.
                        tracing::warn!(transport = %label, len, "Oversized frame without readable id");
                        shared.fail_pending(&err);
                    }
                }
                continue;
            }
            Ok(None) => {
                shared.fail_all("stream closed by peer");
                break;
            }
            Err(e) => {
                shared.fail_all(&format!("read failed: {}", e));
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Response>(&line) {
            Ok(resp) => match resp.request_id() {
                Some(id) => shared.deliver(id, resp.into_result()),
                None => tracing::warn!(transport = %label, "Response without usable id dropped"),
            },
            Err(e) => {
                // Route the codec error to the caller when the id is still readable.
                let id = serde_json::from_str::<Value>(&line)
                    .ok()
                    .and_then(|v| v.get("id").and_then(Value::as_u64));
                match id {
                    Some(id) => shared.deliver(id, Err(TransportError::Codec(e.to_string()))),
                    None => tracing::warn!(transport = %label, error = %e, "Unparsable frame dropped"),
                }
            }
        }
    }
    tracing::debug!(transport = %label, "Stream reader stopped");
}

#[async_trait]
impl Transport for StreamTransport {
    fn kind(&self) -> &'static str {
        "stream"
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::to_string(&Request::new(id, method, params))?;
        let rx = self.shared.register(id)?;
        let mut guard = SlotGuard {
            shared: &self.shared,
            id,
            armed: true,
        };

        if let Err(e) = self.send_frame(&frame).await {
            let reason = format!("write failed: {}", e);
            self.shared.fail_all(&reason);
            return Err(TransportError::ConnectionLost(reason));
        }

        let result = rx
            .await
            .unwrap_or_else(|_| Err(TransportError::ConnectionLost("reader stopped".to_string())));
        guard.armed = false;
        result
    }

    async fn close(&self) {
        self.shared.fail_all("transport closed");
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        self.reader_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{RpcError, METHOD_NOT_FOUND};
    use serde_json::json;
    use tokio::io::{duplex, split, AsyncBufReadExt, DuplexStream, ReadHalf, WriteHalf};

    type ServerSide = (tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>, WriteHalf<DuplexStream>);

    fn pair() -> (StreamTransport, ServerSide) {
        pair_with_limit(TransportConfig::default().max_frame_bytes)
    }

    fn pair_with_limit(max_frame: usize) -> (StreamTransport, ServerSide) {
        let (client, server) = duplex(64 * 1024);
        let (cr, cw) = split(client);
        let (sr, sw) = split(server);
        (
            StreamTransport::with_frame_limit(cr, cw, "duplex", max_frame),
            (BufReader::new(sr).lines(), sw),
        )
    }

    async fn next_request(lines: &mut tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>) -> Request {
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap()
    }

    async fn reply(w: &mut WriteHalf<DuplexStream>, resp: &Response) {
        let line = serde_json::to_string(resp).unwrap();
        w.write_all(line.as_bytes()).await.unwrap();
        w.write_all(b"\n").await.unwrap();
        w.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_order_responses_are_routed_by_id() {
        let (transport, (mut lines, mut w)) = pair();
        let transport = Arc::new(transport);

        let t1 = transport.clone();
        let slow = tokio::spawn(async move { t1.call("solve/pathfinding", json!({"n": 1})).await });
        let first: Request = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        let t2 = transport.clone();
        let fast = tokio::spawn(async move { t2.call("features/algorithms", Value::Null).await });
        let second: Request = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(transport.in_flight(), 2);

        // Answer the later call first.
        reply(&mut w, &Response::success(second.id, json!([{"id": "astar", "name": "A*"}]))).await;
        let fast_result = fast.await.unwrap().unwrap();
        assert_eq!(fast_result[0]["id"], "astar");
        assert!(!slow.is_finished());

        reply(&mut w, &Response::success(first.id, json!({"events": []}))).await;
        assert_eq!(slow.await.unwrap().unwrap(), json!({"events": []}));
        assert_eq!(transport.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_per_call_errors_do_not_affect_other_calls() {
        let (transport, (mut lines, mut w)) = pair();
        let transport = Arc::new(transport);

        let t1 = transport.clone();
        let a = tokio::spawn(async move { t1.call("solve/tsp", Value::Null).await });
        let ra: Request = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let t2 = transport.clone();
        let b = tokio::spawn(async move { t2.call("checkConnection", Value::Null).await });
        let rb: Request = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        reply(
            &mut w,
            &Response::failure(
                ra.id,
                RpcError {
                    code: METHOD_NOT_FOUND,
                    message: "solve/tsp".into(),
                    data: None,
                },
            ),
        )
        .await;
        reply(&mut w, &Response::success(rb.id, json!({"name": "warthog"}))).await;

        assert!(matches!(a.await.unwrap(), Err(TransportError::MethodNotSupported(_))));
        assert_eq!(b.await.unwrap().unwrap()["name"], "warthog");
    }

    #[tokio::test]
    async fn test_connection_loss_fails_all_in_flight_calls() {
        let (transport, (mut lines, w)) = pair();
        let transport = Arc::new(transport);

        let mut handles = Vec::new();
        for i in 0..3 {
            let t = transport.clone();
            handles.push(tokio::spawn(async move { t.call("solve/pathfinding", json!(i)).await }));
            lines.next_line().await.unwrap().unwrap();
        }

        drop(w);
        drop(lines);

        for h in handles {
            assert!(matches!(h.await.unwrap(), Err(TransportError::ConnectionLost(_))));
        }
        // Later calls fail promptly.
        let later = transport.call("checkConnection", Value::Null).await;
        assert!(matches!(later, Err(TransportError::ConnectionLost(_))));
    }

    #[tokio::test]
    async fn test_dropped_call_releases_its_slot() {
        let (transport, (mut lines, _w)) = pair();
        {
            let fut = transport.call("solve/pathfinding", Value::Null);
            tokio::pin!(fut);
            tokio::select! {
                _ = &mut fut => panic!("no response was sent"),
                line = lines.next_line() => { line.unwrap().unwrap(); }
            }
            assert_eq!(transport.in_flight(), 1);
        }
        assert_eq!(transport.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_trace_larger_than_request_limit_is_received() {
        let (transport, (mut lines, mut w)) = pair();
        let transport = Arc::new(transport);

        let t = transport.clone();
        let call = tokio::spawn(async move { t.call("solve/pathfinding", Value::Null).await });
        let req = next_request(&mut lines).await;

        let events: Vec<Value> = (0..400_000)
            .map(|i| json!({"type": "expand", "node": i, "g": i * 2}))
            .collect();
        let resp = Response::success(req.id, json!({ "events": events }));
        assert!(serde_json::to_string(&resp).unwrap().len() > crate::jsonrpc::MAX_REQUEST_SIZE);
        reply(&mut w, &resp).await;
        let result = call.await.unwrap().unwrap();
        assert_eq!(result["events"].as_array().unwrap().len(), 400_000);

        let t = transport.clone();
        let later = tokio::spawn(async move { t.call("checkConnection", Value::Null).await });
        let req = next_request(&mut lines).await;
        reply(&mut w, &Response::success(req.id, json!({"name": "big"}))).await;
        assert_eq!(later.await.unwrap().unwrap()["name"], "big");
    }

    #[tokio::test]
    async fn test_oversized_response_fails_only_its_call() {
        let (transport, (mut lines, mut w)) = pair_with_limit(1024);
        let transport = Arc::new(transport);

        let t1 = transport.clone();
        let big = tokio::spawn(async move { t1.call("solve/pathfinding", Value::Null).await });
        let big_req = next_request(&mut lines).await;
        let t2 = transport.clone();
        let small = tokio::spawn(async move { t2.call("checkConnection", Value::Null).await });
        let small_req = next_request(&mut lines).await;

        reply(&mut w, &Response::success(big_req.id, json!({"blob": "x".repeat(4096)}))).await;
        assert!(matches!(big.await.unwrap(), Err(TransportError::Codec(_))));
        assert!(!small.is_finished());

        reply(&mut w, &Response::success(small_req.id, json!({"name": "ok"}))).await;
        assert_eq!(small.await.unwrap().unwrap()["name"], "ok");

        // The stream is still usable.
        let t3 = transport.clone();
        let later = tokio::spawn(async move { t3.call("checkConnection", Value::Null).await });
        let req = next_request(&mut lines).await;
        reply(&mut w, &Response::success(req.id, json!({"name": "again"}))).await;
        assert_eq!(later.await.unwrap().unwrap()["name"], "again");
    }
}
