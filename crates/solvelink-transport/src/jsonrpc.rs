//! JSON-RPC 2.0 framing shared by the HTTP and stream transports.
//!
//! Request: `{"jsonrpc":"2.0","id":1,"method":"features/algorithms","params":null}`
//! Response: `{"jsonrpc":"2.0","id":1,"result":[...]}` or `{"jsonrpc":"2.0","id":1,"error":{...}}`
//!
//! On streams every message is one line.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::TransportError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Largest request a served backend reads (10 MB).
pub const MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for TransportError {
    fn from(err: RpcError) -> Self {
        if err.code == METHOD_NOT_FOUND {
            TransportError::MethodNotSupported(err.message)
        } else {
            TransportError::Application {
                code: err.code,
                message: err.message,
                data: err.data,
            }
        }
    }
}

impl From<&TransportError> for RpcError {
    /// Used by in-process backends answering over a real wire.
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::MethodNotSupported(m) => RpcError {
                code: METHOD_NOT_FOUND,
                message: m.clone(),
                data: None,
            },
            TransportError::Application {
                code,
                message,
                data,
            } => RpcError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            other => RpcError {
                code: INTERNAL_ERROR,
                message: other.to_string(),
                data: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    /// Null when the backend could not read the request id.
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: RpcError) -> Self {
        Self::failure_for(Some(id), error)
    }

    /// Error answer; `None` writes a null id (the request id was unreadable).
    pub fn failure_for(id: Option<u64>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.map(Value::from).unwrap_or(Value::Null),
            result: None,
            error: Some(error),
        }
    }

    /// Numeric request id, if the backend echoed one.
    pub fn request_id(&self) -> Option<u64> {
        self.id.as_u64()
    }

    /// A missing `result` with no `error` is a null result.
    pub fn into_result(self) -> Result<Value, TransportError> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// One line read off a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Line(String),
    /// The line exceeded the limit and was skipped. `head` holds its first
    /// bytes (lossy UTF-8) so the id can still be recovered.
    Oversized { head: String, len: usize },
}

/// Bytes of an oversized line kept for id recovery.
const OVERSIZED_HEAD: usize = 1024;

/// Read one newline-terminated frame of at most `limit` bytes.
/// Returns `Ok(None)` on EOF. A trailing `\r` is dropped. An oversized line
/// is consumed up to its newline, so the next frame starts clean.
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut len = 0usize;
    let mut oversized = false;
    loop {
        let available = match reader.fill_buf().await {
            Ok(b) => b,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return if len == 0 {
                Ok(None)
            } else {
                finish_frame(buf, len, oversized).map(Some)
            };
        }
        let (chunk, consumed, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (&available[..pos], pos + 1, true),
            None => (available, available.len(), false),
        };
        len += chunk.len();
        if !oversized && len > limit {
            oversized = true;
            buf.truncate(OVERSIZED_HEAD);
        }
        if oversized {
            let room = OVERSIZED_HEAD.saturating_sub(buf.len()).min(chunk.len());
            buf.extend_from_slice(&chunk[..room]);
        } else {
            buf.extend_from_slice(chunk);
        }
        reader.consume(consumed);
        if done {
            return finish_frame(buf, len, oversized).map(Some);
        }
    }
}

fn finish_frame(mut buf: Vec<u8>, len: usize, oversized: bool) -> io::Result<Frame> {
    if oversized {
        return Ok(Frame::Oversized {
            head: String::from_utf8_lossy(&buf).into_owned(),
            len,
        });
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Frame::Line)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8"))
}

/// Best-effort top-level `"id"` from the start of a message that could not be
/// parsed whole. Only numeric ids are recognized.
pub fn scan_id(head: &str) -> Option<u64> {
    let rest = &head[head.find("\"id\"")? + 4..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse().ok()
}
