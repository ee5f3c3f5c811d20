//! Answer JSON-RPC requests on a stream with a [`LocalHandler`].
//!
//! The backend side of [`StreamTransport`](crate::StreamTransport): one
//! request per line, handled concurrently, responses written as they finish.
//! Used to host in-process backends on a socket.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::jsonrpc::{
    read_frame, scan_id, Frame, Request, Response, RpcError, INVALID_REQUEST, MAX_REQUEST_SIZE, PARSE_ERROR,
};
use crate::local::LocalHandler;

/// Serve until the reader hits EOF, then wait for in-flight requests.
pub async fn serve_stream<R, W>(handler: Arc<dyn LocalHandler>, mut reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Writer task: the only owner of `writer`, so lines never interleave.
    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        writer.shutdown().await
    });

    let mut in_flight = JoinSet::new();
    loop {
        reap(&mut in_flight);
        let line = match read_frame(&mut reader, MAX_REQUEST_SIZE).await {
            Ok(None) => break,
            Ok(Some(Frame::Line(l))) => l,
            Ok(Some(Frame::Oversized { head, len })) => {
                let error = RpcError {
                    code: INVALID_REQUEST,
                    message: format!("request of {} bytes exceeds {} bytes", len, MAX_REQUEST_SIZE),
                    data: None,
                };
                send(&tx, &Response::failure_for(scan_id(&head), error));
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unreadable request stream");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                let error = RpcError {
                    code: PARSE_ERROR,
                    message: format!("Parse error: {}", e),
                    data: None,
                };
                send(&tx, &Response::failure_for(None, error));
                continue;
            }
        };

        let handler = handler.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            let response = match handler.handle(&request.method, request.params).await {
                Ok(result) => Response::success(request.id, result),
                Err(e) => Response::failure(request.id, RpcError::from(&e)),
            };
            send(&tx, &response);
        });
    }

    while in_flight.join_next().await.is_some() {}
    drop(tx);
    writer_task
        .await
        .map_err(|e| io::Error::other(format!("writer task failed: {}", e)))?
}

fn send(tx: &mpsc::UnboundedSender<String>, response: &Response) {
    match serde_json::to_string(response) {
        Ok(out) => {
            let _ = tx.send(out);
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode response"),
    }
}

/// Drop finished request tasks. Returns how many are still running.
fn reap(tasks: &mut JoinSet<()>) -> usize {
    while let Some(done) = tasks.try_join_next() {
        if let Err(e) = done {
            tracing::warn!(error = %e, "Request task failed");
        }
    }
    tasks.len()
}
