//! Where task outcomes are reported.

use std::sync::Arc;

use solvelink_core::trace::Trace;
use solvelink_discovery::{Rejection, Requirements};

use crate::error::TaskError;
use crate::session::TaskState;

/// Receives task lifecycle notifications.
///
/// Called with the session lock held, in order. Implementations must not call
/// back into the session.
pub trait TaskEventSink: Send + Sync {
    fn on_state(&self, _state: &TaskState) {}

    fn on_trace(&self, _trace: &Arc<Trace>) {}

    /// No connection offers what the inputs require.
    fn on_no_connection(&self, _req: &Requirements, _rejections: &[Rejection]) {}

    /// Outstanding work was superseded or explicitly canceled.
    fn on_canceled(&self) {}

    fn on_error(&self, _err: &TaskError) {}
}

/// Reports everything through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl TaskEventSink for LoggingSink {
    fn on_state(&self, state: &TaskState) {
        tracing::debug!(state = %state, "Task state");
    }

    fn on_trace(&self, trace: &Arc<Trace>) {
        tracing::info!(
            trace = %trace.id,
            source = %trace.source,
            steps = trace.step_count(),
            "Trace ready"
        );
    }

    fn on_no_connection(&self, req: &Requirements, rejections: &[Rejection]) {
        tracing::warn!(
            algorithm = %req.algorithm,
            format = %req.format,
            problem_type = %req.problem_type(),
            asked = rejections.len(),
            "No connection can run this task"
        );
        for r in rejections {
            tracing::info!("  {}", r);
        }
    }

    fn on_canceled(&self) {
        tracing::info!("Task canceled");
    }

    fn on_error(&self, err: &TaskError) {
        tracing::error!(error = %err, "Task failed");
    }
}
