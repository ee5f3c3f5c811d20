//! Solver traces and their playback.
//!
//! A [`Trace`] is the recorded result of one solve call. Its content is opaque
//! JSON; when the backend emits a search trace (`{"events": [...]}`) or an
//! explicit `{"steps": [...]}` list, each element becomes an addressable step.
//! Traces are immutable once built and shared as `Arc<Trace>`.
//!
//! [`Playback`] layers navigation on top: a cursor, breakpoints and the onion
//! view. None of it touches the trace itself.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::TraceDescriptor;

/// Content keys that hold the step list, in lookup order.
const STEP_KEYS: &[&str] = &["events", "steps"];

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("step {index} out of range (trace has {count} steps)")]
    StepOutOfRange { index: i64, count: usize },

    #[error("trace has no content")]
    MissingContent,

    #[error("failed to read trace file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid trace file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One recorded solve result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TraceRecord")]
pub struct Trace {
    pub id: String,
    pub name: String,
    /// Connection that produced the trace.
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub content: Value,
    #[serde(skip)]
    steps: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraceRecord {
    id: String,
    name: String,
    #[serde(default)]
    source: String,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    content: Value,
}

impl From<TraceRecord> for Trace {
    fn from(r: TraceRecord) -> Self {
        let steps = extract_steps(&r.content);
        Self {
            id: r.id,
            name: r.name,
            source: r.source,
            created_at: r.created_at,
            content: r.content,
            steps,
        }
    }
}

fn extract_steps(content: &Value) -> Option<Vec<Value>> {
    STEP_KEYS
        .iter()
        .find_map(|key| content.get(*key).and_then(Value::as_array).cloned())
}

impl Trace {
    /// Build a trace with a fresh id, distinct from any request identity.
    pub fn new(name: impl Into<String>, source: impl Into<String>, content: Value) -> Self {
        TraceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            source: source.into(),
            created_at: Utc::now(),
            content,
        }
        .into()
    }

    /// Build a trace from a stored descriptor (`features/trace`).
    pub fn from_descriptor(desc: TraceDescriptor) -> Result<Self, TraceError> {
        let content = desc.content.ok_or(TraceError::MissingContent)?;
        Ok(TraceRecord {
            id: desc.id,
            name: desc.name,
            source: desc.source,
            created_at: Utc::now(),
            content,
        }
        .into())
    }

    pub fn load(path: &Path) -> Result<Self, TraceError> {
        let text = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| TraceError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), TraceError> {
        let io_err = |source| TraceError::Io {
            path: path.display().to_string(),
            source,
        };
        let text = serde_json::to_string_pretty(self).map_err(|e| io_err(e.into()))?;
        std::fs::write(path, text).map_err(io_err)
    }

    /// Whether the content carries addressable steps.
    pub fn is_stepped(&self) -> bool {
        self.steps.is_some()
    }

    /// Number of addressable steps; zero for non-incremental content.
    pub fn step_count(&self) -> usize {
        self.steps.as_ref().map_or(0, Vec::len)
    }

    /// Step `index`. Out-of-range indices are an error, never clamped.
    pub fn step(&self, index: usize) -> Result<&Value, TraceError> {
        self.steps
            .as_ref()
            .and_then(|s| s.get(index))
            .ok_or(TraceError::StepOutOfRange {
                index: index as i64,
                count: self.step_count(),
            })
    }

    /// Signed variant of [`Trace::step`] for scrubbing offsets; negative fails.
    pub fn step_at(&self, index: i64) -> Result<&Value, TraceError> {
        if index < 0 {
            return Err(TraceError::StepOutOfRange {
                index,
                count: self.step_count(),
            });
        }
        self.step(index as usize)
    }

    /// Up to `depth` consecutive steps ending at `end`, oldest first. Opacity
    /// falls linearly from 1.0 at `end` towards 0 for older steps.
    pub fn onion(&self, end: usize, depth: usize) -> Result<Vec<OnionLayer<'_>>, TraceError> {
        self.step(end)?;
        if depth == 0 {
            return Ok(Vec::new());
        }
        let first = (end + 1).saturating_sub(depth);
        let mut layers = Vec::with_capacity(end + 1 - first);
        for index in first..=end {
            let distance = end - index;
            layers.push(OnionLayer {
                index,
                step: self.step(index)?,
                opacity: 1.0 - distance as f32 / depth as f32,
            });
        }
        Ok(layers)
    }
}

/// One step rendered in the onion view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnionLayer<'a> {
    pub index: usize,
    pub step: &'a Value,
    pub opacity: f32,
}

/// Cursor, breakpoints and onion over a shared trace.
#[derive(Debug, Clone)]
pub struct Playback {
    trace: Arc<Trace>,
    cursor: usize,
    breakpoints: BTreeSet<usize>,
}

impl Playback {
    pub fn new(trace: Arc<Trace>) -> Self {
        Self {
            trace,
            cursor: 0,
            breakpoints: BTreeSet::new(),
        }
    }

    pub fn trace(&self) -> &Arc<Trace> {
        &self.trace
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Result<&Value, TraceError> {
        self.trace.step(self.cursor)
    }

    pub fn seek(&mut self, index: usize) -> Result<(), TraceError> {
        self.trace.step(index)?;
        self.cursor = index;
        Ok(())
    }

    /// Move relative to the cursor; landing outside the trace is an error and
    /// leaves the cursor where it was.
    pub fn seek_by(&mut self, delta: i64) -> Result<(), TraceError> {
        let target = self.cursor as i64 + delta;
        self.trace.step_at(target)?;
        self.cursor = target as usize;
        Ok(())
    }

    /// Advance one step. Returns false at the last step.
    pub fn step_forward(&mut self) -> bool {
        self.seek_by(1).is_ok()
    }

    /// Go back one step. Returns false at the first step.
    pub fn step_back(&mut self) -> bool {
        self.seek_by(-1).is_ok()
    }

    /// Flip a breakpoint. Returns whether it is now set.
    pub fn toggle_breakpoint(&mut self, index: usize) -> Result<bool, TraceError> {
        self.trace.step(index)?;
        if self.breakpoints.remove(&index) {
            Ok(false)
        } else {
            self.breakpoints.insert(index);
            Ok(true)
        }
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = usize> + '_ {
        self.breakpoints.iter().copied()
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// First breakpoint strictly after the cursor.
    pub fn next_breakpoint(&self) -> Option<usize> {
        self.breakpoints.range(self.cursor + 1..).next().copied()
    }

    /// Last breakpoint strictly before the cursor.
    pub fn prev_breakpoint(&self) -> Option<usize> {
        self.breakpoints.range(..self.cursor).next_back().copied()
    }

    /// Jump to the next breakpoint, or to the last step when none is left.
    /// Returns the new cursor.
    pub fn run_to_next_breakpoint(&mut self) -> usize {
        let target = self
            .next_breakpoint()
            .unwrap_or_else(|| self.trace.step_count().saturating_sub(1));
        if self.trace.step(target).is_ok() {
            self.cursor = target;
        }
        self.cursor
    }

    pub fn onion(&self, depth: usize) -> Result<Vec<OnionLayer<'_>>, TraceError> {
        self.trace.onion(self.cursor, depth)
    }
}
