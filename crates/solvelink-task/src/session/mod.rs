//! Task execution.
//!
//! A session owns the task inputs. Each input revision gets one lifecycle:
//! federated search, then the solve call, then a [`Trace`]. Editing inputs
//! cancels the running lifecycle and bumps the generation under the session
//! lock before the next one is spawned. A lifecycle applies its result only
//! while its generation is current, so a late answer to a superseded request
//! is dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use solvelink_core::protocol::{SolveArgs, SolvePathfinding};
use solvelink_core::trace::Trace;
use solvelink_discovery::{ConnectionStore, FeatureDiscovery, Requirements, SearchOutcome};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::events::TaskEventSink;
use crate::inputs::TaskInputs;


#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Inputs incomplete; nothing to do.
    Idle,
    /// Looking for a connection that can run the task.
    Resolving,
    /// Solve call in flight.
    Submitting { connection: String },
    Completed,
    /// Superseded by an input change or canceled explicitly.
    Canceled,
    Failed(String),
    NoConnection,
}

impl TaskState {
    /// True unless work is outstanding.
    pub fn is_settled(&self) -> bool {
        !matches!(self, TaskState::Resolving | TaskState::Submitting { .. })
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Idle => write!(f, "idle"),
            TaskState::Resolving => write!(f, "resolving"),
            TaskState::Submitting { connection } => write!(f, "submitting to {}", connection),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Canceled => write!(f, "canceled"),
            TaskState::Failed(reason) => write!(f, "failed: {}", reason),
            TaskState::NoConnection => write!(f, "no connection"),
        }
    }
}

struct SessionState {
    inputs: TaskInputs,
    generation: u64,
    /// Token of the running lifecycle, if any.
    active: Option<CancellationToken>,
    query: Option<SolveArgs>,
    trace: Option<Arc<Trace>>,
}

struct Shared {
    store: Arc<ConnectionStore>,
    discovery: Arc<FeatureDiscovery>,
    sink: Arc<dyn TaskEventSink>,
    state: Mutex<SessionState>,
    status: watch::Sender<TaskState>,
}

/// One editable task and its execution. Must be used inside a Tokio runtime.
pub struct TaskSession {
    shared: Arc<Shared>,
}

impl TaskSession {
    pub fn new(
        store: Arc<ConnectionStore>,
        discovery: Arc<FeatureDiscovery>,
        sink: Arc<dyn TaskEventSink>,
    ) -> Self {
        let (status, _) = watch::channel(TaskState::Idle);
        Self {
            shared: Arc::new(Shared {
                store,
                discovery,
                sink,
                state: Mutex::new(SessionState {
                    inputs: TaskInputs::default(),
                    generation: 0,
                    active: None,
                    query: None,
                    trace: None,
                }),
                status,
            }),
        }
    }

    pub fn state(&self) -> TaskState {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.shared.status.subscribe()
    }

    pub fn inputs(&self) -> TaskInputs {
        self.shared.lock().inputs.clone()
    }

    /// The request that produced the current trace. A request that failed or
    /// was superseded never replaces it.
    pub fn query(&self) -> Option<SolveArgs> {
        self.shared.lock().query.clone()
    }

    pub fn trace(&self) -> Option<Arc<Trace>> {
        self.shared.lock().trace.clone()
    }

    /// Edit the inputs. If they changed, outstanding work is canceled and a
    /// new lifecycle starts when the inputs are complete. Removing a placed
    /// point (start, end, all plants or all taps) also drops the current
    /// query and trace.
    pub fn edit<R>(&self, f: impl FnOnce(&mut TaskInputs) -> R) -> R {
        let mut st = self.shared.lock();
        let before = st.inputs.clone();
        let out = f(&mut st.inputs);
        if st.inputs != before {
            if st.inputs.cleared_points_since(&before) {
                st.query = None;
                st.trace = None;
            }
            self.shared.restart(&mut st);
        }
        out
    }

    /// Start a fresh lifecycle for the current inputs.
    pub fn rerun(&self) {
        let mut st = self.shared.lock();
        self.shared.restart(&mut st);
    }

    /// Cancel outstanding work, if any.
    pub fn cancel(&self) {
        let mut st = self.shared.lock();
        if st.active.is_some() {
            self.shared.cancel_active(&mut st);
            st.generation += 1;
        }
    }

    /// Wait until no work is outstanding and return the state reached.
    pub async fn settled(&self) -> TaskState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(TaskState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }
}

impl Drop for TaskSession {
    fn drop(&mut self) {
        if let Some(token) = self.shared.lock().active.take() {
            token.cancel();
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: TaskState) {
        tracing::debug!(state = %state, "Task state changed");
        self.status.send_replace(state.clone());
        self.sink.on_state(&state);
    }

    fn cancel_active(&self, st: &mut SessionState) {
        if let Some(token) = st.active.take() {
            token.cancel();
            self.set_state(TaskState::Canceled);
            self.sink.on_canceled();
        }
    }

    fn restart(self: &Arc<Self>, st: &mut SessionState) {
        self.cancel_active(st);
        st.generation += 1;
        let (Some(req), Some(args)) = (st.inputs.requirements(), st.inputs.solve_args()) else {
            self.set_state(TaskState::Idle);
            return;
        };
        let token = CancellationToken::new();
        st.active = Some(token.clone());
        self.set_state(TaskState::Resolving);
        let shared = Arc::clone(self);
        let generation = st.generation;
        tokio::spawn(async move { shared.run(generation, token, req, args).await });
    }

    /// Run `f` under the lock, only if `generation` is still current.
    fn apply(&self, generation: u64, f: impl FnOnce(&Self, &mut SessionState)) -> bool {
        let mut st = self.lock();
        if st.generation != generation {
            tracing::debug!(generation, current = st.generation, "Discarding stale task result");
            return false;
        }
        f(self, &mut st);
        true
    }

    async fn run(self: Arc<Self>, generation: u64, token: CancellationToken, req: Requirements, args: SolveArgs) {
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            outcome = self.discovery.search(&self.store, &req) => outcome,
        };
        let conn = match outcome {
            SearchOutcome::Found(conn) => conn,
            SearchOutcome::NoMatch(rejections) => {
                self.apply(generation, |shared, st| {
                    st.active = None;
                    shared.set_state(TaskState::NoConnection);
                    shared.sink.on_no_connection(&req, &rejections);
                });
                return;
            }
        };

        let submitted = self.apply(generation, |shared, _| {
            shared.set_state(TaskState::Submitting {
                connection: conn.url().to_string(),
            });
        });
        if !submitted {
            return;
        }
        tracing::info!(connection = %conn.url(), algorithm = %args.algorithm, generation, "Submitting task");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(generation, "Solve abandoned");
                return;
            }
            result = conn.call::<SolvePathfinding>(args.clone()) => result,
        };

        match result {
            Ok(content) => {
                let name = format!("{} / {}", args.algorithm, req.problem_type());
                let trace = Arc::new(Trace::new(name, conn.url(), content));
                self.apply(generation, |shared, st| {
                    st.active = None;
                    st.query = Some(args.clone());
                    st.trace = Some(trace.clone());
                    shared.set_state(TaskState::Completed);
                    shared.sink.on_trace(&trace);
                });
            }
            Err(e) => {
                let err = TaskError::from_call(conn.url(), e);
                self.apply(generation, |shared, st| {
                    st.active = None;
                    shared.set_state(TaskState::Failed(err.to_string()));
                    shared.sink.on_error(&err);
                });
            }
        }
    }
}
