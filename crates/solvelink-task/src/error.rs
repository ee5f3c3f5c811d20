use solvelink_transport::TransportError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The backend ran the solver and reported a failure. Never retried.
    #[error("solver on {connection} rejected the task: {source}")]
    Solver {
        connection: String,
        #[source]
        source: TransportError,
    },

    #[error("call to {connection} failed: {source}")]
    Transport {
        connection: String,
        #[source]
        source: TransportError,
    },

    #[error("{what} index {index} out of range ({count} present)")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },
}

impl TaskError {
    pub(crate) fn from_call(connection: &str, source: TransportError) -> Self {
        let connection = connection.to_string();
        if source.is_application() {
            TaskError::Solver { connection, source }
        } else {
            TaskError::Transport { connection, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
