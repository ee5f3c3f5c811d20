//! Environment variable keys and their aliases.
//!
//! Primary variables use the `SOLVELINK_*` prefix.

/// Solver backend endpoints.
pub mod connections {
    /// Comma-separated backend URLs, queried in the listed order.
    pub const SOLVELINK_CONNECTIONS: &str = "SOLVELINK_CONNECTIONS";
    pub const CONNECTIONS_ALIASES: &[&str] = &["SOLVER_CONNECTIONS"];
}

/// Transport tuning.
pub mod transport {
    /// Per-call timeout for request/response transports (seconds). Default 300.
    pub const SOLVELINK_CALL_TIMEOUT_SECS: &str = "SOLVELINK_CALL_TIMEOUT_SECS";
    /// Per-call timeout for `checkConnection` probes (seconds). Default 5.
    pub const SOLVELINK_CHECK_TIMEOUT_SECS: &str = "SOLVELINK_CHECK_TIMEOUT_SECS";
    /// Largest response frame a stream transport accepts (MiB). Default 256.
    pub const SOLVELINK_MAX_FRAME_MB: &str = "SOLVELINK_MAX_FRAME_MB";
}

/// Display of queries and traces.
pub mod display {
    /// Strings longer than this are redacted before display. Default 64.
    pub const SOLVELINK_REDACT_LIMIT: &str = "SOLVELINK_REDACT_LIMIT";
}

/// Observability and logging.
pub mod observability {
    pub const SOLVELINK_QUIET: &str = "SOLVELINK_QUIET";
    pub const QUIET_ALIASES: &[&str] = &[];

    pub const SOLVELINK_LOG_LEVEL: &str = "SOLVELINK_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["RUST_LOG_LEVEL"];

    pub const SOLVELINK_LOG_JSON: &str = "SOLVELINK_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &[];
}
