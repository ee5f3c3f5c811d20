//! Observability: tracing initialization.
//!
//! Uses config::ObservabilityConfig for SOLVELINK_QUIET, SOLVELINK_LOG_LEVEL, SOLVELINK_LOG_JSON.

use tracing_subscriber::{prelude::*, EnvFilter};

/// Tracing initialization mode.
#[derive(Clone, Copy)]
pub enum TracingMode {
    /// Default: use SOLVELINK_LOG_LEVEL / SOLVELINK_QUIET from env
    Default,
    /// Playback: trace inspection prints to stdout, so transport chatter is kept at warn
    Playback,
}

/// Initialize tracing. Call at process startup; later calls are no-ops.
/// When SOLVELINK_QUIET=1, only WARN and above are logged.
pub fn init_tracing(mode: TracingMode) {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let mut level: String = if cfg.quiet {
        "solvelink=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    if matches!(mode, TracingMode::Playback) {
        level = format!("{},solvelink_transport=warn", level);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // Logs go to stderr; stdout carries command output.
    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}
