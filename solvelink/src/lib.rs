//! solvelink CLI library: argument parsing and command dispatch.

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use solvelink_core::observability::{init_tracing, TracingMode};

/// Run the CLI: parse args, set up logging and a runtime, dispatch.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(if matches!(cli.command, Commands::Trace(_)) {
        TracingMode::Playback
    } else {
        TracingMode::Default
    });

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(commands::dispatch(cli.command))
}
