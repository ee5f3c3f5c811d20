use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use solvelink_core::config::DisplayConfig;
use solvelink_core::trace::{Playback, Trace, TraceError};
use solvelink_core::tree::redact_value;

use crate::cli::TraceCmd;

pub fn run(cmd: &TraceCmd) -> Result<()> {
    let trace = Arc::new(Trace::load(&cmd.file)?);
    print!("{}", render(trace, cmd, DisplayConfig::from_env().redact_limit)?);
    Ok(())
}

fn render(trace: Arc<Trace>, cmd: &TraceCmd, limit: usize) -> Result<String, TraceError> {
    let mut out = String::new();
    let _ = writeln!(out, "Trace {}  \"{}\"", trace.id, trace.name);
    let _ = writeln!(out, "  source:  {}", trace.source);
    let _ = writeln!(out, "  created: {}", trace.created_at.to_rfc3339());

    let wants_steps = cmd.step.is_some() || cmd.onion.is_some() || !cmd.breakpoints.is_empty();
    if trace.step_count() == 0 {
        let _ = writeln!(out, "  steps:   none");
        if wants_steps {
            // Surfaces as StepOutOfRange with count 0.
            trace.step_at(cmd.step.unwrap_or(0))?;
        }
        let _ = writeln!(out, "{}", compact(&trace.content, limit));
        return Ok(out);
    }
    let _ = writeln!(out, "  steps:   {}", trace.step_count());

    let mut playback = Playback::new(trace.clone());
    for bp in &cmd.breakpoints {
        playback.toggle_breakpoint(*bp)?;
    }
    match cmd.step {
        Some(n) => {
            trace.step_at(n)?;
            playback.seek(n as usize)?;
        }
        None if !cmd.breakpoints.is_empty() => {
            playback.run_to_next_breakpoint();
        }
        None => {}
    }

    let _ = writeln!(
        out,
        "step {}/{}: {}",
        playback.cursor(),
        trace.step_count() - 1,
        compact(playback.current()?, limit)
    );

    if !cmd.breakpoints.is_empty() {
        let set: Vec<String> = playback.breakpoints().map(|b| b.to_string()).collect();
        let fmt = |b: Option<usize>| b.map_or("-".to_string(), |b| b.to_string());
        let _ = writeln!(
            out,
            "breakpoints: {} (prev {}, next {})",
            set.join(", "),
            fmt(playback.prev_breakpoint()),
            fmt(playback.next_breakpoint())
        );
    }

    if let Some(depth) = cmd.onion {
        for layer in playback.onion(depth)? {
            let _ = writeln!(
                out,
                "  #{:<5} {:.2}  {}",
                layer.index,
                layer.opacity,
                compact(layer.step, limit)
            );
        }
    }
    Ok(out)
}

fn compact(value: &Value, limit: usize) -> String {
    redact_value(value, limit).to_string()
}
