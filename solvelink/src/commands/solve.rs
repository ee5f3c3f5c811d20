use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use solvelink_core::config::{DisplayConfig, TransportConfig};
use solvelink_core::trace::Trace;
use solvelink_core::tree::redact_value;
use solvelink_discovery::FeatureDiscovery;
use solvelink_task::{LoggingSink, TaskError, TaskInputs, TaskSession, TaskState};

use crate::cli::SolveCmd;

pub async fn run(cmd: &SolveCmd) -> Result<()> {
    let (trace, path) = execute(cmd, &TransportConfig::from_env(), &DisplayConfig::from_env()).await?;
    println!("Trace {} from {}", trace.id, trace.source);
    if trace.is_stepped() {
        println!("  steps: {}", trace.step_count());
    } else {
        println!("  steps: none (content is not a step sequence)");
    }
    println!("  saved: {}", path.display());
    Ok(())
}

/// Run the task to completion and save its trace.
async fn execute(cmd: &SolveCmd, cfg: &TransportConfig, display: &DisplayConfig) -> Result<(Arc<Trace>, PathBuf)> {
    let map = std::fs::read_to_string(&cmd.map)
        .with_context(|| format!("Failed to read map {}", cmd.map.display()))?;
    let store = super::open_store(&cmd.connections, cfg).await?;
    let session = TaskSession::new(
        Arc::new(store),
        Arc::new(FeatureDiscovery::new()),
        Arc::new(LoggingSink),
    );

    session.edit(|inputs| fill(inputs, cmd, map))?;

    let state = tokio::select! {
        state = session.settled() => state,
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            TaskState::Canceled
        }
    };

    match state {
        TaskState::Completed => {}
        TaskState::Idle => bail!("Task inputs incomplete: missing {}", session.inputs().missing().join(", ")),
        TaskState::NoConnection => bail!(
            "No connection can run algorithm '{}' on format '{}' (problem type '{}')",
            cmd.selection.algorithm,
            cmd.selection.format,
            cmd.selection.problem_type.as_deref().unwrap_or("pathfinding")
        ),
        TaskState::Failed(reason) => bail!("Solve failed: {}", reason),
        other => bail!("Solve did not complete: {}", other),
    }

    if let Some(query) = session.query() {
        let shown = redact_value(&serde_json::to_value(&query)?, display.redact_limit);
        tracing::info!(query = %shown, "Solved");
    }
    let trace = session
        .trace()
        .ok_or_else(|| anyhow!("Task completed without a trace"))?;
    let path = cmd
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.trace.json", trace.id)));
    trace.save(&path)?;
    Ok((trace, path))
}

fn fill(inputs: &mut TaskInputs, cmd: &SolveCmd, map: String) -> Result<(), TaskError> {
    inputs.set_algorithm(&cmd.selection.algorithm);
    inputs.set_format(&cmd.selection.format);
    if let Some(p) = &cmd.selection.problem_type {
        inputs.set_problem_type(p);
    }
    inputs.set_map(map);
    inputs.set_start(cmd.start);
    inputs.set_end(cmd.end);
    for plant in &cmd.plants {
        inputs.add_plant(plant.node);
        if let Some(amount) = plant.amount {
            inputs.set_pour_amount(inputs.instance.plants.len() - 1, amount)?;
        }
    }
    for tap in &cmd.taps {
        inputs.add_tap(*tap);
    }
    Ok(())
}
