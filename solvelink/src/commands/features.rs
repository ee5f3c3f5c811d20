use std::fmt::Write as _;

use anyhow::Result;
use solvelink_core::config::TransportConfig;
use solvelink_core::protocol::Feature;
use solvelink_discovery::{ConnectionFeatures, FeatureDiscovery};

use crate::cli::ConnectionArgs;

pub async fn run(args: &ConnectionArgs, json: bool) -> Result<()> {
    let store = super::open_store(args, &TransportConfig::from_env()).await?;
    let all = FeatureDiscovery::uncached().describe_all(&store).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
    } else {
        print!("{}", render(&all));
    }
    Ok(())
}

fn render(all: &[ConnectionFeatures]) -> String {
    let mut out = String::new();
    for conn in all {
        let _ = writeln!(out, "{} ({})", conn.url, conn.name);
        let _ = writeln!(out, "  algorithms:    {}", list(conn.algorithms.as_deref()));
        let _ = writeln!(out, "  formats:       {}", list(conn.formats.as_deref()));
        let _ = writeln!(out, "  problem types: {}", list(conn.problem_types.as_deref()));
        let maps = conn
            .maps
            .as_ref()
            .map(|m| m.iter().map(|d| d.id.as_str()).collect::<Vec<_>>());
        let _ = writeln!(out, "  maps:          {}", ids(maps));
        let traces = conn
            .traces
            .as_ref()
            .map(|t| t.iter().map(|d| d.id.as_str()).collect::<Vec<_>>());
        let _ = writeln!(out, "  traces:        {}", ids(traces));
    }
    out
}

fn list(features: Option<&[Feature]>) -> String {
    match features {
        None => "(unavailable)".to_string(),
        Some([]) => "(none)".to_string(),
        Some(fs) => fs
            .iter()
            .map(|f| if f.name == f.id { f.id.clone() } else { format!("{} ({})", f.id, f.name) })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn ids(ids: Option<Vec<&str>>) -> String {
    match ids {
        None => "(unavailable)".to_string(),
        Some(v) if v.is_empty() => "(none)".to_string(),
        Some(v) => v.join(", "),
    }
}
