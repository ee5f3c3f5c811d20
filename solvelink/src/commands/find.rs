use anyhow::Result;
use solvelink_core::config::TransportConfig;
use solvelink_discovery::{FeatureDiscovery, Requirements, SearchOutcome};

use crate::cli::{FindCmd, TaskSelection};

pub async fn run(cmd: &FindCmd) -> Result<()> {
    let store = super::open_store(&cmd.connections, &TransportConfig::from_env()).await?;
    let req = requirements(&cmd.selection);
    match FeatureDiscovery::uncached().search(&store, &req).await {
        SearchOutcome::Found(conn) => println!("{} ({})", conn.url(), conn.name()),
        SearchOutcome::NoMatch(rejections) => {
            println!(
                "No connection offers algorithm '{}', format '{}' and problem type '{}'",
                req.algorithm,
                req.format,
                req.problem_type()
            );
            for r in rejections {
                println!("  {}", r);
            }
        }
    }
    Ok(())
}

fn requirements(sel: &TaskSelection) -> Requirements {
    let req = Requirements::new(&sel.algorithm, &sel.format);
    match &sel.problem_type {
        Some(p) => req.with_problem_type(p),
        None => req,
    }
}
