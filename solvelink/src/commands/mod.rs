//! Command handlers. Each returns `anyhow::Result` and writes its output to
//! stdout; logs go to stderr.

pub mod call;
pub mod check;
pub mod features;
pub mod find;
pub mod solve;
pub mod trace;

use anyhow::{bail, Result};
use solvelink_core::config::{ConnectionsConfig, TransportConfig};
use solvelink_discovery::ConnectionStore;

use crate::cli::{Commands, ConnectionArgs};

pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Check { urls } => check::run(&urls).await,
        Commands::Features { connections, json } => features::run(&connections, json).await,
        Commands::Find(cmd) => find::run(&cmd).await,
        Commands::Solve(cmd) => solve::run(&cmd).await,
        Commands::Trace(cmd) => trace::run(&cmd),
        Commands::Call {
            url,
            method,
            params,
            full,
        } => call::run(&url, &method, params.as_deref(), full).await,
    }
}

/// URLs from the command line, else from `SOLVELINK_CONNECTIONS`.
pub(crate) fn resolve_urls(explicit: &[String]) -> Result<Vec<String>> {
    let urls = if explicit.is_empty() {
        ConnectionsConfig::from_env().urls
    } else {
        explicit.to_vec()
    };
    if urls.is_empty() {
        bail!("No connections: pass --connection URL or set SOLVELINK_CONNECTIONS");
    }
    Ok(urls)
}

/// Open every resolved connection. Unusable URLs are logged and skipped; it
/// is an error only if none opens.
pub(crate) async fn open_store(args: &ConnectionArgs, cfg: &TransportConfig) -> Result<ConnectionStore> {
    let urls = resolve_urls(&args.urls)?;
    let (store, failures) = ConnectionStore::open_all(&urls, cfg).await;
    if store.is_empty() {
        let reasons: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
        bail!("No connection could be opened:\n  {}", reasons.join("\n  "));
    }
    Ok(store)
}
