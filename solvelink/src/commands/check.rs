use anyhow::{bail, Result};
use solvelink_core::config::TransportConfig;
use solvelink_discovery::{Connection, ConnectionStatus};

pub async fn run(urls: &[String]) -> Result<()> {
    let urls = super::resolve_urls(urls)?;
    let cfg = TransportConfig::from_env();
    let mut unreachable = 0;

    for url in &urls {
        let status = match Connection::open(url, &cfg).await {
            Ok(conn) => {
                let status = conn.check(cfg.check_timeout).await;
                conn.close().await;
                status
            }
            Err(e) => ConnectionStatus::Unreachable(e.to_string()),
        };
        match status {
            ConnectionStatus::Connected(info) => {
                let version = info.version.map(|v| format!(" {}", v)).unwrap_or_default();
                println!("✓ {}  {}{}", url, info.name, version);
                if let Some(desc) = info.description {
                    println!("    {}", desc);
                }
            }
            ConnectionStatus::Unreachable(reason) => {
                unreachable += 1;
                println!("✗ {}  {}", url, reason);
            }
            ConnectionStatus::Unknown => println!("? {}", url),
        }
    }

    if unreachable > 0 {
        bail!("{} of {} connection(s) unreachable", unreachable, urls.len());
    }
    Ok(())
}
