use anyhow::{Context, Result};
use serde_json::Value;
use solvelink_core::config::{DisplayConfig, TransportConfig};
use solvelink_core::tree::redact_value;
use solvelink_discovery::Connection;

pub async fn run(url: &str, method: &str, params: Option<&str>, full: bool) -> Result<()> {
    let params: Value = match params {
        Some(raw) => serde_json::from_str(raw).context("PARAMS_JSON is not valid JSON")?,
        None => Value::Null,
    };
    let conn = Connection::open(url, &TransportConfig::from_env()).await?;
    let result = conn.call_raw(method, params).await;
    conn.close().await;
    let result = result.with_context(|| format!("{} on {}", method, url))?;

    let shown = if full {
        result
    } else {
        redact_value(&result, DisplayConfig::from_env().redact_limit)
    };
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}
