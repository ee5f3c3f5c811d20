//! Configuration structs grouped by concern, loaded from the environment.

use std::time::Duration;

use super::env_keys::{
    connections as conn_keys, display as display_keys, observability as obv_keys,
    transport as transport_keys,
};
use super::loader::{env_bool, env_optional, env_or, env_parse};

/// Backend endpoints registered at startup.
#[derive(Debug, Clone, Default)]
pub struct ConnectionsConfig {
    /// Backend URLs in priority order (first match wins in federated search).
    pub urls: Vec<String>,
}

impl ConnectionsConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let urls = env_optional(conn_keys::SOLVELINK_CONNECTIONS, conn_keys::CONNECTIONS_ALIASES)
            .map(|raw| parse_url_list(&raw))
            .unwrap_or_default();
        Self { urls }
    }
}

/// Split a comma/whitespace separated URL list, dropping blanks and duplicates
/// while keeping the first occurrence's position.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// Transport timeouts and limits.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for a single request/response call.
    pub call_timeout: Duration,
    /// Timeout for `checkConnection` liveness probes.
    pub check_timeout: Duration,
    /// Largest response line a stream transport reads. A longer one fails
    /// its own call; the stream stays usable.
    pub max_frame_bytes: usize,
}

const MIB: usize = 1024 * 1024;

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(300),
            check_timeout: Duration::from_secs(5),
            max_frame_bytes: 256 * MIB,
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let defaults = Self::default();
        Self {
            call_timeout: Duration::from_secs(env_parse(
                transport_keys::SOLVELINK_CALL_TIMEOUT_SECS,
                &[],
                defaults.call_timeout.as_secs(),
            )),
            check_timeout: Duration::from_secs(env_parse(
                transport_keys::SOLVELINK_CHECK_TIMEOUT_SECS,
                &[],
                defaults.check_timeout.as_secs(),
            )),
            max_frame_bytes: env_parse(
                transport_keys::SOLVELINK_MAX_FRAME_MB,
                &[],
                defaults.max_frame_bytes / MIB,
            )
            .saturating_mul(MIB),
        }
    }
}

/// How queries and traces are rendered for humans.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Strings longer than this many characters are redacted.
    pub redact_limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { redact_limit: 64 }
    }
}

impl DisplayConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            redact_limit: env_parse(
                display_keys::SOLVELINK_REDACT_LIMIT,
                &[],
                Self::default().redact_limit,
            ),
        }
    }
}

/// Observability: quiet, log_level, log_json.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::SOLVELINK_QUIET, obv_keys::QUIET_ALIASES, false),
                log_level: env_or(
                    obv_keys::SOLVELINK_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || "solvelink=info".to_string(),
                ),
                log_json: env_bool(obv_keys::SOLVELINK_LOG_JSON, obv_keys::LOG_JSON_ALIASES, false),
            }
        })
    }
}
