//! Environment variable loading.
//!
//! Fallback chains are kept here so callers never repeat `or_else` ladders.

use std::env;
use std::path::Path;

/// Load `.env` from the current directory into the process environment.
/// Existing variables are never overwritten. Runs once per process.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        load_dotenv_from_dir(&dir);
    });
}

/// Load `<dir>/.env` into the process environment (no overwrite).
pub fn load_dotenv_from_dir(dir: &Path) {
    let path = dir.join(".env");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return;
    };
    let mut loaded = 0usize;
    for line in content.lines() {
        if let Some((key, value)) = parse_dotenv_line(line) {
            if env::var(key).is_err() {
                env::set_var(key, value);
                loaded += 1;
            }
        }
    }
    tracing::debug!(path = %path.display(), loaded, "Loaded .env");
}

/// Parse one `.env` line into `(key, value)`.
///
/// Blank lines and `#` comments yield `None`. Inline comments are stripped
/// unless the value is quoted; surrounding quotes are removed.
fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let mut value = value.trim();
    if let Some(hash_pos) = value.find('#') {
        let before_hash = value[..hash_pos].trim_end();
        if !before_hash.contains('"') && !before_hash.contains('\'') {
            value = before_hash;
        }
    }
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }
    Some((key, value))
}

/// Read the primary variable or the first set alias, falling back to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Read the primary variable or an alias; empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// Parse a boolean variable: 0/false/no/off are false, anything else is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()));
    match v.as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
pub fn env_parse<T: std::str::FromStr>(primary: &str, aliases: &[&str], default: T) -> T {
    match env_optional(primary, aliases) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key = primary, value = %raw, "Ignoring unparsable value");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_line_plain() {
        assert_eq!(parse_dotenv_line("A=1"), Some(("A", "1")));
        assert_eq!(parse_dotenv_line("  export B = two "), Some(("B", "two")));
    }

    #[test]
    fn test_parse_dotenv_line_comments_and_quotes() {
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line(""), None);
        assert_eq!(parse_dotenv_line("C=value # trailing"), Some(("C", "value")));
        assert_eq!(parse_dotenv_line("D=\"a # b\""), Some(("D", "a # b")));
        assert_eq!(parse_dotenv_line("E='x'"), Some(("E", "x")));
        assert_eq!(parse_dotenv_line("=nokey"), None);
    }

    #[test]
    fn test_env_or_alias_chain() {
        env::set_var("SOLVELINK_TEST_LOADER_ALIAS", "from-alias");
        let v = env_or(
            "SOLVELINK_TEST_LOADER_PRIMARY_UNSET",
            &["SOLVELINK_TEST_LOADER_ALIAS"],
            || "default".to_string(),
        );
        assert_eq!(v, "from-alias");
        let d = env_or("SOLVELINK_TEST_LOADER_NOPE", &[], || "default".to_string());
        assert_eq!(d, "default");
    }

    #[test]
    fn test_env_bool_and_parse() {
        env::set_var("SOLVELINK_TEST_LOADER_BOOL", "off");
        assert!(!env_bool("SOLVELINK_TEST_LOADER_BOOL", &[], true));
        assert!(env_bool("SOLVELINK_TEST_LOADER_BOOL_UNSET", &[], true));
        env::set_var("SOLVELINK_TEST_LOADER_NUM", "42");
        assert_eq!(env_parse("SOLVELINK_TEST_LOADER_NUM", &[], 7u64), 42);
        env::set_var("SOLVELINK_TEST_LOADER_BADNUM", "x");
        assert_eq!(env_parse("SOLVELINK_TEST_LOADER_BADNUM", &[], 7u64), 7);
    }

    #[test]
    fn test_load_dotenv_from_dir_no_overwrite() {
        let td = tempfile::tempdir().unwrap();
        std::fs::write(
            td.path().join(".env"),
            "SOLVELINK_TEST_DOTENV_NEW=fresh\nSOLVELINK_TEST_DOTENV_SET=from-file\n",
        )
        .unwrap();
        env::set_var("SOLVELINK_TEST_DOTENV_SET", "kept");
        load_dotenv_from_dir(td.path());
        assert_eq!(env::var("SOLVELINK_TEST_DOTENV_NEW").unwrap(), "fresh");
        assert_eq!(env::var("SOLVELINK_TEST_DOTENV_SET").unwrap(), "kept");
    }
}
