//! Application configuration loading for CLI defaults.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Directory name under the config home.
const APP_DIR: &str = "article-retriever";

/// Environment variable consulted for the SerpAPI key.
pub const SERP_API_KEY_ENV: &str = "SERP_API_KEY";

/// `key = value` file configuration for retriever defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default storage root.
    pub output_dir: Option<PathBuf>,
    /// SerpAPI key for Google Scholar searches.
    pub serpapi_key: Option<String>,
    /// Concurrent fetches (1..=16).
    pub concurrency: Option<u8>,
    /// Delay between page requests in milliseconds (0..=60000).
    pub page_delay_ms: Option<u64>,
    /// Attempts per request (1..=10).
    pub max_retries: Option<u8>,
    /// Connect and request timeout in seconds (1..=3600).
    pub request_timeout_secs: Option<u64>,
    /// Recent-search history file.
    pub history_file: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=16).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=16");
        }

        if let Some(page_delay_ms) = self.page_delay_ms
            && page_delay_ms > 60_000
        {
            bail!(
                "Invalid config value for `page_delay_ms`: {page_delay_ms}. Expected range: 0..=60000"
            );
        }

        if let Some(max_retries) = self.max_retries
            && !(1..=10).contains(&max_retries)
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 1..=10");
        }

        if let Some(timeout) = self.request_timeout_secs
            && !(1..=3600).contains(&timeout)
        {
            bail!(
                "Invalid config value for `request_timeout_secs`: {timeout}. Expected range: 1..=3600"
            );
        }

        Ok(())
    }
}

/// Resolves the config path from explicit environment values.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/article-retriever/config.toml`
/// 2. `$HOME/.config/article-retriever/config.toml`
fn config_path_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    if let Some(xdg) = xdg_config_home.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join(APP_DIR).join("config.toml"));
    }
    let home = home.filter(|v| !v.is_empty())?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

/// Resolves the default config path from the environment.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    config_path_from(env::var_os("XDG_CONFIG_HOME"), env::var_os("HOME"))
}

/// Loads config from the default path; a missing file yields defaults.
pub fn load_default_file_config() -> Result<FileConfig> {
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

/// Returns the SerpAPI key from the environment, if set and non-blank.
#[must_use]
pub fn serpapi_key_from_env() -> Option<String> {
    env::var(SERP_API_KEY_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "serpapi_key" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `serpapi_key` value on line {line_no}"))?;
                cfg.serpapi_key = Some(parsed).filter(|k| !k.trim().is_empty());
            }
            "concurrency" => {
                let parsed = parse_integer_u8(value)
                    .with_context(|| format!("Invalid `concurrency` value on line {line_no}"))?;
                cfg.concurrency = Some(parsed);
            }
            "page_delay_ms" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `page_delay_ms` value on line {line_no}"))?;
                cfg.page_delay_ms = Some(parsed);
            }
            "max_retries" => {
                let parsed = parse_integer_u8(value)
                    .with_context(|| format!("Invalid `max_retries` value on line {line_no}"))?;
                cfg.max_retries = Some(parsed);
            }
            "request_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `request_timeout_secs` value on line {line_no}")
                })?;
                cfg.request_timeout_secs = Some(parsed);
            }
            "history_file" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `history_file` value on line {line_no}"))?;
                cfg.history_file = Some(PathBuf::from(parsed));
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
# retriever defaults
output_dir = "/data/papers"
serpapi_key = "abc123"
concurrency = 8
page_delay_ms = 1500
max_retries = 5
request_timeout_secs = 45
history_file = "/data/history.json"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/data/papers")));
        assert_eq!(cfg.serpapi_key.as_deref(), Some("abc123"));
        assert_eq!(cfg.concurrency, Some(8));
        assert_eq!(cfg.page_delay_ms, Some(1500));
        assert_eq!(cfg.max_retries, Some(5));
        assert_eq!(cfg.request_timeout_secs, Some(45));
        assert_eq!(cfg.history_file, Some(PathBuf::from("/data/history.json")));
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str("concurrency = 2").expect("partial config should parse");
        assert_eq!(cfg.concurrency, Some(2));
        assert!(cfg.output_dir.is_none());
        assert!(cfg.serpapi_key.is_none());
    }

    #[test]
    fn test_parse_config_rejects_invalid_concurrency() {
        let err = parse_config_str("concurrency = 17").expect_err("invalid concurrency expected");
        assert!(err.to_string().contains("concurrency"));
        let err = parse_config_str("concurrency = 0").expect_err("invalid concurrency expected");
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_page_delay() {
        let err = parse_config_str("page_delay_ms = 60001").expect_err("invalid delay expected");
        assert!(err.to_string().contains("page_delay_ms"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_retries_and_timeout() {
        let err = parse_config_str("max_retries = 0").expect_err("invalid retries expected");
        assert!(err.to_string().contains("max_retries"));
        let err =
            parse_config_str("request_timeout_secs = 0").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
concurrency = 4 # workers
serpapi_key = "k#1" # hash inside string kept
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.concurrency, Some(4));
        assert_eq!(cfg.serpapi_key.as_deref(), Some("k#1"));
    }

    #[test]
    fn test_parse_config_blank_key_ignored() {
        let cfg = parse_config_str(r#"serpapi_key = " ""#).expect("blank key should parse");
        assert!(cfg.serpapi_key.is_none());
    }

    #[test]
    fn test_parse_config_reports_line_numbers() {
        let err = parse_config_str("concurrency = 4\nthis is not valid")
            .expect_err("syntax error expected");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_strings_and_unknown_keys() {
        let err = parse_config_str("output_dir = /tmp").expect_err("unquoted string");
        assert!(err.to_string().contains("output_dir"));
        let err = parse_config_str("rate_limit = 10").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_config_path_prefers_xdg() {
        let path = config_path_from(Some("/xdg".into()), Some("/home/u".into())).unwrap();
        assert_eq!(path, PathBuf::from("/xdg/article-retriever/config.toml"));
    }

    #[test]
    fn test_config_path_falls_back_to_home() {
        let path = config_path_from(Some(OsString::new()), Some("/home/u".into())).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/home/u/.config/article-retriever/config.toml")
        );
        assert!(config_path_from(None, None).is_none());
    }
}
