//! Configuration schema for cpt

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Environment variable holding the connection string
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Main cpt configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CptConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Connection string, `postgres://...` or `sqlite:...`
    #[serde(default)]
    pub url: Option<String>,

    /// Pool size; commands issue statements one at a time
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a connection before giving up
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "compact", "pretty", "json"
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl CptConfig {
    /// Merge another configuration into this one
    ///
    /// Sections are replaced wholesale, except that a configured URL is
    /// never cleared by a layer that does not set one.
    pub fn merge(&mut self, other: CptConfig) {
        let url = other.database.url.or_else(|| self.database.url.take());
        self.database = DatabaseConfig { url, ..other.database };
        self.logging = other.logging;
    }

    /// Apply environment overrides; `DATABASE_URL` always wins
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty()) {
            self.database.url = Some(url);
        }

        if let Some(url) = self.database.url.take() {
            self.database.url = Some(expand_env_vars(&url, &lookup));
        }
    }
}

/// Expand every `${VAR}` reference; unknown variables are left as written
pub fn expand_env_vars<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    static VAR: OnceLock<Regex> = OnceLock::new();
    let pattern = VAR.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern")
    });

    pattern
        .replace_all(value, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
