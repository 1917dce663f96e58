//! TOML configuration for the access layer, provider transport, and logging.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use crate::data::cache::WritePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundlabConfig {
    pub cache: CacheConfig,
    pub provider: ProviderConfig,
    pub logging: LoggingSection,
}

/// Cache-aside behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How a fresh fetch is written over an existing entry.
    pub write_policy: WritePolicy,

    /// Apply the window filter, sort, and limit to freshly fetched data, the
    /// same as on a cache hit.
    pub normalize_fetched: bool,

    /// Snapshot file loaded on start and saved on exit (CLI only).
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::Replace,
            normalize_fetched: true,
            snapshot_path: None,
        }
    }
}

/// Upstream transport settings for the Yahoo provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub user_agent: String,
    pub chart_base_url: String,
    pub summary_base_url: String,
    /// Host of the v1 search API (news).
    pub search_base_url: String,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            chart_base_url: "https://query2.finance.yahoo.com".into(),
            summary_base_url: "https://query2.finance.yahoo.com".into(),
            search_base_url: "https://query2.finance.yahoo.com".into(),
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl FundlabConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` when given, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.provider;
        if p.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider.timeout_secs must be greater than zero".into(),
            ));
        }
        if p.breaker_failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "provider.breaker_failure_threshold must be greater than zero".into(),
            ));
        }
        if [&p.chart_base_url, &p.summary_base_url, &p.search_base_url]
            .iter()
            .any(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "provider base URLs must not be empty".into(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must not be empty".into()));
        }
        Ok(())
    }
}
