//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for sensitive values like `NAMEWATCH_API_KEY`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream event API endpoint and credentials.
///
/// The API key is loaded from the `NAMEWATCH_API_KEY` env var at runtime
/// (never from the config file).
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the poll API (e.g., `https://api.indexer.example/v1`).
    pub api_url: String,
    /// API key loaded from `NAMEWATCH_API_KEY` env var at runtime.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

/// Ingestion loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Seconds between ingestion cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Maximum events requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Event types to request upstream; empty means all types.
    #[serde(default)]
    pub event_types: Vec<String>,
    /// Only request events from finalized blocks.
    #[serde(default = "default_true")]
    pub finalized_only: bool,
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Per-request delivery timeout in milliseconds.
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

/// Analytics aggregation loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Seconds between aggregation batches.
    #[serde(default = "default_aggregate_interval_secs")]
    pub interval_secs: u64,
    /// Maximum unprocessed events consumed per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path; `:memory:` for an ephemeral store.
    #[serde(default = "default_database_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

fn default_webhook_timeout_ms() -> u64 {
    5_000
}

fn default_aggregate_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> usize {
    200
}

fn default_database_path() -> String {
    "namewatch.db".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

const fn default_true() -> bool {
    true
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            page_size: default_page_size(),
            event_types: Vec::new(),
            finalized_only: true,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_webhook_timeout_ms(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_aggregate_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.upstream.api_key = std::env::var("NAMEWATCH_API_KEY").ok();

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.upstream.api_url.is_empty() {
            return Err(Error::Config(ConfigError::MissingField {
                field: "upstream.api_url",
            }));
        }
        url::Url::parse(&self.upstream.api_url).map_err(|e| {
            Error::Config(ConfigError::InvalidValue {
                field: "upstream.api_url",
                reason: e.to_string(),
            })
        })?;
        if self.poller.page_size == 0 {
            return Err(Error::Config(ConfigError::InvalidValue {
                field: "poller.page_size",
                reason: "must be at least 1".into(),
            }));
        }
        if self.aggregator.batch_size == 0 {
            return Err(Error::Config(ConfigError::InvalidValue {
                field: "aggregator.batch_size",
                reason: "must be at least 1".into(),
            }));
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poller.interval_secs)
    }

    /// Aggregation interval as a [`Duration`].
    #[must_use]
    pub fn aggregate_interval(&self) -> Duration {
        Duration::from_secs(self.aggregator.interval_secs)
    }

    /// Initialize the tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.logging.level.clone()));

        if self.logging.format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
