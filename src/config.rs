use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::FlushPolicy;
use crate::graph::RDFS_LABEL;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
}

/// Remote query endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// SPARQL endpoint URL, e.g. `https://dbpedia.org/sparql`
    pub url: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_describe_limit")]
    pub describe_limit: usize,
    /// Time box for a single describe call
    #[serde(default = "default_describe_timeout_ms")]
    pub describe_timeout_ms: u64,
    /// Overall HTTP transport timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Graph cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Number of graphs kept in the hot (LRU) tier
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
    #[serde(default)]
    pub flush_policy: FlushPolicy,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Entries older than this are re-fetched. Unset = never expire.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// Crawler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Upper bound on in-flight describe calls across a whole crawl
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_depth")]
    pub default_depth: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_label_predicate")]
    pub label_predicate: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_limit() -> usize {
    100
}

fn default_describe_limit() -> usize {
    10_000
}

fn default_describe_timeout_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("graph-cache.json")
}

fn default_memory_capacity() -> usize {
    1000
}

fn default_flush_interval_secs() -> u64 {
    30
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_depth() -> usize {
    1
}

fn default_limit() -> usize {
    100
}

fn default_label_predicate() -> String {
    RDFS_LABEL.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl EndpointConfig {
    /// Endpoint config with default limits and timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            search_limit: default_search_limit(),
            describe_limit: default_describe_limit(),
            describe_timeout_ms: default_describe_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn describe_timeout(&self) -> Duration {
        Duration::from_millis(self.describe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            memory_capacity: default_memory_capacity(),
            flush_policy: FlushPolicy::default(),
            flush_interval_secs: default_flush_interval_secs(),
            ttl_secs: None,
        }
    }
}

impl CacheConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            default_depth: default_depth(),
            default_limit: default_limit(),
            label_predicate: default_label_predicate(),
            language: default_language(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in KGCRAWL_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KGCRAWL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_file(&config_path)
    }

    /// Load and validate a specific config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint.url)
            .with_context(|| format!("endpoint.url is not a valid URL: {}", self.endpoint.url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("endpoint.url must use http or https, got {}", url.scheme());
        }

        if self.endpoint.search_limit == 0 {
            anyhow::bail!("endpoint.search_limit must be greater than 0");
        }

        if self.endpoint.describe_limit == 0 {
            anyhow::bail!("endpoint.describe_limit must be greater than 0");
        }

        if self.endpoint.describe_timeout_ms == 0 {
            anyhow::bail!("endpoint.describe_timeout_ms must be greater than 0");
        }

        if self.endpoint.describe_timeout() > self.endpoint.request_timeout() {
            anyhow::bail!(
                "endpoint.describe_timeout_ms must not exceed endpoint.request_timeout_secs"
            );
        }

        if self.cache.memory_capacity == 0 {
            anyhow::bail!("cache.memory_capacity must be greater than 0");
        }

        if self.cache.flush_policy == FlushPolicy::Interval && self.cache.flush_interval_secs == 0 {
            anyhow::bail!("cache.flush_interval_secs must be greater than 0 for the interval policy");
        }

        if self.crawler.max_concurrent_fetches == 0 {
            anyhow::bail!("crawler.max_concurrent_fetches must be greater than 0");
        }

        if self.crawler.default_depth == 0 || self.crawler.default_limit == 0 {
            anyhow::bail!("crawler.default_depth and crawler.default_limit must be at least 1");
        }

        if self.crawler.language.trim().is_empty() {
            anyhow::bail!("crawler.language cannot be empty");
        }

        Ok(())
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache.path
    }
}
