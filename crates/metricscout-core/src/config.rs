//! Configuration management for MetricScout

use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Telemetry backend configuration
    pub backend: BackendConfig,

    /// Retry configuration for outbound backend calls
    pub retry: RetryConfig,

    /// Candidate probing configuration
    pub probe: ProbeConfig,

    /// Cache configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Telemetry backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend API
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Application key (required by some backend endpoints)
    pub app_key: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.datadoghq.com".to_string(),
            api_key: String::new(),
            app_key: String::new(),
            timeout_seconds: 30,
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt
    pub max_retries: u32,
    /// Base delay in milliseconds, doubled on each attempt
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Candidate probing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Maximum candidate queries in flight at once
    pub concurrency: usize,
    /// Default probe window in seconds when the caller supplies none
    pub default_window_seconds: i64,
    /// Maximum fallback-search candidates fed to the prober
    pub fallback_candidate_cap: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            default_window_seconds: 3600,
            fallback_candidate_cap: 50,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Discovery cache TTL in seconds
    pub discovery_ttl_seconds: u64,
    /// Discovery cache capacity (entries)
    pub discovery_capacity: usize,
    /// Result cache capacity (entries)
    pub result_capacity: usize,
    /// Sweep interval for expired entries, in seconds
    pub sweep_interval_seconds: u64,
    /// Optional TTL for caching failed discoveries; `None` re-probes
    /// uninstrumented services on every call
    pub negative_ttl_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            discovery_ttl_seconds: 3600,
            discovery_capacity: 256,
            result_capacity: 512,
            sweep_interval_seconds: 60,
            negative_ttl_seconds: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Build a config from defaults plus environment overrides for secrets
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("METRICSCOUT_BASE_URL") {
            config.backend.base_url = url;
        }
        if let Ok(key) = std::env::var("METRICSCOUT_API_KEY") {
            config.backend.api_key = key;
        }
        if let Ok(key) = std::env::var("METRICSCOUT_APP_KEY") {
            config.backend.app_key = key;
        }
        config
    }
}
