use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheConfig,
    pub executor: ExecutorConfig,
    pub pipeline: PipelineDefaults,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,
    pub memory_limit_mb: usize,
    /// Default time-to-live applied when `put` is called without one (0 = never expire)
    pub default_ttl_ms: u64,
    /// Interval of the background expiration + memory sweep
    pub cleanup_interval_ms: u64,
    /// Share of `max_size` evicted when the entry count overflows
    pub size_eviction_ratio: f64,
    /// Share of current entries evicted when the memory limit is exceeded
    pub memory_eviction_ratio: f64,
    pub channel_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            memory_limit_mb: 512,
            default_ttl_ms: 300_000,
            cleanup_interval_ms: 60_000,
            size_eviction_ratio: 0.10,
            memory_eviction_ratio: 0.20,
            channel_capacity: 1024,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_ms > 0).then(|| Duration::from_millis(self.default_ttl_ms))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }

    pub fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub batch_size: usize,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    pub chunk_size: usize,
    pub max_memory_mb: usize,
    pub timeout_ms: u64,
    pub enable_caching: bool,
    pub enable_monitoring: bool,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            max_memory_mb: 512,
            timeout_ms: 300_000,
            enable_caching: true,
            enable_monitoring: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub history_retention_secs: u64,
    pub thresholds: AlertThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_retention_secs: 3600,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl MonitorConfig {
    pub fn history_retention(&self) -> Duration {
        Duration::from_secs(self.history_retention_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub memory_mb: f64,
    pub query_time_ms: f64,
    pub error_rate: f64,
    pub cache_hit_ratio: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            memory_mb: 1000.0,
            query_time_ms: 5000.0,
            error_rate: 0.05,
            cache_hit_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            stdout_level: "info".to_string(),
            file_level: "debug".to_string(),
        }
    }
}

use std::env;

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("SNEL_LOADER_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .add_source(config::Environment::with_prefix("SNEL_LOADER").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
