//! Application configuration (TOML-based).
//!
//! Loaded from `~/.config/entsoe-data-service/config.toml` by default; every
//! field has a sane default so a missing file yields a runnable (if
//! token-less) configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub collector: CollectorSettings,
    pub backfill: BackfillSettings,
    pub monitoring: MonitoringSettings,
    pub scheduler: SchedulerSettings,
    pub metrics: MetricsSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Full connection URL; overrides the individual fields when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "energy_data".to_string(),
        }
    }
}

impl DatabaseSettings {
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub api_url: String,
    pub security_token: String,
    pub request_timeout_seconds: u64,
    /// Bidding zones mirrored by real-time collection (short names).
    pub areas: Vec<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            api_url: "https://web-api.tp.entsoe.eu/api".to_string(),
            security_token: String::new(),
            request_timeout_seconds: 30,
            areas: vec!["DE".to_string(), "FR".to_string(), "NL".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillSettings {
    /// Default lookback for coverage analysis, in years.
    pub historical_years: u32,
    /// Backfill chunk size in months; converted to days × 30 at use.
    pub chunk_months: u32,
    /// Inter-chunk sleep for backfills, in seconds.
    pub rate_limit_delay: f64,
    /// Maximum concurrent backfill operations per process.
    pub max_concurrent_areas: usize,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            historical_years: 2,
            chunk_months: 3,
            rate_limit_delay: 2.0,
            max_concurrent_areas: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub metrics_retention_days: u32,
    pub performance_threshold_ms: f64,
    pub success_rate_threshold: f64,
    pub anomaly_detection_enabled: bool,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            metrics_retention_days: 30,
            performance_threshold_ms: 5000.0,
            success_rate_threshold: 0.95,
            anomaly_detection_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Master gate; when false `start()` refuses to run any jobs.
    pub enabled: bool,
    pub real_time_collection_enabled: bool,
    pub real_time_collection_interval_minutes: u64,
    pub gap_analysis_enabled: bool,
    pub gap_analysis_interval_hours: u64,
    pub daily_backfill_analysis_enabled: bool,
    pub daily_backfill_analysis_hour: u32,
    pub daily_backfill_analysis_minute: u32,
    pub job_health_check_interval_minutes: u64,
    pub use_persistent_job_store: bool,
    pub max_retry_attempts: u32,
    pub retry_backoff_base_seconds: f64,
    pub retry_backoff_max_seconds: f64,
    pub job_defaults_coalesce: bool,
    pub job_defaults_max_instances: u32,
    pub job_defaults_misfire_grace_time_seconds: u64,
    pub failed_job_notification_threshold: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            real_time_collection_enabled: true,
            real_time_collection_interval_minutes: 15,
            gap_analysis_enabled: true,
            gap_analysis_interval_hours: 6,
            daily_backfill_analysis_enabled: true,
            daily_backfill_analysis_hour: 2,
            daily_backfill_analysis_minute: 30,
            job_health_check_interval_minutes: 5,
            use_persistent_job_store: true,
            max_retry_attempts: 3,
            retry_backoff_base_seconds: 60.0,
            retry_backoff_max_seconds: 3600.0,
            job_defaults_coalesce: true,
            job_defaults_max_instances: 1,
            job_defaults_misfire_grace_time_seconds: 300,
            failed_job_notification_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub exporter_enabled: bool,
    pub listen_address: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            exporter_enabled: true,
            listen_address: "0.0.0.0:9184".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `trace`, `debug`, `info`, `warn`, `error`, or any `EnvFilter` directive.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(config)
    }
}

/// Default config file path: `~/.config/entsoe-data-service/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("entsoe-data-service")
        .join("config.toml")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
