//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `idlewatch.toml` in the working directory (or the path in
//! `IDLEWATCH_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::path::PathBuf;

use idlewatch_domain::monitoring::MonitoringConfig;
use serde::Deserialize;

const DEFAULT_PATH: &str = "idlewatch.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub activity_log: ActivityLogConfig,
    pub runtime: RuntimeConfig,
    /// The session started at launch.
    pub monitor: MonitoringConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Activity log sizing and persistence.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActivityLogConfig {
    /// Maximum number of entries kept in memory.
    pub capacity: usize,
    /// JSON file the log is persisted to.
    pub path: PathBuf,
    /// Entries older than this many days are dropped at startup; 0 keeps all.
    pub retention_days: u32,
}

/// Daemon behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Record actions instead of performing them.
    pub dry_run: bool,
    /// Consecutive failed ticks before the session errors.
    pub max_consecutive_failures: u32,
    /// Resume an errored session after this many seconds; 0 waits for the
    /// operator.
    pub auto_resume_seconds: u64,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// resulting values are invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("IDLEWATCH_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("IDLEWATCH_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("IDLEWATCH_DRY_RUN") {
            self.runtime.dry_run = matches!(val.trim(), "1" | "true" | "yes" | "on");
        }
        if let Ok(val) = std::env::var("IDLEWATCH_ACTION") {
            self.monitor.action = val;
        }
        if let Ok(val) = std::env::var("IDLEWATCH_LOG_PATH") {
            self.activity_log.path = PathBuf::from(val);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.activity_log.capacity == 0 {
            return Err(ConfigError::Validation(
                "activity_log.capacity must be non-zero".to_string(),
            ));
        }
        if self.runtime.max_consecutive_failures == 0 {
            return Err(ConfigError::Validation(
                "runtime.max_consecutive_failures must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "idlewatchd=info,idlewatch=info".to_string(),
        }
    }
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            path: PathBuf::from("idlewatch-activity.json"),
            retention_days: 30,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_consecutive_failures: 3,
            auto_resume_seconds: 0,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
