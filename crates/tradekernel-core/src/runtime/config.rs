//! Runtime Configuration
//!
//! Configuration for the host-side runtime, supporting:
//! - Programmatic configuration via builders
//! - Environment variable overrides
//! - File-based configuration (TOML/JSON)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker thread count (0 = one per core)
    pub worker_threads: usize,
    /// Host-side deadline for one analysis run in seconds (0 = none)
    pub run_timeout_secs: u64,
    /// Enable structured JSON logging
    pub structured_logging: bool,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl RuntimeConfig {
    /// Development configuration - verbose logging, no deadline
    pub fn development() -> Self {
        Self {
            worker_threads: 0,
            run_timeout_secs: 0,
            structured_logging: false,
            log_level: "debug".to_string(),
        }
    }

    /// Production configuration - structured logging, 60s deadline
    pub fn production() -> Self {
        Self {
            worker_threads: 0,
            run_timeout_secs: 60,
            structured_logging: true,
            log_level: "info".to_string(),
        }
    }

    /// Testing configuration - single worker
    pub fn testing() -> Self {
        Self {
            worker_threads: 1,
            run_timeout_secs: 0,
            structured_logging: false,
            log_level: "trace".to_string(),
        }
    }

    /// Deadline for one run, if any.
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `TRADEKERNEL_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("TRADEKERNEL_WORKER_THREADS") {
            self.worker_threads = val.parse().unwrap_or(self.worker_threads);
        }
        if let Ok(val) = std::env::var("TRADEKERNEL_RUN_TIMEOUT_SECS") {
            self.run_timeout_secs = val.parse().unwrap_or(self.run_timeout_secs);
        }
        if let Ok(val) = std::env::var("TRADEKERNEL_LOG_LEVEL") {
            self.log_level = val;
        }
        if let Ok(val) = std::env::var("TRADEKERNEL_STRUCTURED_LOGGING") {
            self.structured_logging = val.parse().unwrap_or(self.structured_logging);
        }
        self
    }

    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let config: Self = match ext {
            "json" => serde_json::from_str(&contents).map_err(ConfigError::JsonError)?,
            "toml" => toml::from_str(&contents).map_err(ConfigError::TomlError)?,
            _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a builder for this configuration
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "log_level must be one of {LEVELS:?}, got {}",
                self.log_level
            )));
        }
        if self.worker_threads > 1024 {
            return Err(ConfigError::InvalidValue(
                "worker_threads must be <= 1024".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for RuntimeConfig
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    /// Create builder with development defaults
    pub fn development() -> Self {
        Self {
            config: RuntimeConfig::development(),
        }
    }

    /// Create builder with production defaults
    pub fn production() -> Self {
        Self {
            config: RuntimeConfig::production(),
        }
    }

    /// Set worker thread count
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set run deadline
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.config.run_timeout_secs = timeout.as_secs();
        self
    }

    /// Enable structured logging
    pub fn structured_logging(mut self, enabled: bool) -> Self {
        self.config.structured_logging = enabled;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RuntimeConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Unsupported config format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Invalid configuration value
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for crate::error::KernelError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidValue(msg) => crate::error::KernelError::InvalidConfiguration(msg),
            other => crate::error::KernelError::ConfigError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(RuntimeConfig::default().worker_threads, 0);
        assert!(RuntimeConfig::production().structured_logging);
        assert_eq!(
            RuntimeConfig::production().run_timeout(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(RuntimeConfig::testing().worker_threads, 1);
        assert_eq!(RuntimeConfig::development().run_timeout(), None);
    }

    #[test]
    fn test_config_validation() {
        let config = RuntimeConfig {
            log_level: "loud".to_string(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(RuntimeConfig::production().validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RuntimeConfigBuilder::production()
            .worker_threads(4)
            .log_level("warn")
            .build()
            .unwrap();

        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_from_file_toml() {
        let dir = std::env::temp_dir().join(format!("tk-runtime-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("runtime.toml");
        std::fs::write(&path, "worker_threads = 2\nlog_level = \"info\"\n").unwrap();

        let config = RuntimeConfig::from_file(&path).unwrap();
        assert_eq!(config.worker_threads, 2);
        assert!(!config.structured_logging);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_error_maps_to_kernel_error() {
        let err: crate::error::KernelError = ConfigError::InvalidValue("x".into()).into();
        assert!(err.is_caller_error());
    }
}
