//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate.
//! Handles environment detection, optional TOML discovery and env-var overrides.

use super::error::{ConfigResult, ConfigurationError};
use super::BenchConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded configuration plus the context it was resolved in
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: BenchConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    ///
    /// Reads `.env` first so `DATABASE_URL` and `BENCH__*` can live there.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let _ = dotenvy::dotenv();
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(None, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_layers(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            bind_address = %config.server.bind_address,
            max_connections = config.database.max_connections,
            log_sink = ?config.logs.sink,
            worker_enabled = config.worker.enabled,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedding)
    pub fn from_config(config: BenchConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    fn load_layers(config_directory: &Path, environment: &str) -> ConfigResult<BenchConfig> {
        let load_error = |error: config::ConfigError| ConfigurationError::LoadError {
            environment: environment.to_string(),
            error: error.to_string(),
        };

        let defaults = Config::try_from(&BenchConfig::default()).map_err(load_error)?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::from(config_directory.join("default.toml")).required(false))
            .add_source(
                File::from(config_directory.join(format!("{environment}.toml"))).required(false),
            )
            .add_source(
                Environment::with_prefix("BENCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder
                .set_override("database.url", database_url)
                .map_err(load_error)?;
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize::<BenchConfig>())
            .map_err(load_error)
    }

    /// Detect the deployment environment from environment variables
    pub fn detect_environment() -> String {
        env::var("BENCH_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    pub fn is_test(&self) -> bool {
        self.environment == "test"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogSinkKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "staging")
                .unwrap();
        assert_eq!(manager.environment(), "staging");
        assert_eq!(manager.config().server.request_timeout_ms, 30_000);
        assert_eq!(manager.config().logs.sink, LogSinkKind::Tracing);
    }

    #[test]
    fn test_environment_file_overrides_default_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[worker]\npoll_interval_seconds = 3\n[logs]\nqueue_name = \"base_logs\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("qa.toml"),
            "[worker]\npoll_interval_seconds = 1\n[logs]\nsink = \"disabled\"\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "qa")
                .unwrap();
        let config = manager.config();
        assert_eq!(config.worker.poll_interval_seconds, 1);
        assert_eq!(config.logs.queue_name, "base_logs");
        assert_eq!(config.logs.sink, LogSinkKind::Disabled);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.toml"), "[database]\nmax_connections = 0\n").unwrap();
        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "broken");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = BenchConfig::default();
        assert!(ConfigManager::from_config(config.clone(), "test").unwrap().is_test());
        config.auth.jwt_secret.clear();
        assert!(ConfigManager::from_config(config, "test").is_err());
    }
}
