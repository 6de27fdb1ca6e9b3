//! Configuration Loader
//!
//! Layers built-in defaults, an optional TOML file and `BATCHER__`-prefixed
//! environment variables (e.g. `BATCHER__WORKER_POOL__WORKER_COUNT=8`), then
//! validates the merged result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::BatcherConfig;

/// File consulted by `ConfigManager::load` when present
pub const DEFAULT_CONFIG_FILE: &str = "config/batcher.toml";

pub const ENV_PREFIX: &str = "BATCHER";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: BatcherConfig,
    config_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load defaults, `config/batcher.toml` if it exists, and the process environment
    pub fn load() -> ConfigResult<ConfigManager> {
        let default_file = PathBuf::from(DEFAULT_CONFIG_FILE);
        let file = default_file.is_file().then_some(default_file);
        Self::load_from_sources(file.as_deref(), None)
    }

    /// Load a specific TOML file (which must exist) plus the process environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<ConfigManager> {
        Self::load_from_sources(Some(path.as_ref()), None)
    }

    /// Load from explicit sources.
    ///
    /// `env` replaces the process environment when given, which keeps tests
    /// independent of global state.
    pub fn load_from_sources(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> ConfigResult<ConfigManager> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            if !path.is_file() {
                return Err(ConfigurationError::config_file_not_found(path));
            }
            debug!(path = %path.display(), "Adding configuration file source");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let source_name = file
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "environment".to_string());
        let merged = builder
            .build()
            .map_err(|e| ConfigurationError::load_error(source_name, e))?;
        let config: BatcherConfig = merged
            .try_deserialize()
            .map_err(ConfigurationError::deserialization_error)?;

        config.validate()?;

        info!(
            config_file = ?file.map(Path::display).map(|d| d.to_string()),
            batch_size = config.batch.batch_size,
            on_failure = ?config.batch.on_failure,
            worker_count = config.worker_pool.worker_count,
            "Configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            config_file: file.map(Path::to_path_buf),
        })
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(config: BatcherConfig) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            config_file: None,
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Configuration rendered as JSON for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }
}
