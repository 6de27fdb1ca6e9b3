//! # Batch Engine Configuration
//!
//! Typed configuration for batch sizing, the failure policy and the worker
//! pool. Every section has defaults, so an empty source set yields a valid
//! configuration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batcher_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Defaults, then config/batcher.toml if present, then BATCHER__* variables
//! let manager = ConfigManager::load()?;
//!
//! let batch_size = manager.config().batch.batch_size;
//! let workers = manager.config().worker_pool.worker_count;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::batch::FailurePolicy;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Default maximum chunk size
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Worker count of the shared default pool
pub const DEFAULT_WORKER_COUNT: usize = 24;

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "batch";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Chunking and failure handling
    pub batch: BatchConfig,

    /// Worker pool sizing
    pub worker_pool: WorkerPoolConfig,
}

impl BatcherConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.batch.validate()?;
        self.worker_pool.validate()?;
        Ok(())
    }
}

/// Chunking configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of elements per chunk
    pub batch_size: usize,
    /// What a parallel run does with chunk faults once every chunk has run
    pub on_failure: FailurePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            on_failure: FailurePolicy::Ignore,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "batch.batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub worker_count: usize,
    pub thread_name_prefix: String,
    /// Maximum tasks submitted but not yet finished; `None` for no limit
    pub queue_capacity: Option<usize>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            queue_capacity: None,
        }
    }
}

impl WorkerPoolConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.worker_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "worker_pool.worker_count",
                "0",
                "worker count must be greater than 0",
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "worker_pool.thread_name_prefix",
                self.thread_name_prefix.clone(),
                "thread name prefix must not be blank",
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "worker_pool.queue_capacity",
                "0",
                "queue capacity must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}
