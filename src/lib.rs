#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batcher Core
//!
//! Batch partitioning and execution engine.
//!
//! ## Overview
//!
//! Callers describe a dataset through a [`BatchOperator`]: how big it is, how
//! to cut a contiguous slice out of it, and what to do with one slice. The
//! engine splits the dataset into ordered chunks of at most `max_chunk`
//! elements and runs the operator over every chunk, summing the success
//! counts it reports.
//!
//! Two executors are provided:
//!
//! - [`batch_operate`] walks the chunks in order on the calling thread and
//!   stops at the first fault.
//! - [`batch_parallel_operate`] submits one job per chunk to a
//!   [`WorkerPool`], waits for all of them, then applies a [`FailurePolicy`]
//!   to whatever faults were captured.
//!
//! ## Module Organization
//!
//! - [`batch`] - Operators, partitioning and both executors
//! - [`execution`] - Worker pool and named thread factory
//! - [`cache`] - Concurrent LRU cache
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Structured error handling
//! - [`logging`] - `tracing` subscriber setup
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use batcher_core::{batch_operate, batch_parallel_operate, FailurePolicy, WorkerPool};
//! use batcher_core::batch::ListBatchOperator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let operator = ListBatchOperator::new((0..1000).collect::<Vec<u32>>(), |chunk: &Vec<u32>| {
//!     Ok::<u64, std::io::Error>(chunk.len() as u64)
//! });
//!
//! assert_eq!(batch_operate(&operator, 100)?, 1000);
//!
//! let pool = WorkerPool::with_workers(4)?;
//! let total = batch_parallel_operate(Arc::new(operator), 100, &pool, FailurePolicy::Ignore)?;
//! assert_eq!(total, 1000);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;

pub use batch::{
    batch_operate, batch_parallel_operate, batch_parallel_operate_default, partition,
    BatchOperator, FailurePolicy, Partition,
};
pub use cache::ConcurrentLruCache;
pub use config::{BatcherConfig, ConfigManager};
pub use error::{AggregateError, BatchError, BatchResult, OperationFault};
pub use execution::WorkerPool;
