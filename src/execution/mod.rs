//! Worker threads used by the parallel executor.

pub mod thread_factory;
pub mod worker_pool;

pub use thread_factory::NamedThreadFactory;
pub use worker_pool::{PoolStats, WorkerPool};
