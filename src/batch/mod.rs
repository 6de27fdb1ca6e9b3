//! # Batch Engine
//!
//! Splits an arbitrarily large dataset into bounded chunks and applies a
//! caller-supplied [`BatchOperator`] to them, either sequentially on the
//! calling thread or concurrently across a [`WorkerPool`](crate::execution::WorkerPool).
//!
//! ## Data flow
//!
//! caller -> [`partition`] (ordered chunk plan) -> [`batch_operate`] or
//! [`batch_parallel_operate`] -> total success count, or a fault.
//!
//! ## Failure handling
//!
//! - Sequential runs stop at the first chunk fault and return it.
//! - Parallel runs always attempt every chunk. Faults are captured per
//!   chunk and, depending on [`FailurePolicy`], either logged and excluded
//!   from the total or reported together as an `AggregateError`.

pub mod job;
pub mod operator;
pub mod parallel;
pub mod partition;
pub mod sequential;

pub use job::JobState;
pub use operator::{BatchOperator, ListBatchOperator, MapBatchOperator};
pub use parallel::{batch_parallel_operate, batch_parallel_operate_default, FailurePolicy};
pub use partition::{partition, partition_count, Partition};
pub use sequential::batch_operate;
