//! # Parallel Executor
//!
//! Materializes one job per partition, submits every job to a worker pool,
//! waits on a completion barrier and then resolves the aggregate result
//! according to the configured failure policy.
//!
//! Every job always runs to completion: faults are captured per job at the
//! worker boundary and only inspected after the barrier releases, so a
//! failing chunk never prevents the others from being attempted. There is
//! no timeout or cancellation; a `process` call that never returns blocks
//! the barrier indefinitely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam::sync::WaitGroup;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::batch::job::{Job, JobState};
use crate::batch::operator::BatchOperator;
use crate::batch::partition::{partition, Partition};
use crate::batch::sequential::process_whole;
use crate::error::{AggregateError, BatchResult, OperationFault};
use crate::execution::WorkerPool;

/// What a parallel run does with chunk faults once every chunk has run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log each fault as a warning and return the count of the successful chunks
    #[default]
    Ignore,
    /// Report the faults as a single `AggregateError`
    Propagate,
}

/// Process the operator's dataset in chunks of at most `max_chunk` elements
/// across `pool`.
///
/// A dataset that fits in one chunk is processed synchronously on the
/// calling thread and an empty dataset returns `0`; neither touches the pool.
/// Completion order of chunks is unspecified.
pub fn batch_parallel_operate<O>(
    operator: Arc<O>,
    max_chunk: usize,
    pool: &WorkerPool,
    on_failure: FailurePolicy,
) -> BatchResult<u64>
where
    O: BatchOperator + Send + Sync + 'static,
    O::Data: Send + Sync + 'static,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("batch_run", %run_id, max_chunk, ?on_failure);
    let _entered = span.enter();

    let data = operator.original_data();
    let size = operator.size(data);
    let partitions = partition(size, max_chunk)?;

    match partitions.as_slice() {
        [] => {
            debug!("Empty dataset, nothing to process");
            Ok(0)
        }
        [whole] => {
            debug!(size, "Dataset fits in one chunk, processing on calling thread");
            process_whole(operator.as_ref(), whole)
        }
        _ => run_on_pool(operator, &partitions, pool, on_failure),
    }
}

/// Run on the shared default pool, ignoring chunk faults.
pub fn batch_parallel_operate_default<O>(operator: Arc<O>, max_chunk: usize) -> BatchResult<u64>
where
    O: BatchOperator + Send + Sync + 'static,
    O::Data: Send + Sync + 'static,
{
    let pool = WorkerPool::global()?;
    batch_parallel_operate(operator, max_chunk, pool, FailurePolicy::Ignore)
}

fn run_on_pool<O>(
    operator: Arc<O>,
    partitions: &[Partition],
    pool: &WorkerPool,
    on_failure: FailurePolicy,
) -> BatchResult<u64>
where
    O: BatchOperator + Send + Sync + 'static,
    O::Data: Send + Sync + 'static,
{
    let start_time = Instant::now();

    // The full job list exists before anything is submitted
    let jobs: Vec<Arc<Job<O::Data>>> = partitions
        .iter()
        .map(|partition| {
            let chunk = operator.slice(partition.start, partition.length);
            Arc::new(Job::new(*partition, chunk))
        })
        .collect();

    debug!(
        chunks = jobs.len(),
        workers = pool.worker_count(),
        "Dispatching batch jobs"
    );

    let counter = Arc::new(AtomicU64::new(0));
    let barrier = WaitGroup::new();

    for job in &jobs {
        let worker_job = Arc::clone(job);
        let operator = Arc::clone(&operator);
        let counter = Arc::clone(&counter);
        let signal = barrier.clone();

        let submitted = pool.execute(move || {
            worker_job.run(operator.as_ref(), &counter);
            drop(signal);
        });

        // A rejected task is dropped unrun, which also drops its signal.
        if let Err(e) = submitted {
            job.fail(Box::new(e));
        }
    }

    barrier.wait();

    let succeeded = jobs
        .iter()
        .filter(|job| job.state() == JobState::Succeeded)
        .count();
    debug!(
        succeeded,
        failed = jobs.len() - succeeded,
        "All batch jobs completed"
    );

    let total = counter.load(Ordering::Acquire);
    let faults: Vec<OperationFault> = jobs.iter().filter_map(|job| job.take_failure()).collect();
    let elapsed_ms = start_time.elapsed().as_millis() as u64;

    resolve(total, faults, partitions.len(), on_failure, elapsed_ms)
}

fn resolve(
    total: u64,
    faults: Vec<OperationFault>,
    total_chunks: usize,
    on_failure: FailurePolicy,
    elapsed_ms: u64,
) -> BatchResult<u64> {
    if faults.is_empty() {
        info!(total, chunks = total_chunks, elapsed_ms, "Batch run completed");
        return Ok(total);
    }

    match on_failure {
        FailurePolicy::Ignore => {
            for fault in &faults {
                warn!(
                    chunk = fault.index,
                    start = fault.start,
                    length = fault.length,
                    error = %fault.source,
                    "Exception in batch job"
                );
            }
            info!(
                total,
                chunks = total_chunks,
                failed_chunks = faults.len(),
                elapsed_ms,
                "Batch run completed with ignored failures"
            );
            Ok(total)
        }
        FailurePolicy::Propagate => match AggregateError::from_faults(faults, total_chunks) {
            Some(aggregate) => {
                error!(error = %aggregate, elapsed_ms, "Batch run failed");
                Err(aggregate.into())
            }
            None => Ok(total),
        },
    }
}
