//! # Batch Jobs
//!
//! One partition's unit of execution in parallel mode. A job is written by
//! exactly one worker (state and failure slot) and read by the coordinator
//! only after the completion barrier has released.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::operator::BatchOperator;
use crate::batch::partition::Partition;
use crate::error::{BoxError, OperationFault, PanicFault};

/// Lifecycle of a job: `Pending -> Running -> Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl JobState {
    pub fn is_completed(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl From<u8> for JobState {
    fn from(value: u8) -> Self {
        match value {
            0 => JobState::Pending,
            1 => JobState::Running,
            2 => JobState::Succeeded,
            _ => JobState::Failed,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Job<D> {
    partition: Partition,
    data: D,
    state: AtomicU8,
    failure: Mutex<Option<OperationFault>>,
}

impl<D> Job<D> {
    pub(crate) fn new(partition: Partition, data: D) -> Self {
        Self {
            partition,
            data,
            state: AtomicU8::new(JobState::Pending as u8),
            failure: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> JobState {
        JobState::from(self.state.load(Ordering::Acquire))
    }

    /// Run `process` on this job's chunk, adding its count to `counter` on
    /// success and capturing any error or panic into the failure slot.
    pub(crate) fn run<O>(&self, operator: &O, counter: &AtomicU64)
    where
        O: BatchOperator<Data = D> + ?Sized,
    {
        self.state.store(JobState::Running as u8, Ordering::Release);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| operator.process(&self.data)));
        match outcome {
            Ok(Ok(count)) => {
                add_saturating(counter, count);
                self.state.store(JobState::Succeeded as u8, Ordering::Release);
                debug!(
                    chunk = self.partition.index,
                    start = self.partition.start,
                    length = self.partition.length,
                    count,
                    "Batch chunk completed"
                );
            }
            Ok(Err(error)) => self.fail(error.into()),
            Err(payload) => self.fail(PanicFault::from_payload(payload.as_ref()).into()),
        }
    }

    /// Record a fault without running, e.g. when the pool rejected the job.
    pub(crate) fn fail(&self, source: BoxError) {
        let fault = OperationFault::new(
            self.partition.index,
            self.partition.start,
            self.partition.length,
            source,
        );
        debug!(chunk = self.partition.index, error = %fault, "Batch chunk failed");
        // A job runs at most once, so the first fault is the only one
        self.failure.lock().get_or_insert(fault);
        self.state.store(JobState::Failed as u8, Ordering::Release);
    }

    /// Move the captured fault out, keeping its original source error.
    pub(crate) fn take_failure(&self) -> Option<OperationFault> {
        self.failure.lock().take()
    }
}

/// Add to a shared success counter, clamping at `u64::MAX`
pub(crate) fn add_saturating(counter: &AtomicU64, count: u64) {
    // The closure always returns Some, so the update cannot fail
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        Some(current.saturating_add(count))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::operator::ListBatchOperator;

    #[derive(Debug, thiserror::Error)]
    #[error("odd chunk")]
    struct OddChunk;

    fn operator() -> ListBatchOperator<u32, impl Fn(&Vec<u32>) -> Result<u64, OddChunk>> {
        ListBatchOperator::new((0..10).collect(), |chunk: &Vec<u32>| {
            if chunk[0] % 2 == 1 {
                return Err(OddChunk);
            }
            if chunk[0] == 4 {
                panic!("chunk four");
            }
            Ok(chunk.len() as u64)
        })
    }

    #[test]
    fn test_job_state_from_u8() {
        assert_eq!(JobState::from(0), JobState::Pending);
        assert_eq!(JobState::from(1), JobState::Running);
        assert_eq!(JobState::from(2), JobState::Succeeded);
        assert_eq!(JobState::from(3), JobState::Failed);
        assert_eq!(JobState::from(200), JobState::Failed);
        assert!(!JobState::Running.is_completed());
        assert!(JobState::Failed.is_completed());
    }

    #[test]
    fn test_job_success_adds_to_counter() {
        let operator = operator();
        let counter = AtomicU64::new(5);
        let job = Job::new(Partition::new(0, 0, 2), operator.slice(0, 2));
        assert_eq!(job.state(), JobState::Pending);

        job.run(&operator, &counter);

        assert_eq!(job.state(), JobState::Succeeded);
        assert_eq!(counter.load(Ordering::Acquire), 7);
        assert!(job.take_failure().is_none());
    }

    #[test]
    fn test_job_error_is_captured() {
        let operator = operator();
        let counter = AtomicU64::new(0);
        let job = Job::new(Partition::new(1, 1, 2), operator.slice(1, 2));

        job.run(&operator, &counter);

        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(counter.load(Ordering::Acquire), 0);
        let fault = job.take_failure().unwrap();
        assert_eq!(fault.index, 1);
        assert_eq!(fault.start, 1);
        assert_eq!(fault.source.to_string(), "odd chunk");
    }

    #[test]
    fn test_job_panic_is_captured() {
        let operator = operator();
        let counter = AtomicU64::new(0);
        let job = Job::new(Partition::new(2, 4, 2), operator.slice(4, 2));

        job.run(&operator, &counter);

        assert_eq!(job.state(), JobState::Failed);
        let fault = job.take_failure().unwrap();
        assert!(fault.to_string().contains("chunk four"));
        assert_eq!(fault.start, 4);
    }

    #[test]
    fn test_taken_failure_keeps_source_type() {
        let operator = operator();
        let job = Job::new(Partition::new(3, 3, 1), operator.slice(3, 1));
        job.run(&operator, &AtomicU64::new(0));

        let fault = job.take_failure().unwrap();
        assert!(fault.source.downcast_ref::<OddChunk>().is_some());
        // Taken once
        assert!(job.take_failure().is_none());
        assert_eq!(job.state(), JobState::Failed);
    }

    #[test]
    fn test_counter_saturates() {
        let counter = AtomicU64::new(u64::MAX - 1);
        add_saturating(&counter, 5);
        assert_eq!(counter.load(Ordering::Acquire), u64::MAX);
        add_saturating(&counter, 1);
        assert_eq!(counter.load(Ordering::Acquire), u64::MAX);
    }
}
