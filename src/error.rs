//! Error types for the batch engine.
//!

use std::fmt;
use thiserror::Error;

/// Boxed error as captured from a caller-supplied operator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error(transparent)]
    OperationFault(#[from] OperationFault),
    #[error(transparent)]
    AggregateError(#[from] AggregateError),
    #[error("Worker pool error: {0}")]
    PoolError(String),
}

impl BatchError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, BatchError::ConfigurationError(_))
    }

    /// Faults carried by this error, in partition order.
    pub fn faults(&self) -> &[OperationFault] {
        match self {
            BatchError::OperationFault(fault) => std::slice::from_ref(fault),
            BatchError::AggregateError(aggregate) => aggregate.faults(),
            _ => &[],
        }
    }
}

impl From<crate::config::ConfigurationError> for BatchError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        BatchError::ConfigurationError(error.to_string())
    }
}

pub type BatchResult<T> = std::result::Result<T, BatchError>;

/// A fault raised while processing a single chunk.
#[derive(Debug, Error)]
#[error("Operation failed for chunk {index} (start {start}, length {length}): {source}")]
pub struct OperationFault {
    pub index: usize,
    pub start: usize,
    pub length: usize,
    #[source]
    pub source: BoxError,
}

impl OperationFault {
    pub fn new(
        index: usize,
        start: usize,
        length: usize,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            index,
            start,
            length,
            source: source.into(),
        }
    }
}

/// Deferred report of every chunk fault captured during a parallel run.
///
/// Holds at least one fault; its `source()` is the first fault in partition
/// order.
#[derive(Debug)]
pub struct AggregateError {
    faults: Vec<OperationFault>,
    total_chunks: usize,
}

impl AggregateError {
    pub fn new(first: OperationFault, rest: Vec<OperationFault>, total_chunks: usize) -> Self {
        let mut faults = Vec::with_capacity(rest.len() + 1);
        faults.push(first);
        faults.extend(rest);
        Self {
            faults,
            total_chunks,
        }
    }

    /// `None` when there is nothing to report
    pub fn from_faults(faults: Vec<OperationFault>, total_chunks: usize) -> Option<Self> {
        let mut faults = faults.into_iter();
        let first = faults.next()?;
        Some(Self::new(first, faults.collect(), total_chunks))
    }

    pub fn first(&self) -> &OperationFault {
        &self.faults[0]
    }

    /// Every fault, in partition order
    pub fn faults(&self) -> &[OperationFault] {
        &self.faults
    }

    pub fn into_faults(self) -> Vec<OperationFault> {
        self.faults
    }

    pub fn failed_chunks(&self) -> usize {
        self.faults.len()
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} batch chunks failed; first failure: {}",
            self.faults.len(),
            self.total_chunks,
            self.first()
        )
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.first())
    }
}

/// Fault recorded when `process` panics inside a worker.
#[derive(Debug, Error)]
#[error("operator panicked: {message}")]
pub struct PanicFault {
    pub message: String,
}

impl PanicFault {
    pub fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}
