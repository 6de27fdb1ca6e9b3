//! # Partitioner
//!
//! Pure boundary arithmetic: splits `[0, size)` into an ordered sequence of
//! contiguous chunks of at most `max_chunk` elements.

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, BatchResult};

/// One contiguous sub-range `[start, start + length)` of the original dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Position of this chunk in partition order
    pub index: usize,
    pub start: usize,
    pub length: usize,
}

impl Partition {
    pub fn new(index: usize, start: usize, length: usize) -> Self {
        Self {
            index,
            start,
            length,
        }
    }

    /// Exclusive end of the range
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// True when this partition covers an entire dataset of `size` elements
    pub fn covers(&self, size: usize) -> bool {
        self.start == 0 && self.length == size
    }
}

/// Reject a non-positive chunk size before any work is planned.
pub fn validate_max_chunk(max_chunk: usize) -> BatchResult<()> {
    if max_chunk == 0 {
        return Err(BatchError::ConfigurationError(format!(
            "Batch size should be greater than 0, but actual value is {max_chunk}"
        )));
    }
    Ok(())
}

/// Number of partitions `partition` would produce.
pub fn partition_count(size: usize, max_chunk: usize) -> BatchResult<usize> {
    validate_max_chunk(max_chunk)?;
    Ok(size.div_ceil(max_chunk))
}

/// Compute the ordered, non-overlapping, fully-covering chunk boundaries.
///
/// - `max_chunk == 0` is a configuration error.
/// - An empty dataset yields no partitions.
/// - `size <= max_chunk` yields the single partition `(0, size)`.
/// - Otherwise every chunk has length `max_chunk` except possibly the last,
///   which takes the remainder.
pub fn partition(size: usize, max_chunk: usize) -> BatchResult<Vec<Partition>> {
    validate_max_chunk(max_chunk)?;

    if size == 0 {
        return Ok(Vec::new());
    }
    if size <= max_chunk {
        return Ok(vec![Partition::new(0, 0, size)]);
    }

    let mut partitions = Vec::with_capacity(size.div_ceil(max_chunk));
    let mut start = 0;
    while start < size {
        let length = max_chunk.min(size - start);
        partitions.push(Partition::new(partitions.len(), start, length));
        start += length;
    }
    Ok(partitions)
}
