//! # Sequential Executor
//!
//! Applies the operator to every partition in order on the calling thread.
//! There is no isolation between chunks: the first fault aborts the run and
//! leaves the remaining chunks untouched.

use tracing::{debug, instrument};

use crate::batch::operator::BatchOperator;
use crate::batch::partition::{partition, Partition};
use crate::error::{BatchResult, OperationFault};

/// Process the operator's dataset in chunks of at most `max_chunk` elements.
///
/// Returns the sum of the counts reported by `process`. An empty dataset
/// returns `0` without calling `process`; a dataset that fits in one chunk
/// is processed directly without slicing.
#[instrument(skip(operator), level = "debug")]
pub fn batch_operate<O>(operator: &O, max_chunk: usize) -> BatchResult<u64>
where
    O: BatchOperator + ?Sized,
{
    let data = operator.original_data();
    let size = operator.size(data);
    let partitions = partition(size, max_chunk)?;

    debug!(size, chunks = partitions.len(), "Planned sequential batch run");
    run_partitions(operator, &partitions, size)
}

/// Run an already computed partition plan sequentially.
pub(crate) fn run_partitions<O>(
    operator: &O,
    partitions: &[Partition],
    size: usize,
) -> BatchResult<u64>
where
    O: BatchOperator + ?Sized,
{
    match partitions {
        [] => Ok(0),
        [whole] if whole.covers(size) => process_whole(operator, whole),
        _ => {
            let mut total = 0_u64;
            for partition in partitions {
                let chunk = operator.slice(partition.start, partition.length);
                total = total.saturating_add(process_chunk(operator, partition, &chunk)?);
            }
            Ok(total)
        }
    }
}

/// Small-input path: one call on the full dataset, no slicing.
pub(crate) fn process_whole<O>(operator: &O, whole: &Partition) -> BatchResult<u64>
where
    O: BatchOperator + ?Sized,
{
    process_chunk(operator, whole, operator.original_data())
}

fn process_chunk<O>(operator: &O, partition: &Partition, chunk: &O::Data) -> BatchResult<u64>
where
    O: BatchOperator + ?Sized,
{
    operator.process(chunk).map_err(|source| {
        OperationFault::new(partition.index, partition.start, partition.length, source).into()
    })
}
