//! # Batch Operators
//!
//! The capability a caller implements to let the engine size, slice and
//! process a dataset, plus ready-made operators for `Vec` and `HashMap`
//! backed datasets. The operators compose a processing closure rather than
//! sharing a base implementation.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Describes how to size, slice and process an arbitrarily large dataset.
///
/// `slice` must be well-defined for every partition produced for
/// `size(original_data())`. `process` returns the number of elements it
/// handled successfully.
///
/// Operators used with the parallel executor are shared across worker
/// threads and must make no assumption about the relative timing of
/// concurrent `process` calls.
pub trait BatchOperator {
    type Data;
    type Error: std::error::Error + Send + Sync + 'static;

    /// The full dataset
    fn original_data(&self) -> &Self::Data;

    fn size(&self, data: &Self::Data) -> usize;

    /// Sub-dataset covering `[start, start + length)`
    fn slice(&self, start: usize, length: usize) -> Self::Data;

    fn process(&self, data: &Self::Data) -> Result<u64, Self::Error>;
}

/// Operator over a `Vec<T>` with a caller-supplied processing closure.
///
/// # Examples
///
/// ```rust
/// use batcher_core::batch::{batch_operate, ListBatchOperator};
///
/// let operator = ListBatchOperator::new((0..250).collect::<Vec<u32>>(), |chunk: &Vec<u32>| {
///     Ok::<_, std::io::Error>(chunk.len() as u64)
/// });
/// assert_eq!(batch_operate(&operator, 100).unwrap(), 250);
/// ```
pub struct ListBatchOperator<T, F> {
    original_data: Vec<T>,
    processor: F,
}

impl<T, F> ListBatchOperator<T, F> {
    pub fn new(original_data: Vec<T>, processor: F) -> Self {
        Self {
            original_data,
            processor,
        }
    }

    pub fn into_inner(self) -> Vec<T> {
        self.original_data
    }
}

impl<T, F, E> BatchOperator for ListBatchOperator<T, F>
where
    T: Clone,
    F: Fn(&Vec<T>) -> Result<u64, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Data = Vec<T>;
    type Error = E;

    fn original_data(&self) -> &Vec<T> {
        &self.original_data
    }

    fn size(&self, data: &Vec<T>) -> usize {
        data.len()
    }

    fn slice(&self, start: usize, length: usize) -> Vec<T> {
        let original_size = self.original_data.len();
        if start >= original_size {
            return Vec::new();
        }
        let end = start.saturating_add(length).min(original_size);
        self.original_data[start..end].to_vec()
    }

    fn process(&self, data: &Vec<T>) -> Result<u64, E> {
        (self.processor)(data)
    }
}

impl<T: fmt::Debug, F> fmt::Debug for ListBatchOperator<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListBatchOperator")
            .field("size", &self.original_data.len())
            .finish()
    }
}

/// Operator over a `HashMap<K, V>` with a caller-supplied processing closure.
///
/// Entries are snapshotted in iteration order at construction so every
/// slice of the same operator sees a stable ordering.
pub struct MapBatchOperator<K, V, F> {
    original_data: HashMap<K, V>,
    entries: Vec<(K, V)>,
    processor: F,
}

impl<K, V, F> MapBatchOperator<K, V, F>
where
    K: Clone,
    V: Clone,
{
    pub fn new(original_data: HashMap<K, V>, processor: F) -> Self {
        let entries = original_data
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            original_data,
            entries,
            processor,
        }
    }
}

impl<K, V, F, E> BatchOperator for MapBatchOperator<K, V, F>
where
    K: Clone + Eq + Hash,
    V: Clone,
    F: Fn(&HashMap<K, V>) -> Result<u64, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Data = HashMap<K, V>;
    type Error = E;

    fn original_data(&self) -> &HashMap<K, V> {
        &self.original_data
    }

    fn size(&self, data: &HashMap<K, V>) -> usize {
        data.len()
    }

    fn slice(&self, start: usize, length: usize) -> HashMap<K, V> {
        let original_size = self.entries.len();
        if start >= original_size {
            return HashMap::new();
        }
        let end = start.saturating_add(length).min(original_size);
        self.entries[start..end].iter().cloned().collect()
    }

    fn process(&self, data: &HashMap<K, V>) -> Result<u64, E> {
        (self.processor)(data)
    }
}

impl<K, V, F> fmt::Debug for MapBatchOperator<K, V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapBatchOperator")
            .field("size", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::convert::Infallible;

    fn counting(data: &Vec<u32>) -> Result<u64, Infallible> {
        Ok(data.len() as u64)
    }

    #[test]
    fn test_list_slice_clamps() {
        let operator = ListBatchOperator::new(vec![1_u32, 2, 3, 4, 5], counting);

        assert_eq!(operator.slice(0, 2), vec![1, 2]);
        assert_eq!(operator.slice(3, 10), vec![4, 5]);
        assert!(operator.slice(5, 1).is_empty());
        assert!(operator.slice(9, 1).is_empty());
        assert_eq!(operator.size(operator.original_data()), 5);
        assert_eq!(operator.process(&vec![7, 8]).unwrap(), 2);
    }

    #[test]
    fn test_map_slices_tile_entries() {
        let data: HashMap<String, u32> = (0..10).map(|i| (format!("key_{i}"), i)).collect();
        let operator = MapBatchOperator::new(data, |chunk: &HashMap<String, u32>| {
            Ok::<_, Infallible>(chunk.len() as u64)
        });

        let mut seen = HashSet::new();
        for start in (0..10).step_by(3) {
            let chunk = operator.slice(start, 3);
            assert!(chunk.len() <= 3);
            for key in chunk.keys() {
                assert!(seen.insert(key.clone()), "key {key} appeared in two slices");
            }
        }
        assert_eq!(seen.len(), 10);
        assert!(operator.slice(10, 3).is_empty());
    }

    #[test]
    fn test_map_slice_is_stable() {
        let data: HashMap<u32, u32> = (0..50).map(|i| (i, i * 2)).collect();
        let operator =
            MapBatchOperator::new(data, |chunk: &HashMap<u32, u32>| Ok::<_, Infallible>(chunk.len() as u64));

        assert_eq!(operator.slice(10, 15), operator.slice(10, 15));
        assert_eq!(operator.size(operator.original_data()), 50);
    }
}
