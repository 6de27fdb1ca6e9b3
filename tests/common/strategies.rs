use proptest::prelude::*;

/// Strategy for generating dataset sizes, including empty input
pub fn dataset_size_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(0usize),
        1usize..=10,
        0usize..=5_000,
    ]
}

/// Strategy for generating valid maximum chunk sizes
pub fn max_chunk_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(1usize),
        1usize..=64,
        1usize..=2_000,
    ]
}

/// Strategy for generating (size, max_chunk) pairs where the input fits one chunk
pub fn small_input_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=1_000).prop_flat_map(|max_chunk| (0usize..=max_chunk, Just(max_chunk)))
}

/// Strategy for generating LRU operations as (key, is_read) pairs
pub fn cache_operations_strategy() -> impl Strategy<Value = Vec<(u8, bool)>> {
    prop::collection::vec((0u8..32, any::<bool>()), 0..200)
}
