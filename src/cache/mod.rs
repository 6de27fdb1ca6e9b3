//! Caching utilities shared by batch consumers.

pub mod lru;

pub use lru::{ConcurrentLruCache, UNBOUNDED_MAX_SIZE};
