//! Thread naming for worker pools.
//!
//! Threads are named `{pool}-pool-{P}-thread-{T}` so that log lines and
//! thread dumps identify which pool a worker belongs to. `P` is unique per
//! process and `T` counts from 1 within a pool.

use std::sync::atomic::{AtomicUsize, Ordering};

static POOL_NUMBER: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug, Clone)]
pub struct NamedThreadFactory {
    name_prefix: String,
}

impl NamedThreadFactory {
    /// Reserve the next pool number for `pool_name`
    pub fn new(pool_name: &str) -> Self {
        let pool_number = POOL_NUMBER.fetch_add(1, Ordering::Relaxed);
        Self {
            name_prefix: format!("{pool_name}-pool-{pool_number}-thread-"),
        }
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Name of the worker at zero-based `index`, as handed out by rayon
    pub fn thread_name(&self, index: usize) -> String {
        format!("{}{}", self.name_prefix, index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_names_count_from_one() {
        let factory = NamedThreadFactory::new("reports");
        assert!(factory.name_prefix().starts_with("reports-pool-"));
        assert!(factory.name_prefix().ends_with("-thread-"));

        assert!(factory.thread_name(0).ends_with("-thread-1"));
        assert!(factory.thread_name(1).ends_with("-thread-2"));
    }

    #[test]
    fn test_pool_numbers_are_unique() {
        let a = NamedThreadFactory::new("same");
        let b = NamedThreadFactory::new("same");
        assert_ne!(a.name_prefix(), b.name_prefix());
    }
}
