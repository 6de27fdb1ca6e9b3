//! # Concurrent LRU Cache
//!
//! A bounded map that evicts its least recently used entry once it grows past
//! `max_size`. Entries live in an index-based doubly linked list (a slab of
//! nodes ordered from least to most recently used) with a `HashMap` from key
//! to slot. Every read updates recency, so all operations go through one
//! mutex; a reader/writer split would still need the write side for `get`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{BatchError, BatchResult};

/// Capacity used by [`ConcurrentLruCache::unbounded`]
pub const UNBOUNDED_MAX_SIZE: usize = usize::MAX >> 1;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct LruState<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    /// Least recently used
    head: Option<usize>,
    /// Most recently used
    tail: Option<usize>,
    max_size: usize,
}

impl<K, V> LruState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(max_size: usize) -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            max_size,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn node(&self, slot: usize) -> &Node<K, V> {
        self.slots[slot]
            .as_ref()
            .unwrap_or_else(|| unreachable!("slot {slot} is indexed but empty"))
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<K, V> {
        self.slots[slot]
            .as_mut()
            .unwrap_or_else(|| unreachable!("slot {slot} is indexed but empty"))
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node(slot);
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(slot);
        node.prev = None;
        node.next = None;
    }

    fn link_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        {
            let node = self.node_mut(slot);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.node_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn touch(&mut self, slot: usize) {
        if self.tail != Some(slot) {
            self.unlink(slot);
            self.link_back(slot);
        }
    }

    fn slot_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).copied()
    }

    fn insert_new(&mut self, key: K, value: V) {
        let node = Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, slot);
        self.link_back(slot);
        self.evict_overflow();
    }

    fn remove_slot(&mut self, slot: usize) -> Node<K, V> {
        self.unlink(slot);
        let node = self.slots[slot]
            .take()
            .unwrap_or_else(|| unreachable!("slot {slot} is indexed but empty"));
        self.index.remove(&node.key);
        self.free.push(slot);
        node
    }

    fn evict_overflow(&mut self) {
        while self.len() > self.max_size {
            let Some(eldest) = self.head else { break };
            let _evicted = self.remove_slot(eldest);
            trace!(size = self.len(), "Evicted least recently used cache entry");
        }
    }

    /// Insert or overwrite, marking the entry most recently used
    fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.slot_of(&key) {
            Some(slot) => {
                self.touch(slot);
                Some(std::mem::replace(&mut self.node_mut(slot).value, value))
            }
            None => {
                self.insert_new(key, value);
                None
            }
        }
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = self.node(slot);
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }
}

/// Thread-safe LRU cache with a fixed maximum size.
///
/// # Examples
///
/// ```rust
/// use batcher_core::cache::ConcurrentLruCache;
///
/// let cache = ConcurrentLruCache::new(2).unwrap();
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.get(&"a");
/// cache.put("c", 3);
///
/// // "b" was the least recently used entry
/// assert!(!cache.contains_key(&"b"));
/// assert_eq!(cache.keys(), vec!["a", "c"]);
/// ```
pub struct ConcurrentLruCache<K, V> {
    state: Mutex<LruState<K, V>>,
}

impl<K, V> ConcurrentLruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(max_size: usize) -> BatchResult<Self> {
        validate_max_size(max_size)?;
        Ok(Self {
            state: Mutex::new(LruState::new(max_size)),
        })
    }

    /// Cache whose capacity is effectively unlimited
    pub fn unbounded() -> Self {
        Self {
            state: Mutex::new(LruState::new(UNBOUNDED_MAX_SIZE)),
        }
    }

    /// Value for `key`, marking it most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let mut state = self.state.lock();
        let slot = state.slot_of(key)?;
        state.touch(slot);
        Some(state.node(slot).value.clone())
    }

    pub fn get_or_default<Q>(&self, key: &Q, default: V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get(key).unwrap_or(default)
    }

    /// Value for `key` without changing recency
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let state = self.state.lock();
        let slot = state.slot_of(key)?;
        Some(state.node(slot).value.clone())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.lock().slot_of(key).is_some()
    }

    /// Insert or overwrite; returns the previous value
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.state.lock().put(key, value)
    }

    /// Insert only when `key` is absent; returns the existing value otherwise
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V>
    where
        V: Clone,
    {
        let mut state = self.state.lock();
        match state.slot_of(&key) {
            Some(slot) => {
                state.touch(slot);
                Some(state.node(slot).value.clone())
            }
            None => {
                state.insert_new(key, value);
                None
            }
        }
    }

    pub fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut state = self.state.lock();
        for (key, value) in entries {
            state.put(key, value);
        }
    }

    /// Insert every value under the key computed by `key_fn`
    pub fn put_list<F>(&self, values: Vec<V>, key_fn: F)
    where
        F: Fn(&V) -> K,
    {
        if values.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for value in values {
            let key = key_fn(&value);
            state.put(key, value);
        }
    }

    /// Value for `key`, computing and inserting it first when absent
    pub fn compute_if_absent<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
        V: Clone,
    {
        let mut state = self.state.lock();
        if let Some(slot) = state.slot_of(&key) {
            state.touch(slot);
            return state.node(slot).value.clone();
        }
        let value = compute(&key);
        state.insert_new(key, value.clone());
        value
    }

    /// Overwrite the value only when `key` is present
    pub fn replace(&self, key: &K, value: V) -> Option<V> {
        let mut state = self.state.lock();
        let slot = state.slot_of(key)?;
        state.touch(slot);
        Some(std::mem::replace(&mut state.node_mut(slot).value, value))
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();
        let slot = state.slot_of(key)?;
        Some(state.remove_slot(slot).value)
    }

    /// Remove `key` only while it maps to `expected`
    pub fn remove_if_eq<Q>(&self, key: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let mut state = self.state.lock();
        match state.slot_of(key) {
            Some(slot) if state.node(slot).value == *expected => {
                state.remove_slot(slot);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.lock().clear();
    }

    pub fn max_size(&self) -> usize {
        self.state.lock().max_size
    }

    /// Change the capacity, evicting least recently used entries if needed
    pub fn set_max_size(&self, max_size: usize) -> BatchResult<()> {
        validate_max_size(max_size)?;
        let mut state = self.state.lock();
        state.max_size = max_size;
        state.evict_overflow();
        Ok(())
    }

    /// Snapshot of keys from least to most recently used
    pub fn keys(&self) -> Vec<K> {
        self.state.lock().keys()
    }
}

fn validate_max_size(max_size: usize) -> BatchResult<()> {
    if max_size == 0 {
        return Err(BatchError::ConfigurationError(format!(
            "ConcurrentLruCache max size should be greater than 0, but actual {max_size}"
        )));
    }
    Ok(())
}

impl<K, V> fmt::Debug for ConcurrentLruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConcurrentLruCache")
            .field("len", &state.index.len())
            .field("max_size", &state.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(ConcurrentLruCache::<u32, u32>::new(0)
            .unwrap_err()
            .is_configuration_error());
        let cache = ConcurrentLruCache::<u32, u32>::new(1).unwrap();
        assert!(cache.set_max_size(0).is_err());
    }

    #[test]
    fn test_eviction_follows_access_order() {
        let cache = ConcurrentLruCache::new(3).unwrap();
        cache.put(1, "one");
        cache.put(2, "two");
        cache.put(3, "three");

        assert_eq!(cache.get(&1), Some("one"));
        cache.put(4, "four");

        assert_eq!(cache.keys(), vec![3, 1, 4]);
        assert!(!cache.contains_key(&2));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_peek_does_not_touch() {
        let cache = ConcurrentLruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.peek(&"a"), Some(1));
        cache.put("c", 3);
        assert_eq!(cache.peek(&"a"), None);
        assert_eq!(cache.keys(), vec!["b", "c"]);
    }

    #[test]
    fn test_put_returns_previous_value() {
        let cache = ConcurrentLruCache::new(4).unwrap();
        assert_eq!(cache.put("k", 1), None);
        assert_eq!(cache.put("k", 2), Some(1));
        assert_eq!(cache.get(&"k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_if_absent_releases_lock() {
        let cache = ConcurrentLruCache::new(4).unwrap();
        assert_eq!(cache.put_if_absent("k", 1), None);
        assert_eq!(cache.put_if_absent("k", 2), Some(1));
        // Subsequent operations must not deadlock
        assert_eq!(cache.get(&"k"), Some(1));
        cache.put("other", 5);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_remove_and_slot_reuse() {
        let cache = ConcurrentLruCache::new(3).unwrap();
        cache.put_all(vec![(1, 10), (2, 20), (3, 30)]);
        assert_eq!(cache.remove(&2), Some(20));
        assert_eq!(cache.remove(&2), None);
        assert!(!cache.remove_if_eq(&1, &99));
        assert!(cache.remove_if_eq(&1, &10));

        cache.put(4, 40);
        cache.put(5, 50);
        assert_eq!(cache.keys(), vec![3, 4, 5]);
        cache.put(6, 60);
        assert_eq!(cache.keys(), vec![4, 5, 6]);
    }

    #[test]
    fn test_replace_and_compute_if_absent() {
        let cache = ConcurrentLruCache::new(3).unwrap();
        assert_eq!(cache.replace(&"missing", 1), None);
        assert!(cache.is_empty());

        assert_eq!(cache.compute_if_absent("x", |_| 7), 7);
        assert_eq!(cache.compute_if_absent("x", |_| 8), 7);
        assert_eq!(cache.replace(&"x", 9), Some(7));
        assert_eq!(cache.get_or_default(&"x", 0), 9);
        assert_eq!(cache.get_or_default(&"y", 0), 0);
    }

    #[test]
    fn test_put_list_with_key_function() {
        let cache = ConcurrentLruCache::unbounded();
        cache.put_list(vec!["apple".to_string(), "banana".to_string()], |v| v.len());
        assert_eq!(cache.get(&5), Some("apple".to_string()));
        assert_eq!(cache.get(&6), Some("banana".to_string()));
        assert_eq!(cache.max_size(), UNBOUNDED_MAX_SIZE);
    }

    #[test]
    fn test_shrinking_evicts_eldest() {
        let cache = ConcurrentLruCache::new(5).unwrap();
        for i in 0..5 {
            cache.put(i, i);
        }
        cache.set_max_size(2).unwrap();
        assert_eq!(cache.keys(), vec![3, 4]);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_borrowed_key_lookup() {
        let cache = ConcurrentLruCache::new(2).unwrap();
        cache.put("owned".to_string(), 1);
        assert_eq!(cache.get("owned"), Some(1));
        assert!(cache.contains_key("owned"));
        assert_eq!(cache.remove("owned"), Some(1));
    }

    #[test]
    fn test_concurrent_writers_respect_capacity() {
        let cache = Arc::new(ConcurrentLruCache::new(64).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..500 {
                        cache.put(t * 1000 + i, i);
                        let _ = cache.get(&(t * 1000 + i / 2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 64);
        assert_eq!(cache.keys().len(), 64);
    }
}
