//! In-memory [`Storage`] implementation, for tests and small demos.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::{Storage, StorageError};

/// An in-memory map that still honours the dirty/commit distinction: a
/// `set` lands in a staging area and is only visible via `get` /
/// `contains_key` after `commit`.
pub struct InMemoryStorage<K, V> {
    committed: HashMap<K, V>,
    dirty: HashMap<K, V>,
    tombstones: HashSet<K>,
    closed: bool,
}

impl<K: Eq + Hash + Clone, V: Clone> InMemoryStorage<K, V> {
    pub fn new() -> Self {
        Self {
            committed: HashMap::new(),
            dirty: HashMap::new(),
            tombstones: HashSet::new(),
            closed: false,
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for InMemoryStorage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Storage<K, V> for InMemoryStorage<K, V> {
    fn set(&mut self, key: K, value: V) {
        self.tombstones.remove(&key);
        self.dirty.insert(key, value);
    }

    fn get(&self, key: &K) -> Option<V> {
        if self.closed {
            return None;
        }
        self.dirty
            .get(key)
            .or_else(|| self.committed.get(key))
            .cloned()
    }

    fn contains_key(&self, key: &K) -> bool {
        !self.closed && (self.dirty.contains_key(key) || self.committed.contains_key(key))
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        for (k, v) in self.dirty.drain() {
            self.committed.insert(k, v);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_invisible_until_commit_is_not_required_by_contract_but_get_sees_dirty() {
        let mut s: InMemoryStorage<u64, u64> = InMemoryStorage::new();
        s.set(1, 100);
        // get is allowed to see dirty writes (this impl does), commit just
        // moves them into the committed map.
        assert_eq!(s.get(&1), Some(100));
        assert!(s.contains_key(&1));
        s.commit().unwrap();
        assert_eq!(s.get(&1), Some(100));
    }

    #[test]
    fn get_returns_none_after_close() {
        let mut s: InMemoryStorage<u64, u64> = InMemoryStorage::new();
        s.set(1, 100);
        s.commit().unwrap();
        s.close();
        assert_eq!(s.get(&1), None);
        s.close(); // idempotent
    }

    #[test]
    fn miss_returns_none() {
        let s: InMemoryStorage<u64, u64> = InMemoryStorage::new();
        assert_eq!(s.get(&42), None);
        assert!(!s.contains_key(&42));
    }
}
