//! # Memory Registry
//!
//! Single-owner keyed store that preserves insertion order.

use std::fmt;

use indexmap::IndexMap;

use crate::Registry;

/// Insertion-ordered store for use by a single owner. `keys` walks entries
/// in first-insertion order; overwriting a key keeps its original position,
/// removing and re-inserting moves it to the end.
pub struct MemoryRegistry<T> {
    items: IndexMap<String, T>,
}

impl<T> MemoryRegistry<T> {
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }
}

impl<T> Default for MemoryRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Registry for MemoryRegistry<T> {
    type Item = T;

    fn put(&mut self, key: &str, item: T) {
        self.items.insert(key.to_string(), item);
    }

    fn get(&self, key: &str) -> Option<T> {
        self.items.get(key).cloned()
    }

    fn has(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    fn pop(&mut self, key: &str) -> Option<T> {
        // shift keeps the remaining keys in insertion order
        self.items.shift_remove(key)
    }

    fn remove(&mut self, key: &str) {
        self.items.shift_remove(key);
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn items(&self) -> Vec<(String, T)> {
        self.items
            .iter()
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect()
    }

    fn all(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }
}

impl<T> fmt::Display for MemoryRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memory registry (len {})", self.items.len())
    }
}
