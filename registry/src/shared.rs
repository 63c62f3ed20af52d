//! # Shared Registry
//!
//! Cloneable keyed store safe for concurrent use from many tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::Registry;

/// Concurrency-safe store. Clones share one underlying map, and every
/// operation takes the lock exactly once, so each is atomic with respect
/// to all others on the same instance. `keys` carries no ordering
/// guarantee.
pub struct SharedRegistry<T> {
    items: Arc<RwLock<HashMap<String, T>>>,
}

impl<T> Clone for SharedRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: Clone> SharedRegistry<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn put(&self, key: &str, item: T) {
        self.items.write().insert(key.to_string(), item);
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.items.read().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }

    /// Get-and-remove under one write lock. No concurrent `put` of the
    /// same key can be observed between the two halves.
    pub fn pop(&self, key: &str) -> Option<T> {
        self.items.write().remove(key)
    }

    pub fn remove(&self, key: &str) {
        self.items.write().remove(key);
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn items(&self) -> Vec<(String, T)> {
        self.items
            .read()
            .iter()
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect()
    }

    pub fn all(&self) -> Vec<T> {
        self.items.read().values().cloned().collect()
    }
}

impl<T: Clone> Default for SharedRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Registry for SharedRegistry<T> {
    type Item = T;

    fn put(&mut self, key: &str, item: T) {
        SharedRegistry::put(self, key, item);
    }

    fn get(&self, key: &str) -> Option<T> {
        SharedRegistry::get(self, key)
    }

    fn has(&self, key: &str) -> bool {
        SharedRegistry::has(self, key)
    }

    fn pop(&mut self, key: &str) -> Option<T> {
        SharedRegistry::pop(self, key)
    }

    fn remove(&mut self, key: &str) {
        SharedRegistry::remove(self, key);
    }

    fn clear(&mut self) {
        SharedRegistry::clear(self);
    }

    fn keys(&self) -> Vec<String> {
        SharedRegistry::keys(self)
    }

    fn len(&self) -> usize {
        SharedRegistry::len(self)
    }

    fn is_empty(&self) -> bool {
        SharedRegistry::is_empty(self)
    }

    fn items(&self) -> Vec<(String, T)> {
        SharedRegistry::items(self)
    }

    fn all(&self) -> Vec<T> {
        SharedRegistry::all(self)
    }
}

impl<T> fmt::Display for SharedRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shared registry (len {})", self.items.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn put_and_get_through_clones() {
        let registry = SharedRegistry::new();
        let other = registry.clone();

        registry.put("call-1", "alice");
        assert_eq!(other.get("call-1"), Some("alice"));

        other.remove("call-1");
        assert!(!registry.has("call-1"));
    }

    #[test]
    fn concurrent_puts_with_distinct_keys() {
        let registry = SharedRegistry::new();
        let barrier = Arc::new(Barrier::new(8));

        thread::scope(|scope| {
            for i in 0..8 {
                let registry = registry.clone();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    registry.put(&format!("key-{i}"), i);
                });
            }
        });

        assert_eq!(registry.len(), 8);
        let mut keys = registry.keys();
        keys.sort();
        let expected: Vec<String> = (0..8).map(|i| format!("key-{i}")).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn pop_yields_item_exactly_once() {
        let registry = SharedRegistry::new();
        registry.put("branch", 7);

        let popped: Vec<Option<i32>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let registry = registry.clone();
                    scope.spawn(move || registry.pop("branch"))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(popped.iter().flatten().count(), 1);
        assert!(!registry.has("branch"));
    }

    #[test]
    fn snapshots_are_copies() {
        let registry = SharedRegistry::new();
        registry.put("a", 1);
        registry.put("b", 2);

        let mut items = registry.items();
        items.sort();
        registry.clear();

        assert_eq!(items, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        assert!(registry.is_empty());
    }
}
