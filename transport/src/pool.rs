//! # Pool
//!
//! The connection/transaction table used by upper layers: a registry plus
//! a one-shot shutdown-completion signal. Composition only, no invariants
//! beyond the wrapped registry's.

use std::fmt;

use sipwire_registry::Registry;
use tokio_util::sync::CancellationToken;

pub struct Pool<R: Registry> {
    registry: R,
    token: CancellationToken,
}

impl<R: Registry> Pool<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            token: CancellationToken::new(),
        }
    }

    /// Signal shutdown. The first call completes `done`; later calls are
    /// no-ops.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Completes once `cancel` has been called, for any number of
    /// waiters. Carries no per-operation cancellation; callers that need
    /// to abandon a blocking call race this against it in a `select!`.
    pub async fn done(&self) {
        self.token.cancelled().await;
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<R: Registry + Clone> Clone for Pool<R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            token: self.token.clone(),
        }
    }
}

impl<R: Registry> Registry for Pool<R> {
    type Item = R::Item;

    fn put(&mut self, key: &str, item: R::Item) {
        self.registry.put(key, item);
    }

    fn get(&self, key: &str) -> Option<R::Item> {
        self.registry.get(key)
    }

    fn has(&self, key: &str) -> bool {
        self.registry.has(key)
    }

    fn pop(&mut self, key: &str) -> Option<R::Item> {
        self.registry.pop(key)
    }

    fn remove(&mut self, key: &str) {
        self.registry.remove(key);
    }

    fn clear(&mut self) {
        self.registry.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.registry.keys()
    }

    fn len(&self) -> usize {
        self.registry.len()
    }

    fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn items(&self) -> Vec<(String, R::Item)> {
        self.registry.items()
    }

    fn all(&self) -> Vec<R::Item> {
        self.registry.all()
    }
}

impl<R: Registry> fmt::Display for Pool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool {:p} (len {})", self, self.registry.len())
    }
}
