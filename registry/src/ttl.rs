//! # TTL Registry
//!
//! Decorator that expires unrefreshed entries from any registry. This is
//! how idle connections and abandoned transactions get reclaimed: their
//! lifetimes are defined by inactivity timeouts, not by explicit teardown,
//! so the registry itself has to drop them when their time runs out.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::Registry;

struct TimerEntry {
    generation: u64,
    handle: AbortHandle,
}

/// Wraps any [`Registry`] so entries expire after a duration unless
/// refreshed by another `put`. Items go into the inner registry as-is and
/// the timer lives in a sidecar table, so reads never see a timer envelope.
///
/// Every key has exactly one live timer: overwriting a key aborts the old
/// timer before installing the new one, and every removal path aborts the
/// timer too, so a stale expiry can never delete a just-inserted value.
/// A generation check covers the window where an aborted timer had already
/// started running.
///
/// Mutations spawn the expiry task on the tokio runtime, so they must be
/// called from within one.
pub struct TtlRegistry<R: Registry> {
    inner: Arc<Mutex<R>>,
    timers: Arc<Mutex<HashMap<String, TimerEntry>>>,
    generation: Arc<AtomicU64>,
    default_ttl: Duration,
}

impl<R: Registry> Clone for TtlRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            timers: self.timers.clone(),
            generation: self.generation.clone(),
            default_ttl: self.default_ttl,
        }
    }
}

// Lock order is timers then inner, everywhere. Expiry tasks take the same
// locks, so a timer firing and a foreground removal of the same key
// serialize instead of racing.
//
// Expiry tasks move a handle to the inner registry onto the runtime, hence
// the Send + 'static bound.
impl<R: Registry + Send + 'static> TtlRegistry<R> {
    pub fn new(registry: R, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            default_ttl,
        }
    }

    /// Insert with the registry-wide default duration.
    pub fn put(&self, key: &str, item: R::Item) {
        self.put_with_ttl(key, item, self.default_ttl);
    }

    /// Insert with a per-item duration, overriding the default.
    pub fn put_with_ttl(&self, key: &str, item: R::Item, ttl: Duration) {
        let mut timers = self.timers.lock();
        if let Some(entry) = timers.remove(key) {
            entry.handle.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().put(key, item);
        let handle = self.spawn_expiry(key.to_string(), generation, ttl);
        timers.insert(key.to_string(), TimerEntry { generation, handle });
    }

    fn spawn_expiry(&self, key: String, generation: u64, ttl: Duration) -> AbortHandle {
        // weak handles: the timer must not keep a dropped registry alive,
        // and tests can drive it on a paused clock
        let inner = Arc::downgrade(&self.inner);
        let timers = Arc::downgrade(&self.timers);
        let task = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let (Some(timers), Some(inner)) = (timers.upgrade(), inner.upgrade()) else {
                return;
            };
            let mut timers = timers.lock();
            let live = matches!(
                timers.get(&key),
                Some(entry) if entry.generation == generation
            );
            if live {
                timers.remove(&key);
                inner.lock().remove(&key);
                debug!("registry entry {} expired after {:?}", key, ttl);
            }
        });
        task.abort_handle()
    }

    pub fn get(&self, key: &str) -> Option<R::Item> {
        self.inner.lock().get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.lock().has(key)
    }

    /// Get-and-remove; the entry's timer is aborted so it cannot fire on a
    /// later occupant of the key.
    pub fn pop(&self, key: &str) -> Option<R::Item> {
        let mut timers = self.timers.lock();
        if let Some(entry) = timers.remove(key) {
            entry.handle.abort();
        }
        self.inner.lock().pop(key)
    }

    pub fn remove(&self, key: &str) {
        let mut timers = self.timers.lock();
        if let Some(entry) = timers.remove(key) {
            entry.handle.abort();
        }
        self.inner.lock().remove(key);
    }

    pub fn clear(&self) {
        let mut timers = self.timers.lock();
        for (_, entry) in timers.drain() {
            entry.handle.abort();
        }
        self.inner.lock().clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn items(&self) -> Vec<(String, R::Item)> {
        self.inner.lock().items()
    }

    pub fn all(&self) -> Vec<R::Item> {
        self.inner.lock().all()
    }
}

impl<R: Registry + Send + 'static> Registry for TtlRegistry<R> {
    type Item = R::Item;

    fn put(&mut self, key: &str, item: R::Item) {
        TtlRegistry::put(self, key, item);
    }

    fn get(&self, key: &str) -> Option<R::Item> {
        TtlRegistry::get(self, key)
    }

    fn has(&self, key: &str) -> bool {
        TtlRegistry::has(self, key)
    }

    fn pop(&mut self, key: &str) -> Option<R::Item> {
        TtlRegistry::pop(self, key)
    }

    fn remove(&mut self, key: &str) {
        TtlRegistry::remove(self, key);
    }

    fn clear(&mut self) {
        TtlRegistry::clear(self);
    }

    fn keys(&self) -> Vec<String> {
        TtlRegistry::keys(self)
    }

    fn len(&self) -> usize {
        TtlRegistry::len(self)
    }

    fn is_empty(&self) -> bool {
        TtlRegistry::is_empty(self)
    }

    fn items(&self) -> Vec<(String, R::Item)> {
        TtlRegistry::items(self)
    }

    fn all(&self) -> Vec<R::Item> {
        TtlRegistry::all(self)
    }
}

impl<R: Registry> fmt::Display for TtlRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ttl registry (len {})", self.inner.lock().len())
    }
}
