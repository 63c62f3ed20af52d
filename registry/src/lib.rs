//! # Keyed Registries
//!
//! Stores mapping string identities to owned items. These back the live
//! tables of the signaling stack: connections keyed by `protocol:addr`,
//! transactions keyed by branch id, or any resource that needs lookup,
//! overwrite, and atomic remove-and-return.
//!
//! ## Core Components
//!
//! - **Registry**: the contract every store implements
//! - **MemoryRegistry**: single-owner, insertion-ordered
//! - **SharedRegistry**: cloneable, safe for concurrent use
//! - **TtlRegistry**: decorator that expires unrefreshed entries

use std::fmt;

pub mod memory;
pub mod shared;
pub mod ttl;

pub use memory::MemoryRegistry;
pub use shared::SharedRegistry;
pub use ttl::TtlRegistry;

/// Contract shared by all keyed stores.
///
/// Lookups against a missing key are not errors; they return `None` or
/// `false`. Snapshot accessors copy entries out of the store, never handing
/// back a live alias into it.
pub trait Registry: fmt::Display {
    type Item: Clone;

    /// Insert `item` under `key`, overwriting any previous value.
    fn put(&mut self, key: &str, item: Self::Item);

    /// Copy of the item under `key`, if present.
    fn get(&self, key: &str) -> Option<Self::Item>;

    fn has(&self, key: &str) -> bool;

    /// Atomic get-and-remove.
    fn pop(&mut self, key: &str) -> Option<Self::Item>;

    /// Remove the item under `key`; no-op if missing.
    fn remove(&mut self, key: &str);

    fn clear(&mut self);

    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries as owned pairs.
    fn items(&self) -> Vec<(String, Self::Item)>;

    /// Snapshot of all items.
    fn all(&self) -> Vec<Self::Item>;
}
