//! # Storage
//!
//! The key-value persistence contract the engine depends on, and its
//! backends.
//!
//! ## Backends
//!
//! - `MemoryStore`: in-memory `BTreeMap` (fast, volatile, the test fake)
//! - `RedbStore`: disk-backed redb database (ACID, survives restarts)
//!
//! `StoreBackend` wraps either one so the app can pick at runtime.
//!
//! ## Concurrency
//!
//! The default [`Store::update`] is a plain get-then-set. Two writers racing
//! on the same key through that path resolve last-writer-wins with no
//! conflict detection. `RedbStore` overrides it with a single write
//! transaction, which makes the engine's read-modify-write atomic there.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::TrackError;
use std::path::Path;

/// Read-modify-write callback for [`Store::update`].
///
/// Receives the current value (if any) and returns the value to write back.
pub type UpdateFn<'a> = dyn FnMut(Option<&str>) -> Result<String, TrackError> + 'a;

/// Durable string key-value storage scoped to one user and device.
pub trait Store {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, TrackError>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), TrackError>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), TrackError>;

    /// Check whether a key holds a value.
    fn has(&self, key: &str) -> Result<bool, TrackError> {
        Ok(self.get(key)?.is_some())
    }

    /// Read-modify-write a single key.
    ///
    /// Not atomic by default; see the module docs.
    fn update(&mut self, key: &str, apply: &mut UpdateFn<'_>) -> Result<(), TrackError> {
        let current = self.get(key)?;
        let next = apply(current.as_deref())?;
        self.set(key, &next)
    }
}

// =============================================================================
// STORE BACKEND
// =============================================================================

/// Runtime-selected storage backend.
#[derive(Debug)]
pub enum StoreBackend {
    /// In-memory map (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StoreBackend does NOT implement Clone.
// A redb database handle cannot be safely cloned.

impl StoreBackend {
    /// Open or create a redb-backed store at `path`.
    pub fn redb(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, StoreBackend::Persistent(_))
    }

    /// Short backend name for status output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::InMemory(_) => "memory",
            StoreBackend::Persistent(_) => "redb",
        }
    }
}

impl Store for StoreBackend {
    fn get(&self, key: &str) -> Result<Option<String>, TrackError> {
        match self {
            StoreBackend::InMemory(store) => store.get(key),
            StoreBackend::Persistent(store) => store.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), TrackError> {
        match self {
            StoreBackend::InMemory(store) => store.set(key, value),
            StoreBackend::Persistent(store) => store.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), TrackError> {
        match self {
            StoreBackend::InMemory(store) => store.remove(key),
            StoreBackend::Persistent(store) => store.remove(key),
        }
    }

    fn has(&self, key: &str) -> Result<bool, TrackError> {
        match self {
            StoreBackend::InMemory(store) => store.has(key),
            StoreBackend::Persistent(store) => store.has(key),
        }
    }

    fn update(&mut self, key: &str, apply: &mut UpdateFn<'_>) -> Result<(), TrackError> {
        match self {
            StoreBackend::InMemory(store) => store.update(key, apply),
            StoreBackend::Persistent(store) => store.update(key, apply),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise(store: &mut StoreBackend) {
        assert_eq!(store.get("k").unwrap(), None);
        assert!(!store.has("k").unwrap());

        store.set("k", "v1").unwrap();
        assert!(store.has("k").unwrap());

        store
            .update("k", &mut |current| Ok(format!("{}+", current.unwrap_or(""))))
            .unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1+"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn in_memory_backend_delegates() {
        let mut store = StoreBackend::default();
        assert!(!store.is_persistent());
        assert_eq!(store.name(), "memory");
        exercise(&mut store);
    }

    #[test]
    fn redb_backend_delegates() {
        let temp = tempdir().expect("temp dir");
        let mut store = StoreBackend::redb(temp.path().join("kv.redb")).unwrap();
        assert!(store.is_persistent());
        assert_eq!(store.name(), "redb");
        exercise(&mut store);
    }

    #[test]
    fn failed_update_writes_nothing() {
        let mut store = StoreBackend::default();
        store.set("k", "keep").unwrap();
        let result = store.update("k", &mut |_| Err(TrackError::Corrupt("no".to_string())));
        assert!(result.is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("keep"));
    }
}
