//! Byte-oriented storage backends.
//!
//! The store encodes typed rows into namespaced keys and opaque byte
//! values; backends only provide durable key-value primitives plus an
//! atomic multi-put, which is what makes a check commit all-or-nothing.

mod redb;

pub use self::redb::RedbBackend;

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::StoreError;

/// Storage primitives required by the store.
///
/// `batch_put` MUST be atomic: either every entry becomes visible or none
/// does. `scan_prefix` visits keys in ascending lexicographic order.
pub trait StoreBackend: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError>;

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
}

/// Backend selection.
#[derive(Debug, Clone, Default)]
pub enum BackendConfig {
    /// Ordered in-memory map; for tests and ephemeral runs.
    #[default]
    InMemory,
    /// Embedded redb database at the given path.
    Redb {
        path: PathBuf,
    },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb(path: impl Into<PathBuf>) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn StoreBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => Ok(Box::new(RedbBackend::open(path)?)),
        }
    }
}

/// Mutex-guarded `BTreeMap` backend. The single lock makes every
/// operation, including `batch_put`, trivially atomic.
#[derive(Default)]
pub struct InMemoryBackend {
    map: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StoreBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let mut map = self.lock();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let map = self.lock();
        let range = map.range::<String, _>((Bound::Included(prefix.to_string()), Bound::Unbounded));
        for (key, value) in range {
            if !key.starts_with(prefix) {
                break;
            }
            visitor(key, value)?;
        }
        Ok(())
    }
}
