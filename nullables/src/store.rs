//! Nullable store: ordered in-memory key-value storage for testing.

use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};

use tessera_store::{range_is_empty, KvRead, KvWrite, StoreError, Visit};

/// An in-memory key-ordered byte store.
///
/// Iteration order matches the LMDB backend (lexicographic byte order), so
/// tests written against this store exercise the same queue ordering.
#[derive(Clone, Debug, Default)]
pub struct NullKvStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    writes: u64,
}

impl NullKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total set/delete calls since creation.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Overwrite a raw value without any bookkeeping (for corruption tests).
    pub fn poke(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
    }
}

impl KvRead for NullKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn iterate(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        visit: Visit<'_>,
    ) -> Result<(), StoreError> {
        if range_is_empty(lower, upper) {
            return Ok(());
        }
        for (key, value) in self.entries.range::<[u8], _>((lower, upper)) {
            if let ControlFlow::Break(()) = visit(key, value) {
                break;
            }
        }
        Ok(())
    }
}

impl KvWrite for NullKvStore {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.remove(key);
        self.writes += 1;
        Ok(())
    }

    fn as_read(&self) -> &dyn KvRead {
        self
    }
}
