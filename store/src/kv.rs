//! Key-ordered byte store contract.

use std::ops::{Bound, ControlFlow};

use crate::StoreError;

/// Callback invoked for each `(key, value)` pair during iteration.
///
/// Returning [`ControlFlow::Break`] stops the walk early.
pub type Visit<'f> = &'f mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>;

/// Read access to a key-ordered byte store.
///
/// Iteration order is ascending lexicographic byte order of keys. Each call to
/// [`KvRead::iterate`] starts a fresh walk; nothing is cached between calls.
pub trait KvRead {
    /// Fetch the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Walk every entry whose key lies within `(lower, upper)`.
    fn iterate(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        visit: Visit<'_>,
    ) -> Result<(), StoreError>;

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Walk every entry whose key starts with `prefix`.
    fn iterate_prefix(&self, prefix: &[u8], visit: Visit<'_>) -> Result<(), StoreError> {
        let end = prefix_end(prefix);
        let upper = match &end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        self.iterate(Bound::Included(prefix), upper, visit)
    }
}

/// Write access to a key-ordered byte store.
///
/// Implementations provide no transactional guarantee of their own; atomicity
/// comes from the enclosing unit of work (an LMDB write transaction or a
/// [`crate::CacheKv`] overlay).
pub trait KvWrite: KvRead {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// View this store through its read half.
    fn as_read(&self) -> &dyn KvRead;
}

/// The smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (empty prefix, or all `0xff`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Whether `(lower, upper)` can contain any key at all.
///
/// Ordered-map range queries panic on inverted bounds, so backends check
/// first and treat an empty range as "nothing to visit".
pub fn range_is_empty(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}
