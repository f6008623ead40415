//! Copy-on-write overlay and all-or-nothing units of work.
//!
//! A [`CacheKv`] reads through to its parent and buffers every write. The
//! parent is only borrowed immutably, so the overlay can shadow live state for
//! a throwaway pre-flight execution, or collect the writes of a whole unit of
//! work that is applied afterwards with [`Changeset::apply`].

use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};

use crate::kv::{range_is_empty, KvRead, KvWrite, Visit};
use crate::StoreError;

/// Buffered writes over a read-only parent. `None` marks a deletion.
pub struct CacheKv<'a> {
    parent: &'a dyn KvRead,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheKv<'a> {
    pub fn new(parent: &'a dyn KvRead) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Whether anything has been written through this overlay.
    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Release the parent borrow and hand back the buffered writes.
    pub fn into_changeset(self) -> Changeset {
        Changeset {
            writes: self.writes.into_iter().collect(),
        }
    }
}

impl KvRead for CacheKv<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.parent.get(key),
        }
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

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        self.parent
            .iterate(lower, upper, &mut |key: &[u8], value: &[u8]| {
                merged.insert(key.to_vec(), value.to_vec());
                ControlFlow::Continue(())
            })?;
        for (key, buffered) in self.writes.range::<[u8], _>((lower, upper)) {
            match buffered {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        for (key, value) in &merged {
            if visit(key, value).is_break() {
                break;
            }
        }
        Ok(())
    }
}

impl KvWrite for CacheKv<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn as_read(&self) -> &dyn KvRead {
        self
    }
}

/// The writes collected by a [`CacheKv`], in key order.
#[derive(Debug, Default)]
pub struct Changeset {
    writes: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl Changeset {
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Write every buffered change into `target`.
    ///
    /// A failure part-way leaves `target` partially written; callers apply
    /// into a store that is itself inside an abortable transaction.
    pub fn apply(self, target: &mut dyn KvWrite) -> Result<(), StoreError> {
        for (key, change) in self.writes {
            match change {
                Some(value) => target.set(&key, &value)?,
                None => target.delete(&key)?,
            }
        }
        Ok(())
    }
}

/// Run `f` as one unit of work over `store`.
///
/// Every write `f` makes goes to an overlay. If `f` returns `Ok`, the overlay
/// is applied to `store`; if it returns `Err`, the overlay is dropped and
/// `store` is left exactly as it was.
pub fn atomically<T, E, F>(store: &mut dyn KvWrite, f: F) -> Result<T, E>
where
    E: From<StoreError>,
    F: FnOnce(&mut dyn KvWrite) -> Result<T, E>,
{
    let mut cache = CacheKv::new(store.as_read());
    let out = f(&mut cache)?;
    let changes = cache.into_changeset();
    tracing::trace!(writes = changes.len(), "applying unit of work");
    changes.apply(store)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MapKv(BTreeMap<Vec<u8>, Vec<u8>>);

    impl KvRead for MapKv {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(self.0.get(key).cloned())
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
            for (k, v) in self.0.range::<[u8], _>((lower, upper)) {
                if visit(k, v).is_break() {
                    break;
                }
            }
            Ok(())
        }
    }

    impl KvWrite for MapKv {
        fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
            self.0.insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
            self.0.remove(key);
            Ok(())
        }

        fn as_read(&self) -> &dyn KvRead {
            self
        }
    }

    fn keys(store: &dyn KvRead, prefix: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        store
            .iterate_prefix(prefix, &mut |k: &[u8], _v: &[u8]| {
                out.push(k.to_vec());
                ControlFlow::Continue(())
            })
            .unwrap();
        out
    }

    #[test]
    fn overlay_shadows_parent() {
        let mut parent = MapKv::default();
        parent.set(b"a1", b"x").unwrap();
        parent.set(b"a2", b"y").unwrap();

        let mut cache = CacheKv::new(&parent);
        cache.delete(b"a1").unwrap();
        cache.set(b"a3", b"z").unwrap();

        assert_eq!(cache.get(b"a1").unwrap(), None);
        assert_eq!(cache.get(b"a2").unwrap(), Some(b"y".to_vec()));
        assert_eq!(keys(&cache, b"a"), vec![b"a2".to_vec(), b"a3".to_vec()]);
        // The parent is untouched until the changeset is applied.
        assert_eq!(keys(&parent, b"a"), vec![b"a1".to_vec(), b"a2".to_vec()]);
    }

    #[test]
    fn dropped_overlay_discards_writes() {
        let parent = MapKv::default();
        {
            let mut cache = CacheKv::new(&parent);
            cache.set(b"k", b"v").unwrap();
            assert!(cache.is_dirty());
        }
        assert_eq!(parent.get(b"k").unwrap(), None);
    }

    #[test]
    fn atomically_commits_on_ok() {
        let mut store = MapKv::default();
        let out: Result<u8, StoreError> = atomically(&mut store, |kv| {
            kv.set(b"k", b"v")?;
            Ok(7)
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn atomically_rolls_back_on_err() {
        let mut store = MapKv::default();
        store.set(b"keep", b"1").unwrap();
        let out: Result<(), StoreError> = atomically(&mut store, |kv| {
            kv.set(b"k", b"v")?;
            kv.delete(b"keep")?;
            Err(StoreError::Corruption("boom".into()))
        });
        assert!(out.is_err());
        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(store.get(b"keep").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn iteration_can_stop_early() {
        let mut store = MapKv::default();
        for i in 0u8..5 {
            store.set(&[0x01, i], &[i]).unwrap();
        }
        let cache = CacheKv::new(&store);
        let mut seen = 0;
        cache
            .iterate_prefix(&[0x01], &mut |_k: &[u8], _v: &[u8]| {
                seen += 1;
                if seen == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(seen, 2);
    }
}
