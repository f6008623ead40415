//! Write batching: one LMDB write transaction per unit of work.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! engine.end_block(&mut batch, &ctx)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use tessera_store::{KvRead, KvWrite, StoreError, Visit};

use crate::{iterate_db, LmdbError};

/// A write batch that groups every store operation of a block into a single
/// LMDB write transaction. Reads observe the batch's own uncommitted writes.
pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    db: Database<Bytes, Bytes>,
    writes: usize,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a Env, db: Database<Bytes, Bytes>) -> Result<Self, LmdbError> {
        let txn = env.write_txn()?;
        Ok(Self { txn, db, writes: 0 })
    }

    /// Number of set/delete operations issued so far.
    pub fn len(&self) -> usize {
        self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes == 0
    }

    /// Commit all operations atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        let writes = self.writes;
        self.txn.commit().map_err(LmdbError::from)?;
        tracing::debug!(writes, "write batch committed");
        Ok(())
    }

    /// Discard all operations. Equivalent to dropping the batch.
    pub fn abort(self) {
        tracing::debug!(writes = self.writes, "write batch aborted");
        self.txn.abort();
    }
}

impl KvRead for WriteBatch<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let value = self.db.get(&self.txn, key).map_err(LmdbError::from)?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn iterate(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        visit: Visit<'_>,
    ) -> Result<(), StoreError> {
        iterate_db(&self.db, &self.txn, lower, upper, visit)
    }
}

impl KvWrite for WriteBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db
            .put(&mut self.txn, key, value)
            .map_err(LmdbError::from)?;
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .delete(&mut self.txn, key)
            .map_err(LmdbError::from)?;
        self.writes += 1;
        Ok(())
    }

    fn as_read(&self) -> &dyn KvRead {
        self
    }
}
