//! Read-only snapshot of committed state.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use tessera_store::{KvRead, StoreError, Visit};

use crate::{iterate_db, LmdbError};

/// A consistent view over committed data, backed by an LMDB read transaction.
pub struct ReadView<'a> {
    txn: RoTxn<'a>,
    db: Database<Bytes, Bytes>,
}

impl<'a> ReadView<'a> {
    pub(crate) fn new(env: &'a Env, db: Database<Bytes, Bytes>) -> Result<Self, LmdbError> {
        let txn = env.read_txn()?;
        Ok(Self { txn, db })
    }
}

impl KvRead for ReadView<'_> {
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
