//! LMDB storage backend for the Tessera governance core.
//!
//! Implements the `tessera-store` contract using the `heed` LMDB bindings. All
//! governance state lives in a single named database inside one environment;
//! keys are prefixed by record kind, so LMDB's byte-ordered B-tree gives the
//! range scans the time-ordered queues rely on.
//!
//! A block is processed inside one [`WriteBatch`]. Committing the batch makes
//! every write durable at once; dropping it aborts the LMDB transaction.

pub mod environment;
pub mod error;
pub mod read_view;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use read_view::ReadView;
pub use write_batch::WriteBatch;

use std::ops::{Bound, ControlFlow};

use heed::types::Bytes;
use heed::{Database, RoTxn};

use tessera_store::{range_is_empty, StoreError, Visit};

/// Shared range walk for read views and write batches.
pub(crate) fn iterate_db(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    visit: Visit<'_>,
) -> Result<(), StoreError> {
    if range_is_empty(lower, upper) {
        return Ok(());
    }
    let bounds = (lower, upper);
    let iter = db.range(txn, &bounds).map_err(LmdbError::from)?;
    for result in iter {
        let (key, value) = result.map_err(LmdbError::from)?;
        if let ControlFlow::Break(()) = visit(key, value) {
            break;
        }
    }
    Ok(())
}
