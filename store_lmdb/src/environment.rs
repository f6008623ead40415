//! LMDB environment setup.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbError, ReadView, WriteBatch};

/// Name of the database holding every governance record.
const GOVERNANCE_DB: &str = "governance";

/// Wraps the LMDB environment and the governance database handle.
pub struct LmdbEnvironment {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never modified outside of heed transactions.
        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(max_dbs)
                .map_size(map_size)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(GOVERNANCE_DB))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self { env, db })
    }

    /// Begin a write batch. Nothing is durable until [`WriteBatch::commit`].
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, LmdbError> {
        WriteBatch::new(&self.env, self.db)
    }

    /// Open a consistent read-only view of the current committed state.
    pub fn read_view(&self) -> Result<ReadView<'_>, LmdbError> {
        ReadView::new(&self.env, self.db)
    }
}
