//! LMDB environment setup.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use eduvault_store::{ReadTxn, StorageEngine, StoreError, WriteTxn};

use crate::txn::{LmdbReadTxn, LmdbWriteTxn};
use crate::LmdbError;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

const MAX_DBS: u32 = 4;

/// Handles to every named database in the environment.
#[derive(Clone, Copy)]
pub(crate) struct Databases {
    pub(crate) certificates: Database<Bytes, Bytes>,
    pub(crate) students: Database<Bytes, Bytes>,
    pub(crate) sections: Database<Bytes, Bytes>,
    pub(crate) meta: Database<Bytes, Bytes>,
}

/// Wraps the LMDB environment and all database handles.
///
/// LMDB admits a single write transaction at a time, so every write
/// transaction already holds the equivalent of a lock on every row it reads.
pub struct LmdbEnvironment {
    env: Env,
    dbs: Databases,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment directory is owned by this process; nothing
        // else maps the same files with incompatible flags.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let dbs = Databases {
            certificates: env.create_database(&mut wtxn, Some("certificates"))?,
            students: env.create_database(&mut wtxn, Some("student_statistics"))?,
            sections: env.create_database(&mut wtxn, Some("section_statistics"))?,
            meta: env.create_database(&mut wtxn, Some("meta"))?,
        };
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env,
            dbs,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageEngine for LmdbEnvironment {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>,
    {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| StoreError::from(LmdbError::from(e)))?;
        let view = LmdbReadTxn::new(rtxn, self.dbs);
        f(&view)
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
    {
        let wtxn = self
            .env
            .write_txn()
            .map_err(|e| StoreError::from(LmdbError::from(e)))?;
        let mut txn = LmdbWriteTxn::new(wtxn, self.dbs);
        // Dropping `txn` on the error path aborts the LMDB transaction.
        let out = f(&mut txn)?;
        txn.commit().map_err(StoreError::from)?;
        Ok(out)
    }
}
