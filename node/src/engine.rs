//! Storage engine selection.

use eduvault_nullables::NullStore;
use eduvault_store::{ReadTxn, StorageEngine, StoreError, WriteTxn};
use eduvault_store_lmdb::LmdbEnvironment;
use tracing::info;

use crate::config::{NodeConfig, StorageBackend};
use crate::NodeError;

/// The engine chosen by [`NodeConfig::storage`].
pub enum Engine {
    Lmdb(LmdbEnvironment),
    Memory(NullStore),
}

impl Engine {
    pub fn open(config: &NodeConfig) -> Result<Self, NodeError> {
        let engine = match config.storage {
            StorageBackend::Lmdb => Self::Lmdb(LmdbEnvironment::open(
                &config.data_dir,
                config.lmdb_map_size,
            )?),
            StorageBackend::Memory => {
                Self::Memory(NullStore::with_lock_timeout(config.lock_timeout()))
            }
        };
        info!(backend = engine.name(), "storage engine ready");
        Ok(engine)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lmdb(_) => "lmdb",
            Self::Memory(_) => "memory",
        }
    }
}

impl StorageEngine for Engine {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>,
    {
        match self {
            Self::Lmdb(env) => env.read(f),
            Self::Memory(store) => store.read(f),
        }
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
    {
        match self {
            Self::Lmdb(env) => env.write(f),
            Self::Memory(store) => store.write(f),
        }
    }
}
