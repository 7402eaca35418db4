//! RocksDB-backed [`Storage`] implementation.
//!
//! Writes are staged in memory and only reach RocksDB on [`commit`],
//! via a single [`rocksdb::WriteBatch`] — this is what gives `commit`
//! its atomicity guarantee. Keys and values are encoded with bincode,
//! so any `Serialize + DeserializeOwned` type works.

use std::marker::PhantomData;
use std::path::Path;

use rocksdb::{Options, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Storage, StorageError};

/// Configuration for [`RocksDbStorage`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    pub path: std::path::PathBuf,
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("data/chain-db"),
            create_if_missing: true,
        }
    }
}

pub struct RocksDbStorage<K, V> {
    db: DB,
    dirty: std::collections::HashMap<Vec<u8>, Vec<u8>>,
    closed: bool,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> RocksDbStorage<K, V>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path: &Path = cfg.path.as_path();
        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);

        let db = DB::open(&opts, path).map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self {
            db,
            dirty: std::collections::HashMap::new(),
            closed: false,
            _marker: PhantomData,
        })
    }

    fn encode_key(key: &K) -> Option<Vec<u8>> {
        bincode::serialize(key).ok()
    }

    fn encode_value(value: &V) -> Option<Vec<u8>> {
        bincode::serialize(value).ok()
    }

    fn decode_value(bytes: &[u8]) -> Option<V> {
        bincode::deserialize(bytes).ok()
    }

    /// Enumerates every committed value. Outside the generic [`Storage`]
    /// contract (which has no iteration method by design) but needed to
    /// reconstruct in-memory indexes, such as the block tree, on boot.
    /// Entries that fail to decode are logged and skipped.
    pub fn iter_values(&self) -> Vec<V> {
        self.db
            .iterator(rocksdb::IteratorMode::Start)
            .filter_map(|item| match item {
                Ok((_, bytes)) => match Self::decode_value(&bytes) {
                    Some(v) => Some(v),
                    None => {
                        tracing::warn!("RocksDbStorage::iter_values: skipping undecodable entry");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "RocksDbStorage::iter_values: I/O error");
                    None
                }
            })
            .collect()
    }
}

impl<K, V> Storage<K, V> for RocksDbStorage<K, V>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    fn set(&mut self, key: K, value: V) {
        match (Self::encode_key(&key), Self::encode_value(&value)) {
            (Some(k), Some(v)) => {
                self.dirty.insert(k, v);
            }
            _ => {
                tracing::warn!("RocksDbStorage::set: failed to encode key/value, dropping write");
            }
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        if self.closed {
            return None;
        }
        let Some(k) = Self::encode_key(key) else {
            return None;
        };
        if let Some(bytes) = self.dirty.get(&k) {
            return Self::decode_value(bytes);
        }
        match self.db.get(&k) {
            Ok(Some(bytes)) => Self::decode_value(&bytes),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "RocksDbStorage::get: I/O error, treating as miss");
                None
            }
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        if self.closed {
            return false;
        }
        let Some(k) = Self::encode_key(key) else {
            return false;
        };
        if self.dirty.contains_key(&k) {
            return true;
        }
        matches!(self.db.get(&k), Ok(Some(_)))
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        let mut batch = rocksdb::WriteBatch::default();
        for (k, v) in self.dirty.iter() {
            batch.put(k, v);
        }
        self.db
            .write(batch)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        self.dirty.clear();
        Ok(())
    }

    fn close(&mut self) {
        // commit() is the caller's responsibility; close() only stops
        // serving reads/writes through this handle.
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn commit_persists_and_is_visible_to_get() {
        let tmp = TempDir::new().unwrap();
        let cfg = RocksDbConfig {
            path: tmp.path().to_path_buf(),
            create_if_missing: true,
        };
        let mut store: RocksDbStorage<u64, String> = RocksDbStorage::open(&cfg).unwrap();

        store.set(1, "one".to_string());
        assert_eq!(store.get(&1), Some("one".to_string()));
        store.commit().unwrap();
        assert_eq!(store.get(&1), Some("one".to_string()));
    }

    #[test]
    fn reopen_sees_committed_data() {
        let tmp = TempDir::new().unwrap();
        let cfg = RocksDbConfig {
            path: tmp.path().to_path_buf(),
            create_if_missing: true,
        };
        {
            let mut store: RocksDbStorage<u64, String> = RocksDbStorage::open(&cfg).unwrap();
            store.set(7, "seven".to_string());
            store.commit().unwrap();
        }
        let store: RocksDbStorage<u64, String> = RocksDbStorage::open(&cfg).unwrap();
        assert_eq!(store.get(&7), Some("seven".to_string()));
    }

    #[test]
    fn close_then_get_returns_none() {
        let tmp = TempDir::new().unwrap();
        let cfg = RocksDbConfig {
            path: tmp.path().to_path_buf(),
            create_if_missing: true,
        };
        let mut store: RocksDbStorage<u64, String> = RocksDbStorage::open(&cfg).unwrap();
        store.set(1, "one".to_string());
        store.commit().unwrap();
        store.close();
        assert_eq!(store.get(&1), None);
    }
}
