//! Generic persistent key-value storage.
//!
//! This is the authenticated backing store cited by the spec: a
//! create-on-open, commit-on-flush, close-on-shutdown map. It backs both
//! the Merkle segment tree ([`crate::merkle`]) and the block tree
//! ([`crate::tree`]), each keyed differently but sharing the same
//! contract.

pub mod mem;
pub mod rocksdb_store;

pub use mem::InMemoryStorage;
pub use rocksdb_store::RocksDbStorage;

/// Storage-level failure. `get`/`set` never propagate this: failures are
/// logged and `get` reports a miss, `set` is best-effort. `commit` is the
/// one place a caller observes `StorageError`, since a failed commit must
/// roll back in-memory state above this layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(String),
    #[error("corrupted entry: {0}")]
    Corrupt(String),
}

/// A persistent key -> value map with explicit commit/close lifecycle.
///
/// - `get` returns `None` on miss *or* on any I/O error; the error itself
///   is logged, never propagated.
/// - `set` marks the entry dirty; it is not guaranteed durable until the
///   next successful `commit`.
/// - `commit` atomically persists all dirty writes and is the only
///   operation that can report [`StorageError`] to the caller.
/// - `close` flushes and releases underlying resources; safe to call
///   more than once.
pub trait Storage<K, V> {
    fn set(&mut self, key: K, value: V);
    fn get(&self, key: &K) -> Option<V>;
    fn contains_key(&self, key: &K) -> bool;
    fn commit(&mut self) -> Result<(), StorageError>;
    fn close(&mut self);
}
