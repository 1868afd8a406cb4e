//! In-memory ordered key-value store.
//!
//! Backed by a `BTreeMap` so that prefix iteration yields keys in ascending
//! byte order, matching the RocksDB-backed store.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use rust_eth_keeper_common::{KeyValueStore, KvIter, StoreBatch};

/// In-memory batch implementation for MemoryDB
#[derive(Debug, Default)]
pub struct MemoryDBBatch {
    /// Pending operations to be applied
    operations: Vec<(Vec<u8>, Option<Vec<u8>>)>, // (key, value) where None means delete
}

impl MemoryDBBatch {
    /// Create a new empty batch
    pub fn new() -> Self {
        Self::default()
    }

    fn stage(&mut self, key: &[u8], value: Option<Vec<u8>>) {
        // A later operation on the same key replaces the earlier one
        if let Some(pos) = self.operations.iter().position(|(k, _)| k == key) {
            self.operations[pos].1 = value;
        } else {
            self.operations.push((key.to_vec(), value));
        }
    }
}

impl StoreBatch for MemoryDBBatch {
    type Error = Infallible;

    fn insert(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error> {
        self.stage(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.stage(key, None);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn len(&self) -> usize {
        self.operations.len()
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.operations.clear();
        Ok(())
    }
}

/// In-memory key-value store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDB {
    entries: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryDB {
    /// Creates a new empty memory database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all entries from the database.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the number of entries in the database.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Checks if the database is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Apply a batch of operations under a single write lock
    pub fn apply_batch(&self, batch: MemoryDBBatch) {
        let mut entries = self.entries.write();
        for (key, value) in batch.operations {
            match value {
                Some(val) => {
                    entries.insert(key, val);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
    }
}

impl KeyValueStore for MemoryDB {
    type Error = Infallible;
    type Batch = MemoryDBBatch;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn insert(&self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error> {
        self.entries.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.entries.read().contains_key(key))
    }

    fn remove(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_, Self::Error> {
        // Snapshot the range so the read lock is not held across iteration
        let snapshot: Vec<_> = self
            .entries
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| Ok((key.clone(), value.clone())))
            .collect();
        Box::new(snapshot.into_iter())
    }

    fn create_batch(&self) -> Result<Self::Batch, Self::Error> {
        Ok(MemoryDBBatch::new())
    }

    fn batch_commit(&self, batch: Self::Batch) -> Result<(), Self::Error> {
        self.apply_batch(batch);
        Ok(())
    }
}
