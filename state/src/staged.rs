//! Write overlay for applying a group of changes all-or-nothing.
//!
//! A [`StagedStore`] reads through to its base store and buffers every write.
//! Nothing reaches the base until [`StagedStore::commit`], which lands the
//! buffered writes in a single base batch. Dropping the overlay discards them.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use parking_lot::Mutex;
use rust_eth_keeper_common::{KeyValueStore, KvIter, StoreBatch};
use tracing::trace;

use crate::StateError;

/// Buffered writes, `None` marking a deletion.
type Overlay = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Write overlay over a base store.
#[derive(Debug)]
pub struct StagedStore<'a, DB> {
    base: &'a DB,
    writes: Mutex<Overlay>,
}

impl<'a, DB: KeyValueStore> StagedStore<'a, DB> {
    pub fn new(base: &'a DB) -> Self {
        Self { base, writes: Mutex::new(BTreeMap::new()) }
    }

    /// Number of buffered writes and deletions.
    pub fn len(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.lock().is_empty()
    }

    /// Land every buffered write in the base store as one batch.
    pub fn commit(self) -> Result<(), StateError> {
        let writes = self.writes.into_inner();
        if writes.is_empty() {
            return Ok(());
        }

        let mut batch = self.base.create_batch().map_err(StateError::store)?;
        for (key, value) in &writes {
            let staged = match value {
                Some(value) => batch.insert(key, value.clone()),
                None => batch.delete(key),
            };
            staged.map_err(StateError::store)?;
        }
        self.base.batch_commit(batch).map_err(StateError::store)?;

        trace!(target: "state::staged", writes = writes.len(), "committed staged writes");
        Ok(())
    }

    /// Drop every buffered write.
    pub fn discard(self) {
        trace!(target: "state::staged", writes = self.len(), "discarding staged writes");
    }
}

/// Batch over a [`StagedStore`]; committing it only moves writes into the overlay.
#[derive(Debug)]
pub struct StagedBatch<E> {
    operations: Vec<(Vec<u8>, Option<Vec<u8>>)>,
    _error: PhantomData<fn() -> E>,
}

impl<E> StoreBatch for StagedBatch<E> {
    type Error = E;

    fn insert(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error> {
        self.operations.push((key.to_vec(), Some(value)));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.operations.push((key.to_vec(), None));
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

impl<DB: KeyValueStore> KeyValueStore for StagedStore<'_, DB> {
    type Error = DB::Error;
    type Batch = StagedBatch<DB::Error>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        if let Some(staged) = self.writes.lock().get(key) {
            return Ok(staged.clone());
        }
        self.base.get(key)
    }

    fn insert(&self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error> {
        self.writes.lock().insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error> {
        if let Some(staged) = self.writes.lock().get(key) {
            return Ok(staged.is_some());
        }
        self.base.contains(key)
    }

    fn remove(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.writes.lock().insert(key.to_vec(), None);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_, Self::Error> {
        let mut merged = BTreeMap::new();
        for item in self.base.iter_prefix(prefix) {
            match item {
                Ok((key, value)) => {
                    merged.insert(key, value);
                }
                Err(e) => return Box::new(std::iter::once(Err(e))),
            }
        }

        let writes = self.writes.lock();
        let staged = writes.range(prefix.to_vec()..).take_while(|(key, _)| key.starts_with(prefix));
        for (key, value) in staged {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }
        Box::new(merged.into_iter().map(Ok))
    }

    fn create_batch(&self) -> Result<Self::Batch, Self::Error> {
        Ok(StagedBatch { operations: Vec::new(), _error: PhantomData })
    }

    fn batch_commit(&self, batch: Self::Batch) -> Result<(), Self::Error> {
        let mut writes = self.writes.lock();
        for (key, value) in batch.operations {
            writes.insert(key, value);
        }
        Ok(())
    }
}
