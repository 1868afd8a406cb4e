//! Store traits for key-value operations.

use auto_impl::auto_impl;

/// A raw key-value pair as returned by prefix iteration.
pub type KvEntry = (Vec<u8>, Vec<u8>);

/// Boxed, fallible iterator over raw key-value pairs.
pub type KvIter<'a, E> = Box<dyn Iterator<Item = Result<KvEntry, E>> + 'a>;

/// Write batch collected by the caller and applied atomically on commit.
pub trait StoreBatch {
    /// Associated error type for batch operations
    type Error;

    /// Stage an insert of `value` under `key`
    fn insert(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error>;

    /// Stage the removal of `key`
    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error>;

    /// Whether the batch holds no operations
    fn is_empty(&self) -> bool;

    /// Number of staged operations
    fn len(&self) -> usize;

    /// Drop every staged operation
    fn clear(&mut self) -> Result<(), Self::Error>;
}

/// Ordered key-value store backing the account, storage and code namespaces.
///
/// Implementations must iterate keys in ascending byte order so that
/// [`KeyValueStore::iter_prefix`] yields storage slots deterministically.
#[auto_impl(&, Arc)]
pub trait KeyValueStore {
    /// Associated error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Batch type produced by [`KeyValueStore::create_batch`]
    type Batch: StoreBatch<Error = Self::Error>;

    /// Get the value stored under `key`
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Insert `value` under `key`, replacing any previous value
    fn insert(&self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error>;

    /// Check if `key` exists in the store
    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &[u8]) -> Result<(), Self::Error>;

    /// Iterate every entry whose key starts with `prefix`, in ascending key order
    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_, Self::Error>;

    /// Create an empty write batch
    fn create_batch(&self) -> Result<Self::Batch, Self::Error>;

    /// Apply every operation of `batch` atomically
    fn batch_commit(&self, batch: Self::Batch) -> Result<(), Self::Error>;
}
