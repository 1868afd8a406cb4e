//! PathDB implementation for RocksDB integration.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use metrics::Counter;
use metrics_derive::Metrics;
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, ReadOptions,
    WriteBatch, WriteOptions, DB,
};
use schnellru::{ByLength, LruMap};
use tracing::{error, trace, warn};

use crate::traits::*;
use rust_eth_keeper_common::{KeyValueStore, KvIter, StoreBatch, CODE_KEY_PREFIX};

const DEFAULT_COLUMN_FAMILY_NAME: &str = "default";
const STATE_COLUMN_FAMILY_NAME: &str = "evm_state";
const CODE_COLUMN_FAMILY_NAME: &str = "evm_code";

const COLUMN_FAMILY_NAMES: [&str; 3] = [
    DEFAULT_COLUMN_FAMILY_NAME,
    STATE_COLUMN_FAMILY_NAME,
    CODE_COLUMN_FAMILY_NAME,
];

/// Code blobs live in their own Column Family, every other namespaced key in
/// the state family. Un-prefixed keys fall back to the default family.
fn column_family_for(key: &[u8]) -> &'static str {
    match key.first() {
        None => DEFAULT_COLUMN_FAMILY_NAME,
        Some(&CODE_KEY_PREFIX) => CODE_COLUMN_FAMILY_NAME,
        Some(_) => STATE_COLUMN_FAMILY_NAME,
    }
}

/// Metrics for the `PathDB`.
#[derive(Metrics, Clone)]
#[metrics(scope = "rust.eth.keeper.pathdb")]
pub(crate) struct PathDBMetrics {
    /// Counter of cache hits
    pub(crate) cache_hits: Counter,
    /// Counter of cache misses
    pub(crate) cache_misses: Counter,
    /// Counter of committed write batches
    pub(crate) batch_commits: Counter,
}

/// Write batch collected for [`PathDB`].
#[derive(Debug, Default)]
pub struct PathDBBatch {
    /// Pending operations in insertion order, `None` meaning delete
    operations: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl StoreBatch for PathDBBatch {
    type Error = PathProviderError;

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

/// PathDB implementation using RocksDB.
pub struct PathDB {
    /// The underlying RocksDB instance.
    db: Arc<DB>,
    /// Configuration for the database.
    config: PathProviderConfig,
    /// Write options for batch operations.
    write_options: WriteOptions,
    /// Read options for read operations.
    read_options: ReadOptions,
    /// Write-through LRU cache for point reads.
    cache: Arc<Mutex<LruMap<Vec<u8>, Vec<u8>, ByLength>>>,
    /// Metrics for the PathDB.
    metrics: PathDBMetrics,
}

impl Debug for PathDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathDB").field("config", &self.config).finish()
    }
}

impl Clone for PathDB {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            config: self.config.clone(),
            write_options: WriteOptions::default(),
            read_options: read_options(&self.config),
            cache: self.cache.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

fn read_options(config: &PathProviderConfig) -> ReadOptions {
    let mut read_options = ReadOptions::default();
    read_options.fill_cache(config.fill_cache);
    read_options.set_readahead_size(config.readahead_size);
    read_options.set_async_io(config.async_io);
    read_options.set_verify_checksums(config.verify_checksums);
    read_options
}

fn column_family_options(config: &PathProviderConfig) -> Options {
    let mut cf_opts = Options::default();
    cf_opts.set_max_write_buffer_number(config.max_write_buffer_number);
    cf_opts.set_write_buffer_size(config.write_buffer_size);
    cf_opts
}

impl PathDB {
    /// Create a new PathDB instance.
    pub fn new(path: &str, config: PathProviderConfig) -> PathProviderResult<Self> {
        let mut db_opts = Options::default();
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_write_buffer_size(config.write_buffer_size);
        db_opts.set_max_write_buffer_number(config.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.target_file_size_base);
        db_opts.set_max_background_jobs(config.max_background_jobs);
        db_opts.create_if_missing(config.create_if_missing);

        // Ensure all required Column Families exist
        ensure_column_families(path, &db_opts, &config)?;

        let cf_descriptors = COLUMN_FAMILY_NAMES
            .iter()
            .map(|cf_name| ColumnFamilyDescriptor::new(*cf_name, column_family_options(&config)));

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)
            .map_err(|e| PathProviderError::Database(format!("Failed to open RocksDB: {}", e)))?;

        trace!(target: "pathdb::rocksdb", "Opened database at path: {}", path);

        Ok(Self {
            db: Arc::new(db),
            write_options: WriteOptions::default(),
            read_options: read_options(&config),
            cache: Arc::new(Mutex::new(LruMap::new(ByLength::new(config.cache_size)))),
            metrics: PathDBMetrics::new_with_labels(&[("instance", "default")]),
            config,
        })
    }

    /// Get the underlying RocksDB instance.
    pub fn inner(&self) -> &Arc<DB> {
        &self.db
    }

    /// Get the configuration.
    pub fn config(&self) -> &PathProviderConfig {
        &self.config
    }

    /// Clear the LRU cache.
    pub fn clear_cache(&self) {
        warn!(target: "pathdb::rocksdb", "Clearing LRU cache");
        self.cache.lock().clear();
    }

    /// Get cache statistics as `(entries, capacity)`.
    pub fn cache_stats(&self) -> (usize, u32) {
        (self.cache.lock().len(), self.config.cache_size)
    }

    /// Replace the metrics instance label.
    pub fn with_new_metrics(&mut self, instance_name: &str) {
        self.metrics = PathDBMetrics::new_with_labels(&[("instance", instance_name.to_string())]);
    }

    fn cf_handle(&self, name: &'static str) -> PathProviderResult<Arc<BoundColumnFamily<'_>>> {
        self.db.cf_handle(name).ok_or(PathProviderError::MissingColumnFamily(name))
    }
}

impl PathProvider for PathDB {
    fn get_raw(&self, key: &[u8]) -> PathProviderResult<Option<Vec<u8>>> {
        trace!(target: "pathdb::rocksdb", "Getting key: {:?}", key);

        // Check cache first
        if let Some(cached_value) = self.cache.lock().peek(key) {
            self.metrics.cache_hits.increment(1);
            return Ok(Some(cached_value.clone()));
        }
        self.metrics.cache_misses.increment(1);

        let cf = self.cf_handle(column_family_for(key))?;
        match self.db.get_cf_opt(&cf, key, &self.read_options) {
            Ok(Some(value)) => {
                self.cache.lock().insert(key.to_vec(), value.clone());
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                error!(target: "pathdb::rocksdb", "Error getting key {:?}: {}", key, e);
                Err(PathProviderError::Database(format!("RocksDB get error: {}", e)))
            }
        }
    }

    fn put_raw(&self, key: &[u8], value: &[u8]) -> PathProviderResult<()> {
        trace!(target: "pathdb::rocksdb", "Putting key: {:?}, value_len: {}", key, value.len());

        let cf = self.cf_handle(column_family_for(key))?;
        match self.db.put_cf_opt(&cf, key, value, &self.write_options) {
            Ok(()) => {
                self.cache.lock().insert(key.to_vec(), value.to_vec());
                Ok(())
            }
            Err(e) => {
                error!(target: "pathdb::rocksdb", "Error putting key {:?}: {}", key, e);
                self.cache.lock().remove(key);
                Err(PathProviderError::Database(format!("RocksDB put error: {}", e)))
            }
        }
    }

    fn delete_raw(&self, key: &[u8]) -> PathProviderResult<()> {
        trace!(target: "pathdb::rocksdb", "Deleting key: {:?}", key);

        self.cache.lock().remove(key);

        let cf = self.cf_handle(column_family_for(key))?;
        self.db.delete_cf_opt(&cf, key, &self.write_options).map_err(|e| {
            error!(target: "pathdb::rocksdb", "Error deleting key {:?}: {}", key, e);
            PathProviderError::Database(format!("RocksDB delete error: {}", e))
        })
    }

    fn exists_raw(&self, key: &[u8]) -> PathProviderResult<bool> {
        if self.cache.lock().peek(key).is_some() {
            self.metrics.cache_hits.increment(1);
            return Ok(true);
        }
        self.metrics.cache_misses.increment(1);

        let cf = self.cf_handle(column_family_for(key))?;
        match self.db.get_pinned_cf_opt(&cf, key, &self.read_options) {
            Ok(value) => Ok(value.is_some()),
            Err(e) => {
                error!(target: "pathdb::rocksdb", "Error checking existence of key {:?}: {}", key, e);
                Err(PathProviderError::Database(format!("RocksDB exists error: {}", e)))
            }
        }
    }
}

impl PathProviderManager for PathDB {
    fn flush(&self) -> PathProviderResult<()> {
        trace!(target: "pathdb::rocksdb", "Flushing database");

        for cf_name in COLUMN_FAMILY_NAMES {
            let cf = self.cf_handle(cf_name)?;
            self.db.flush_cf(&cf).map_err(|e| {
                error!(target: "pathdb::rocksdb", "Error flushing {}: {}", cf_name, e);
                PathProviderError::Database(format!("Flush error: {}", e))
            })?;
        }
        Ok(())
    }

    fn compact(&self) -> PathProviderResult<()> {
        trace!(target: "pathdb::rocksdb", "Compacting database");

        for cf_name in COLUMN_FAMILY_NAMES {
            let cf = self.cf_handle(cf_name)?;
            self.db.compact_range_cf(&cf, None::<&[u8]>, None::<&[u8]>);
        }
        Ok(())
    }
}

impl KeyValueStore for PathDB {
    type Error = PathProviderError;
    type Batch = PathDBBatch;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        self.get_raw(key)
    }

    fn insert(&self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error> {
        self.put_raw(key, &value)
    }

    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error> {
        self.exists_raw(key)
    }

    fn remove(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.delete_raw(key)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_, Self::Error> {
        let cf_name = column_family_for(prefix);
        let cf = match self.cf_handle(cf_name) {
            Ok(cf) => cf,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };

        // Range scans go straight to RocksDB; the cache only serves point reads
        let owned_prefix = prefix.to_vec();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
            .map(|item| {
                item.map(|(key, value)| (key.into_vec(), value.into_vec())).map_err(|e| {
                    error!(target: "pathdb::rocksdb", "Error iterating: {}", e);
                    PathProviderError::Database(format!("RocksDB iterator error: {}", e))
                })
            })
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&owned_prefix),
                Err(_) => true,
            });
        Box::new(iter)
    }

    fn create_batch(&self) -> Result<Self::Batch, Self::Error> {
        Ok(PathDBBatch::default())
    }

    fn batch_commit(&self, batch: Self::Batch) -> Result<(), Self::Error> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut write_batch = WriteBatch::default();
        for (key, value) in &batch.operations {
            let cf = self.cf_handle(column_family_for(key))?;
            match value {
                Some(value) => write_batch.put_cf(&cf, key, value),
                None => write_batch.delete_cf(&cf, key),
            }
        }

        if let Err(e) = self.db.write_opt(write_batch, &self.write_options) {
            error!(target: "pathdb::batch", "Error committing batch of {} operations: {}", batch.len(), e);
            return Err(PathProviderError::Database(format!("Batch commit error: {}", e)));
        }

        // Only refresh the cache once the write is durable
        let mut cache = self.cache.lock();
        for (key, value) in batch.operations {
            match value {
                Some(value) => {
                    cache.insert(key, value);
                }
                None => {
                    cache.remove(key.as_slice());
                }
            }
        }
        self.metrics.batch_commits.increment(1);
        trace!(target: "pathdb::batch", "Successfully committed batch to database");
        Ok(())
    }
}

/// Ensure all required Column Families exist in the database.
/// Creates missing Column Families if they don't exist.
fn ensure_column_families(
    path: &str,
    db_opts: &Options,
    config: &PathProviderConfig,
) -> PathProviderResult<()> {
    // A fresh directory has no CF list yet; it only has the default family
    let existing_cfs = DB::list_cf(db_opts, path)
        .unwrap_or_else(|_| vec![DEFAULT_COLUMN_FAMILY_NAME.to_string()]);
    let existing_cfs_set: HashSet<&str> = existing_cfs.iter().map(String::as_str).collect();

    let missing_cfs: Vec<&str> = COLUMN_FAMILY_NAMES
        .iter()
        .filter(|cf_name| !existing_cfs_set.contains(**cf_name))
        .copied()
        .collect();

    if missing_cfs.is_empty() {
        trace!(target: "pathdb::rocksdb", "All required Column Families already exist");
        return Ok(());
    }

    trace!(
        target: "pathdb::rocksdb",
        "Found {} missing Column Families: {:?}",
        missing_cfs.len(),
        missing_cfs
    );

    // Open database with existing CFs first
    let existing_cf_descriptors = existing_cfs
        .iter()
        .map(|cf_name| ColumnFamilyDescriptor::new(cf_name, column_family_options(config)));

    let temp_db = DB::open_cf_descriptors(db_opts, path, existing_cf_descriptors)
        .map_err(|e| PathProviderError::Database(format!("Failed to open RocksDB: {}", e)))?;

    for cf_name in missing_cfs {
        temp_db.create_cf(cf_name, &column_family_options(config)).map_err(|e| {
            PathProviderError::Database(format!(
                "Failed to create Column Family '{}': {}",
                cf_name, e
            ))
        })?;
        trace!(target: "pathdb::rocksdb", "Created Column Family '{}'", cf_name);
    }

    Ok(())
}
