//! Common traits and types for the keeper's key-value stores.
//!
//! This crate provides the store interface that every backend implements and
//! the prefixed key layout used for accounts, storage slots and code blobs.

/// Store traits for key-value operations.
mod traits;
pub use traits::{KeyValueStore, KvEntry, KvIter, StoreBatch};

/// Prefixed key layout.
pub mod keys;
pub use keys::{
    account_key, code_key, params_key, parse_account_key, parse_storage_key, storage_key,
    storage_prefix, ACCOUNT_KEY_PREFIX, CODE_KEY_PREFIX, PARAMS_KEY_PREFIX, STORAGE_KEY_PREFIX,
};
