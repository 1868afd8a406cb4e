//! PathDB implementation for RocksDB integration.
//!
//! This crate provides a thread-safe key-value store over RocksDB with support for:
//! - Basic key-value operations (get, put, delete)
//! - Atomic write batches
//! - Ordered prefix iteration
//! - A write-through LRU cache in front of point reads
//! - Column Families separating state records from code blobs

pub mod pathdb;
pub mod traits;


pub use pathdb::{PathDB, PathDBBatch};
pub use traits::*;
