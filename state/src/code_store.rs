//! Content-addressed code blobs.
//!
//! Code is stored under `0x03 ‖ keccak256(code)` and shared by every account
//! with the same hash. Blobs are never deleted, so removing one account can't
//! orphan code another account still references.

use alloy_primitives::{keccak256, Bytes, B256};
use alloy_trie::KECCAK_EMPTY;
use rust_eth_keeper_common::{code_key, KeyValueStore};
use tracing::trace;

use crate::StateError;

/// Code blob store over a key-value backend.
#[derive(Clone, Debug)]
pub struct CodeStore<DB> {
    db: DB,
}

impl<DB: KeyValueStore> CodeStore<DB> {
    pub fn new(db: DB) -> Self {
        Self { db }
    }

    /// Store `code` under `code_hash`. Writing an existing hash is a no-op.
    pub fn put_code(&self, code_hash: B256, code: &[u8]) -> Result<(), StateError> {
        if code_hash == KECCAK_EMPTY {
            return Ok(());
        }
        let key = code_key(&code_hash);
        if self.db.contains(&key).map_err(StateError::store)? {
            return Ok(());
        }
        trace!(target: "state::code", ?code_hash, len = code.len(), "storing code");
        self.db.insert(&key, code.to_vec()).map_err(StateError::store)
    }

    /// Hash `code` and store it, returning the hash.
    pub fn insert_code(&self, code: &[u8]) -> Result<B256, StateError> {
        let code_hash = if code.is_empty() { KECCAK_EMPTY } else { keccak256(code) };
        self.put_code(code_hash, code)?;
        Ok(code_hash)
    }

    /// Code stored under `code_hash`. The empty-code hash always resolves to
    /// empty bytes; an unknown hash resolves to `None`.
    pub fn get_code(&self, code_hash: B256) -> Result<Option<Bytes>, StateError> {
        if code_hash == KECCAK_EMPTY {
            return Ok(Some(Bytes::new()));
        }
        let code = self.db.get(&code_key(&code_hash)).map_err(StateError::store)?;
        Ok(code.map(Bytes::from))
    }
}
