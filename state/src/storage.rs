//! Per-account storage slots.

use std::fmt::Display;

use alloy_primitives::{Address, B256};
use rust_eth_keeper_common::{parse_storage_key, storage_key, storage_prefix, KeyValueStore, KvIter};

use crate::{Ledger, StateError, StateStore};

/// Lazy iterator over one account's storage slots in ascending slot order.
pub struct StorageIter<'a, E> {
    inner: KvIter<'a, E>,
}

impl<E: Display> Iterator for StorageIter<'_, E> {
    type Item = Result<(B256, B256), StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        Some(item.map_err(StateError::store).and_then(|(key, value)| decode_slot(&key, &value)))
    }
}

fn decode_slot(key: &[u8], value: &[u8]) -> Result<(B256, B256), StateError> {
    let (_, slot) = parse_storage_key(key)
        .ok_or_else(|| StateError::Store(format!("malformed storage key {key:02x?}")))?;
    if value.len() != 32 {
        return Err(StateError::InvalidStorageValue(slot));
    }
    Ok((slot, B256::from_slice(value)))
}

impl<DB: KeyValueStore, L: Ledger> StateStore<DB, L> {
    /// Value of `slot` under `address`, zero when unset.
    pub fn get_state(&self, address: Address, slot: B256) -> Result<B256, StateError> {
        let Some(raw) = self.db().get(&storage_key(&address, &slot)).map_err(StateError::store)?
        else {
            return Ok(B256::ZERO);
        };
        if raw.len() != 32 {
            return Err(StateError::InvalidStorageValue(slot));
        }
        Ok(B256::from_slice(&raw))
    }

    /// Write `value` to `slot`. Writing zero deletes the slot.
    pub fn set_state(&self, address: Address, slot: B256, value: B256) -> Result<(), StateError> {
        let key = storage_key(&address, &slot);
        if value.is_zero() {
            self.db().remove(&key).map_err(StateError::store)
        } else {
            self.db().insert(&key, value.to_vec()).map_err(StateError::store)
        }
    }

    /// Iterate the storage of `address` in ascending slot order.
    pub fn storage_iter(&self, address: Address) -> StorageIter<'_, DB::Error> {
        StorageIter { inner: self.db().iter_prefix(&storage_prefix(&address)) }
    }

    /// Visit each storage slot of `address` in ascending slot order until
    /// `visit` returns `false`.
    pub fn for_each_storage<F>(&self, address: Address, mut visit: F) -> Result<(), StateError>
    where
        F: FnMut(B256, B256) -> bool,
    {
        for item in self.storage_iter(address) {
            let (slot, value) = item?;
            if !visit(slot, value) {
                break;
            }
        }
        Ok(())
    }

    /// Every storage slot of `address`, in ascending slot order.
    pub fn get_account_storage(&self, address: Address) -> Result<Vec<(B256, B256)>, StateError> {
        self.storage_iter(address).collect()
    }
}
