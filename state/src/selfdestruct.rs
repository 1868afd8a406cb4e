use alloy_primitives::Address;
use rust_eth_keeper_common::{account_key, storage_prefix, KeyValueStore, StoreBatch};
use tracing::debug;

use crate::{Ledger, StateError, StateStore};

impl<DB: KeyValueStore, L: Ledger> StateStore<DB, L> {
    /// Remove the account record of `address` and every storage slot under it
    /// in one batch. The code blob stays, other accounts may share it.
    ///
    /// Deleting an unknown address is a no-op.
    pub fn delete_account(&self, address: Address) -> Result<(), StateError> {
        let slot_keys = self
            .db()
            .iter_prefix(&storage_prefix(&address))
            .map(|item| item.map(|(key, _)| key))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StateError::store)?;

        let mut batch = self.db().create_batch().map_err(StateError::store)?;
        batch.delete(&account_key(&address)).map_err(StateError::store)?;
        for key in &slot_keys {
            batch.delete(key).map_err(StateError::store)?;
        }
        self.db().batch_commit(batch).map_err(StateError::store)?;

        debug!(target: "state::selfdestruct", %address, slots = slot_keys.len(), "deleted account");
        Ok(())
    }
}
