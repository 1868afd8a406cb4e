use alloy_primitives::Address;

use crate::{Account, GenesisAccount, Ledger, StateError, StateStore};
use rust_eth_keeper_common::KeyValueStore;

impl<DB: KeyValueStore, L: Ledger> StateStore<DB, L> {
    /// Write a genesis account: record, code and non-zero storage slots.
    pub fn import_account(
        &self,
        address: Address,
        genesis: &GenesisAccount,
    ) -> Result<(), StateError> {
        let code_hash = self.code_store().insert_code(&genesis.code)?;
        let account = Account { nonce: genesis.nonce, balance: genesis.balance, code_hash };
        self.set_account(address, &account)?;
        for (slot, value) in &genesis.storage {
            self.set_state(address, *slot, *value)?;
        }
        Ok(())
    }

    /// Read back the full contents of an EVM account.
    pub fn export_account(&self, address: Address) -> Result<Option<GenesisAccount>, StateError> {
        let Some(account) = self.get_account(address)? else {
            return Ok(None);
        };
        let code = self
            .code_store()
            .get_code(account.code_hash)?
            .ok_or(StateError::MissingCode(account.code_hash))?;
        let storage = self.storage_iter(address).collect::<Result<_, _>>()?;
        Ok(Some(GenesisAccount { nonce: account.nonce, balance: account.balance, code, storage }))
    }
}
