//! Account store: balances, nonces and code references keyed by address.

use alloy_primitives::{Address, Bytes, B256, I256, U256};
use alloy_trie::KECCAK_EMPTY;
use rust_eth_keeper_common::{account_key, KeyValueStore};
use tracing::{debug, trace};

use crate::{
    Account, AccountChange, AccountDiff, AccountRecord, CodeStore, Ledger, NoLedger, StateDiff,
    StateError, StateView,
};

/// EVM state over a key-value store, consulting `L` for base-ledger accounts.
#[derive(Clone, Debug)]
pub struct StateStore<DB, L = NoLedger> {
    db: DB,
    ledger: L,
}

impl<DB> StateStore<DB, NoLedger> {
    /// State store without a base ledger.
    pub fn new(db: DB) -> Self {
        Self { db, ledger: NoLedger }
    }
}

impl<DB, L> StateStore<DB, L> {
    /// Replace the base ledger.
    pub fn with_ledger<L2>(self, ledger: L2) -> StateStore<DB, L2> {
        StateStore { db: self.db, ledger }
    }

    pub fn db(&self) -> &DB {
        &self.db
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// A view of the same ledger over a different store, typically a
    /// [`StagedStore`](crate::StagedStore) layered over this one.
    pub fn scoped<D2>(&self, db: D2) -> StateStore<D2, &L> {
        StateStore { db, ledger: &self.ledger }
    }
}

impl<DB: KeyValueStore, L: Ledger> StateStore<DB, L> {
    pub fn code_store(&self) -> CodeStore<&DB> {
        CodeStore::new(&self.db)
    }

    /// The EVM account record for `address`, if one exists.
    pub fn get_account(&self, address: Address) -> Result<Option<Account>, StateError> {
        let Some(raw) = self.db.get(&account_key(&address)).map_err(StateError::store)? else {
            return Ok(None);
        };
        Ok(Some(Account::from_rlp(&raw)?))
    }

    /// Resolve `address` against the EVM store and then the base ledger.
    pub fn account_record(&self, address: Address) -> Result<AccountRecord, StateError> {
        if let Some(account) = self.get_account(address)? {
            return Ok(AccountRecord::Evm(account));
        }
        if self.ledger.has_account(address) {
            return Ok(AccountRecord::LedgerOnly);
        }
        Ok(AccountRecord::Missing)
    }

    /// The account, or the empty account (zero balance, no code) when absent.
    pub fn get_account_or_empty(&self, address: Address) -> Result<Account, StateError> {
        Ok(self.account_record(address)?.into_account())
    }

    /// The EVM record with its balance zeroed.
    pub fn get_account_without_balance(
        &self,
        address: Address,
    ) -> Result<Option<Account>, StateError> {
        Ok(self.get_account(address)?.map(|account| account.with_balance(U256::ZERO)))
    }

    /// Whether the EVM store or the base ledger knows `address`.
    pub fn account_exists(&self, address: Address) -> Result<bool, StateError> {
        Ok(self.account_record(address)?.exists())
    }

    /// Write the full EVM record for `address`.
    pub fn set_account(&self, address: Address, account: &Account) -> Result<(), StateError> {
        trace!(target: "state::account", %address, nonce = account.nonce, balance = %account.balance, "writing account");
        self.db.insert(&account_key(&address), account.to_rlp()).map_err(StateError::store)
    }

    pub fn get_balance(&self, address: Address) -> Result<U256, StateError> {
        Ok(self.account_record(address)?.balance())
    }

    pub fn get_nonce(&self, address: Address) -> Result<u64, StateError> {
        Ok(self.get_account_or_empty(address)?.nonce)
    }

    pub fn get_code_hash(&self, address: Address) -> Result<B256, StateError> {
        Ok(self.get_account_or_empty(address)?.code_hash)
    }

    /// Code of `address`; empty for accounts without code. A record that
    /// references a missing blob is reported as [`StateError::MissingCode`].
    pub fn get_account_code(&self, address: Address) -> Result<Bytes, StateError> {
        let code_hash = self.get_code_hash(address)?;
        self.code_store().get_code(code_hash)?.ok_or(StateError::MissingCode(code_hash))
    }

    pub fn is_contract(&self, address: Address) -> Result<bool, StateError> {
        Ok(self.get_code_hash(address)? != KECCAK_EMPTY)
    }

    /// Set the balance of `address`, creating its EVM record if needed.
    /// Negative amounts are rejected and leave state untouched.
    pub fn set_balance(&self, address: Address, amount: I256) -> Result<(), StateError> {
        if amount.is_negative() {
            return Err(StateError::InvalidAmount(amount));
        }
        let account = self.get_account_or_empty(address)?.with_balance(amount.into_raw());
        self.set_account(address, &account)
    }

    /// Credit `amount` to `address`.
    pub fn add_balance(&self, address: Address, amount: U256) -> Result<(), StateError> {
        let account = self.get_account_or_empty(address)?;
        let balance = account.balance.checked_add(amount).ok_or(StateError::BalanceOverflow {
            address,
            balance: account.balance,
            amount,
        })?;
        self.set_account(address, &account.with_balance(balance))
    }

    /// Debit `amount` from `address`, failing if the balance is too low.
    pub fn sub_balance(&self, address: Address, amount: U256) -> Result<(), StateError> {
        let account = self.get_account_or_empty(address)?;
        let balance = account.balance.checked_sub(amount).ok_or_else(|| {
            StateError::InsufficientBalance { address, balance: account.balance, required: amount }
        })?;
        self.set_account(address, &account.with_balance(balance))
    }

    /// Set the nonce of `address`, creating its EVM record if needed.
    pub fn set_nonce(&self, address: Address, nonce: u64) -> Result<(), StateError> {
        let account = self.get_account_or_empty(address)?.with_nonce(nonce);
        self.set_account(address, &account)
    }

    /// Store `code` and point the EVM record of `address` at it. Addresses
    /// without an EVM record are left untouched.
    pub fn set_account_code(&self, address: Address, code: &[u8]) -> Result<(), StateError> {
        let Some(account) = self.get_account(address)? else {
            debug!(target: "state::account", %address, "ignoring code for address without an EVM record");
            return Ok(());
        };
        let code_hash = self.code_store().insert_code(code)?;
        self.set_account(address, &account.with_code_hash(code_hash))
    }

    /// Apply `diff` change by change.
    ///
    /// Changes are written straight to the backing store; wrap the store in a
    /// [`StagedStore`](crate::StagedStore) to apply a diff all-or-nothing.
    pub fn apply_diff(&self, diff: &StateDiff) -> Result<(), StateError> {
        for AccountDiff { address, change } in &diff.accounts {
            match change {
                AccountChange::Destroyed => self.delete_account(*address)?,
                AccountChange::Updated { balance, nonce, code, storage } => {
                    let current = self.get_account_or_empty(*address)?;
                    if *nonce < current.nonce {
                        return Err(StateError::InvalidDiff {
                            address: *address,
                            reason: format!("nonce decreases from {} to {}", current.nonce, nonce),
                        });
                    }
                    let code_hash = match code {
                        Some(code) => self.code_store().insert_code(code)?,
                        None => current.code_hash,
                    };
                    let account = Account { nonce: *nonce, balance: *balance, code_hash };
                    self.set_account(*address, &account)?;
                    for (slot, value) in storage {
                        self.set_state(*address, *slot, *value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<DB: KeyValueStore, L: Ledger> StateView for StateStore<DB, L> {
    fn basic(&self, address: Address) -> Result<Account, StateError> {
        self.get_account_or_empty(address)
    }

    fn code_by_hash(&self, code_hash: B256) -> Result<Option<Bytes>, StateError> {
        self.code_store().get_code(code_hash)
    }

    fn storage(&self, address: Address, slot: B256) -> Result<B256, StateError> {
        self.get_state(address, slot)
    }
}
