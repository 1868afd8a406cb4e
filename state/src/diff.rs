//! State diffs reported by the execution enclave.

use alloy_primitives::{Address, Bytes, B256, U256};

/// Ordered account changes produced by one execution. Applied in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub accounts: Vec<AccountDiff>,
}

impl StateDiff {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Append a change for `address`.
    pub fn push(&mut self, address: Address, change: AccountChange) {
        self.accounts.push(AccountDiff { address, change });
    }
}

/// The change applied to a single account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountDiff {
    pub address: Address,
    pub change: AccountChange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountChange {
    /// The account's post-execution balance and nonce, its new code if the
    /// execution deployed any, and the storage slots it wrote. A zero value
    /// deletes the slot.
    Updated { balance: U256, nonce: u64, code: Option<Bytes>, storage: Vec<(B256, B256)> },
    /// The account self-destructed.
    Destroyed,
}

impl AccountChange {
    /// Balance and nonce update that leaves code and storage alone.
    pub fn balance_nonce(balance: U256, nonce: u64) -> Self {
        Self::Updated { balance, nonce, code: None, storage: Vec::new() }
    }
}
