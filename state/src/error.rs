//! Error types for state store operations.

use std::fmt::Display;

use alloy_primitives::{Address, B256, I256, U256};
use thiserror::Error;
use tracing::error;

/// State store error types
#[derive(Debug, Error)]
pub enum StateError {
    /// A signed amount that must not be negative was negative
    #[error("invalid amount: {0}")]
    InvalidAmount(I256),
    /// The underlying key-value store failed
    #[error("store error: {0}")]
    Store(String),
    /// An account record could not be decoded
    #[error("invalid account data: {0}")]
    InvalidAccount(#[from] alloy_rlp::Error),
    /// An account references code that is not in the code store
    #[error("code {0} is referenced but missing from the code store")]
    MissingCode(B256),
    /// A storage entry is not a 32-byte word
    #[error("invalid storage entry for slot {0}")]
    InvalidStorageValue(B256),
    /// A debit exceeds the account's balance
    #[error("insufficient balance for {address}: have {balance}, need {required}")]
    InsufficientBalance { address: Address, balance: U256, required: U256 },
    /// A credit would overflow the account's balance
    #[error("balance overflow for {address}: have {balance}, adding {amount}")]
    BalanceOverflow { address: Address, balance: U256, amount: U256 },
    /// A state diff tried to break an account invariant
    #[error("invalid state diff for {address}: {reason}")]
    InvalidDiff { address: Address, reason: String },
}

impl StateError {
    /// Wrap a backend error, logging it once at the boundary.
    pub fn store<E: Display>(err: E) -> Self {
        error!(target: "state::store", %err, "key-value store operation failed");
        Self::Store(err.to_string())
    }
}
