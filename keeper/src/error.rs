//! Keeper error types.

use alloy_primitives::{Address, B256, U256};
use rust_eth_keeper_state::StateError;
use thiserror::Error;

use crate::EnclaveError;

/// Errors returned by keeper operations.
#[derive(Debug, Error)]
pub enum KeeperError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// No gas limit at or under `cap` lets the execution succeed.
    #[error("gas required exceeds allowance ({cap}): {reason}")]
    GasCapExceeded { cap: u64, reason: String },
    /// Stored keeper params could not be decoded.
    #[error("invalid stored params: {0}")]
    InvalidParams(alloy_rlp::Error),
}

impl From<EnclaveError> for KeeperError {
    fn from(err: EnclaveError) -> Self {
        Self::Dispatch(DispatchError::Enclave(err))
    }
}

/// Reasons a transaction is rejected before any state changes. None of them
/// charges a fee.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to decode transaction: {0}")]
    Decode(alloy_rlp::Error),
    #[error("unsupported transaction type {0}")]
    UnsupportedType(u8),
    #[error("transaction is not replay protected")]
    MissingChainId,
    #[error("wrong chain id: expected {expected}, got {got}")]
    WrongChainId { expected: u64, got: u64 },
    #[error("invalid transaction signature")]
    InvalidSignature,
    #[error("sender mismatch: claimed {claimed}, recovered {recovered}")]
    SenderMismatch { claimed: Address, recovered: Address },
    #[error("hash mismatch: claimed {claimed}, computed {computed}")]
    HashMismatch { claimed: B256, computed: B256 },
    #[error("nonce mismatch for {address}: expected {expected}, got {got}")]
    NonceMismatch { address: Address, expected: u64, got: u64 },
    #[error("fee cap {fee_cap} below base fee {base_fee}")]
    FeeCapTooLow { fee_cap: u128, base_fee: U256 },
    #[error("insufficient funds for {address}: have {balance}, need {required}")]
    InsufficientFunds { address: Address, balance: U256, required: U256 },
    #[error("intrinsic gas too low: have {gas_limit}, need {intrinsic}")]
    IntrinsicGasTooLow { gas_limit: u64, intrinsic: u64 },
    #[error(transparent)]
    Enclave(#[from] EnclaveError),
}
