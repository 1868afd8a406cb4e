//! EVM keeper that executes transactions in a confidential enclave.
//!
//! The [`Keeper`] owns the state store, the enclave client, the fee market and
//! the base ledger. It prices and validates signed transactions, dispatches
//! them to the [`Enclave`] and applies the returned [`StateDiff`] atomically.
//!
//! [`StateDiff`]: rust_eth_keeper_state::StateDiff

pub mod base_fee;
pub use base_fee::{calculate_next_base_fee, compute_base_fee};

pub mod config;
pub use config::{FeeMarketParams, KeeperConfig};

pub mod enclave;
pub use enclave::{
    BlockContext, Enclave, EnclaveError, ExecutionOutcome, ExecutionRequest, GasEstimate, TX_GAS,
    TX_GAS_CONTRACT_CREATION,
};

pub mod error;
pub use error::{DispatchError, KeeperError};

pub mod fee_market;
pub use fee_market::{FeeMarket, FeeMarketKeeper};

mod keeper;
pub use keeper::{Keeper, PARAMS_RECORD};

mod keeper_metrics;

mod query;
pub use query::CallArgs;

mod receipt;
pub use receipt::Receipt;

pub mod tx;
pub use tx::{recover_tx, MsgHandleTx, RecoveredTx};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod keeper_test;
