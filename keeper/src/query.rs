//! Read-only queries. Nothing here writes to the store.

use std::time::Instant;

use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, B256, U256};
use rust_eth_keeper_common::KeyValueStore;
use rust_eth_keeper_state::{Account, Ledger};
use tracing::debug;

use crate::{Enclave, ExecutionOutcome, ExecutionRequest, FeeMarket, Keeper, KeeperError};

/// Arguments of a dry-run call or gas estimation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallArgs {
    pub from: Address,
    /// `None` simulates a contract creation.
    pub to: Option<Address>,
    pub value: U256,
    /// Gas limit; the keeper's default gas cap when unset.
    pub gas: Option<u64>,
    pub gas_price: u128,
    pub input: Bytes,
    pub access_list: AccessList,
}

impl<DB, E, F, L> Keeper<DB, E, F, L>
where
    DB: KeyValueStore,
    E: Enclave,
    F: FeeMarket,
    L: Ledger,
{
    /// The account as the EVM sees it; the empty account when unknown.
    pub fn account(&self, address: Address) -> Result<Account, KeeperError> {
        Ok(self.state.get_account_or_empty(address)?)
    }

    pub fn balance(&self, address: Address) -> Result<U256, KeeperError> {
        Ok(self.state.get_balance(address)?)
    }

    pub fn nonce(&self, address: Address) -> Result<u64, KeeperError> {
        Ok(self.state.get_nonce(address)?)
    }

    pub fn code(&self, address: Address) -> Result<Bytes, KeeperError> {
        Ok(self.state.get_account_code(address)?)
    }

    pub fn code_by_hash(&self, code_hash: B256) -> Result<Option<Bytes>, KeeperError> {
        Ok(self.state.code_store().get_code(code_hash)?)
    }

    pub fn storage(&self, address: Address, slot: B256) -> Result<B256, KeeperError> {
        Ok(self.state.get_state(address, slot)?)
    }

    /// Every non-zero slot of `address` in key order.
    pub fn account_storage(&self, address: Address) -> Result<Vec<(B256, B256)>, KeeperError> {
        Ok(self.state.get_account_storage(address)?)
    }

    /// Public key of the enclave node.
    pub fn node_public_key(&self) -> Result<Bytes, KeeperError> {
        Ok(self.enclave.node_public_key()?)
    }

    /// Execute `args` against current state without committing anything.
    pub fn eth_call(&self, args: &CallArgs) -> Result<ExecutionOutcome, KeeperError> {
        let gas = args.gas.unwrap_or(self.config.default_gas_cap);
        let request = self.call_request(args, gas)?;
        let outcome = self.enclave.execute(&request, &self.state)?;
        debug!(target: "keeper::call", from = %args.from, to = ?args.to, gas_used = outcome.gas_used, failed = outcome.failed(), "eth_call");
        Ok(outcome)
    }

    /// Smallest gas limit under which `args` executes without a VM error.
    ///
    /// The search is capped by `gas_cap`, or the configured default cap, and
    /// further by `args.gas` when set. Failing at the cap is
    /// [`KeeperError::GasCapExceeded`].
    pub fn estimate_gas(&self, args: &CallArgs, gas_cap: Option<u64>) -> Result<u64, KeeperError> {
        let start = Instant::now();
        let mut cap = gas_cap.unwrap_or(self.config.default_gas_cap);
        if let Some(gas) = args.gas {
            cap = cap.min(gas);
        }

        let request = self.call_request(args, cap)?;
        let estimate = self.enclave.estimate_gas(&request, &self.state, cap);
        self.metrics.record_estimate_duration(start.elapsed().as_secs_f64());

        let estimate = estimate?;
        if let Some(reason) = estimate.vm_error {
            debug!(target: "keeper::estimate", cap, %reason, "gas cap exceeded");
            return Err(KeeperError::GasCapExceeded { cap, reason });
        }
        debug!(target: "keeper::estimate", gas = estimate.gas, cap, "estimated gas");
        Ok(estimate.gas)
    }

    fn call_request(&self, args: &CallArgs, gas_limit: u64) -> Result<ExecutionRequest, KeeperError> {
        Ok(ExecutionRequest {
            from: args.from,
            to: args.to,
            value: args.value,
            gas_limit,
            gas_price: args.gas_price,
            input: args.input.clone(),
            access_list: args.access_list.clone(),
            nonce: self.state.get_nonce(args.from)?,
            chain_id: self.config.chain_id,
            block: self.block,
            base_fee: self.base_fee(),
            commit: false,
        })
    }
}
