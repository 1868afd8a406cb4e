//! Boundary to the confidential execution enclave.
//!
//! The enclave runs the bytecode; the keeper only hands it a request and a
//! read-only [`StateView`], and gets back gas usage, an optional VM error and
//! the state diff to apply.

use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, Log, U256};
use auto_impl::auto_impl;
use rust_eth_keeper_state::{StateDiff, StateError, StateView};
use thiserror::Error;
use tracing::trace;

/// Intrinsic gas of a plain call.
pub const TX_GAS: u64 = 21_000;
/// Intrinsic gas of a contract creation.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;

/// Failures reaching or talking to the enclave. These are never VM errors.
#[derive(Debug, Error)]
pub enum EnclaveError {
    #[error("enclave unavailable: {0}")]
    Unavailable(String),
    #[error("enclave rejected request: {0}")]
    InvalidRequest(String),
    #[error("enclave failed to read state: {0}")]
    State(#[from] StateError),
}

/// Block the request executes in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub number: u64,
    pub timestamp: u64,
    /// Proposer of the block.
    pub coinbase: Address,
    pub gas_limit: u64,
}

/// Everything the enclave needs to run one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    /// Opaque, encrypted payload. Carries the caller's public encryption
    /// material and is passed through untouched.
    pub input: Bytes,
    pub access_list: AccessList,
    pub nonce: u64,
    pub chain_id: u64,
    pub block: BlockContext,
    pub base_fee: Option<U256>,
    /// Whether the result will be committed. Dry runs set this to `false`.
    pub commit: bool,
}

impl ExecutionRequest {
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Minimum gas any execution of this request needs.
    pub fn intrinsic_gas(&self) -> u64 {
        if self.is_create() {
            TX_GAS_CONTRACT_CREATION
        } else {
            TX_GAS
        }
    }
}

/// Result of one enclave execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub gas_used: u64,
    /// Set when the VM failed (revert, out of gas, ...). The diff must then be
    /// ignored.
    pub vm_error: Option<String>,
    pub diff: Option<StateDiff>,
    pub output: Bytes,
    pub logs: Vec<Log>,
}

impl ExecutionOutcome {
    pub fn failed(&self) -> bool {
        self.vm_error.is_some()
    }
}

/// Result of a gas estimation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasEstimate {
    pub gas: u64,
    /// Why execution still fails at `gas`, if it does.
    pub vm_error: Option<String>,
}

/// Synchronous, blocking capability to execute messages confidentially.
#[auto_impl(&, Arc, Box)]
pub trait Enclave {
    /// Execute `request` against `state`.
    fn execute(
        &self,
        request: &ExecutionRequest,
        state: &dyn StateView,
    ) -> Result<ExecutionOutcome, EnclaveError>;

    /// Smallest gas limit, at most `gas_cap`, for which `request` executes
    /// without a VM error.
    ///
    /// The default binary-searches [`Enclave::execute`] between the intrinsic
    /// gas and the cap. If execution fails at the cap, the estimate is the cap
    /// together with the VM error.
    fn estimate_gas(
        &self,
        request: &ExecutionRequest,
        state: &dyn StateView,
        gas_cap: u64,
    ) -> Result<GasEstimate, EnclaveError> {
        let intrinsic = request.intrinsic_gas();
        if gas_cap < intrinsic {
            return Ok(GasEstimate {
                gas: gas_cap,
                vm_error: Some(format!("intrinsic gas {intrinsic} exceeds cap {gas_cap}")),
            });
        }

        let mut probe = request.clone();
        probe.commit = false;
        let mut run = |gas_limit: u64| {
            probe.gas_limit = gas_limit;
            self.execute(&probe, state)
        };

        let at_cap = run(gas_cap)?;
        if let Some(vm_error) = at_cap.vm_error {
            return Ok(GasEstimate { gas: gas_cap, vm_error: Some(vm_error) });
        }

        // `lo` always fails (or is below intrinsic gas), `hi` always succeeds
        let mut lo = intrinsic - 1;
        let mut hi = gas_cap;
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            if run(mid)?.failed() {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        trace!(target: "keeper::estimate", gas = hi, "estimated gas");
        Ok(GasEstimate { gas: hi, vm_error: None })
    }

    /// Public key encrypted payloads must be addressed to.
    fn node_public_key(&self) -> Result<Bytes, EnclaveError>;
}
