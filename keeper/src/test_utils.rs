//! Scripted enclave and signing helpers for tests.

use alloy_consensus::{SignableTransaction, Signed, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, Log, Signature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use parking_lot::Mutex;
use rust_eth_keeper_state::{AccountChange, AccountDiff, StateDiff, StateView};

use crate::{Enclave, EnclaveError, ExecutionOutcome, ExecutionRequest, MsgHandleTx, TX_GAS};

/// Public key reported by [`MockEnclave::node_public_key`].
pub const MOCK_NODE_PUBLIC_KEY: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

/// Enclave that moves value like a plain transfer and deploys the call input
/// as code on creation.
///
/// Executions with less gas than [`MockEnclave::with_required_gas`] fail with
/// an out-of-gas VM error. Every request is recorded.
#[derive(Debug)]
pub struct MockEnclave {
    required_gas: u64,
    revert: Option<String>,
    unavailable: bool,
    report_diff: bool,
    extra: Vec<AccountDiff>,
    output: Bytes,
    logs: Vec<Log>,
    requests: Mutex<Vec<ExecutionRequest>>,
}

impl Default for MockEnclave {
    fn default() -> Self {
        Self {
            required_gas: TX_GAS,
            revert: None,
            unavailable: false,
            report_diff: true,
            extra: Vec::new(),
            output: Bytes::new(),
            logs: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockEnclave {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every execution fails with `reason`, still reporting a diff.
    pub fn reverting(reason: impl Into<String>) -> Self {
        Self { revert: Some(reason.into()), ..Self::default() }
    }

    /// Every call fails to reach the enclave.
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    /// Successful executions report no diff at all.
    pub fn without_diff(mut self) -> Self {
        self.report_diff = false;
        self
    }

    /// Gas each execution consumes and needs.
    pub fn with_required_gas(mut self, gas: u64) -> Self {
        self.required_gas = gas;
        self
    }

    /// Append `change` for `address` to every successful diff.
    pub fn with_change(mut self, address: Address, change: AccountChange) -> Self {
        self.extra.push(AccountDiff { address, change });
        self
    }

    pub fn with_output(mut self, output: Bytes) -> Self {
        self.output = output;
        self
    }

    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().clone()
    }

    fn transfer_diff(
        &self,
        request: &ExecutionRequest,
        state: &dyn StateView,
    ) -> Result<StateDiff, EnclaveError> {
        let sender = state.basic(request.from)?;
        let mut diff = StateDiff::default();
        diff.push(
            request.from,
            AccountChange::balance_nonce(sender.balance.saturating_sub(request.value), sender.nonce + 1),
        );

        match request.to {
            Some(to) if to == request.from => {}
            Some(to) => {
                let recipient = state.basic(to)?;
                diff.push(
                    to,
                    AccountChange::balance_nonce(
                        recipient.balance.saturating_add(request.value),
                        recipient.nonce,
                    ),
                );
            }
            None => {
                let created = request.from.create(request.nonce);
                diff.push(
                    created,
                    AccountChange::Updated {
                        balance: request.value,
                        nonce: 1,
                        code: Some(request.input.clone()),
                        storage: Vec::new(),
                    },
                );
            }
        }
        diff.accounts.extend(self.extra.iter().cloned());
        Ok(diff)
    }
}

impl Enclave for MockEnclave {
    fn execute(
        &self,
        request: &ExecutionRequest,
        state: &dyn StateView,
    ) -> Result<ExecutionOutcome, EnclaveError> {
        self.requests.lock().push(request.clone());
        if self.unavailable {
            return Err(EnclaveError::Unavailable("mock enclave is down".to_string()));
        }

        let diff = self.transfer_diff(request, state)?;
        if request.gas_limit < self.required_gas {
            return Ok(ExecutionOutcome {
                gas_used: request.gas_limit,
                vm_error: Some("out of gas".to_string()),
                diff: Some(diff),
                ..Default::default()
            });
        }
        Ok(ExecutionOutcome {
            gas_used: self.required_gas,
            vm_error: self.revert.clone(),
            diff: self.report_diff.then_some(diff),
            output: self.output.clone(),
            logs: self.logs.clone(),
        })
    }

    fn node_public_key(&self) -> Result<Bytes, EnclaveError> {
        if self.unavailable {
            return Err(EnclaveError::Unavailable("mock enclave is down".to_string()));
        }
        Ok(Bytes::from_static(&MOCK_NODE_PUBLIC_KEY))
    }
}

/// Deterministic local signer derived from `seed`.
pub fn test_signer(seed: u8) -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&B256::repeat_byte(seed)).expect("repeated non-zero byte is a valid key")
}

/// Sign `tx` with `signer` and wrap it the way it reaches the keeper.
pub fn sign_tx<T>(signer: &PrivateKeySigner, tx: T) -> MsgHandleTx
where
    T: SignableTransaction<Signature>,
    TxEnvelope: From<Signed<T>>,
{
    let signature = signer.sign_hash_sync(&tx.signature_hash()).expect("local signing succeeds");
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    MsgHandleTx {
        data: envelope.encoded_2718().into(),
        hash: *envelope.tx_hash(),
        from: signer.address(),
    }
}

/// `amount` in wei as a [`U256`].
pub fn wei(amount: u64) -> U256 {
    U256::from(amount)
}
