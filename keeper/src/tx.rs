//! Decoding and sender recovery for submitted Ethereum transactions.

use alloy_consensus::transaction::SignerRecoverable;
use alloy_consensus::{Transaction, TxEnvelope};
use alloy_eips::eip2718::{Decodable2718, Eip2718Error};
use alloy_eips::eip2930::AccessList;
use alloy_eips::Typed2718;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};

use crate::DispatchError;

/// Message carrying one signed transaction into the keeper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgHandleTx {
    /// EIP-2718 encoded signed transaction.
    pub data: Bytes,
    /// Claimed transaction hash.
    pub hash: B256,
    /// Claimed sender.
    pub from: Address,
}

/// A decoded transaction with its recovered sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveredTx {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub input: Bytes,
    pub gas_limit: u64,
    /// Legacy and access-list transactions only.
    pub gas_price: Option<u128>,
    /// Dynamic-fee transactions only.
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub access_list: AccessList,
    pub chain_id: u64,
    pub tx_type: u8,
}

impl RecoveredTx {
    /// Highest price per gas the sender agreed to pay.
    pub fn fee_cap(&self) -> u128 {
        self.max_fee_per_gas.or(self.gas_price).unwrap_or_default()
    }

    /// Price per gas actually charged under `base_fee`.
    ///
    /// Dynamic-fee transactions pay `min(max_fee, base_fee + priority_fee)`,
    /// everything else pays its gas price.
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> u128 {
        match (self.max_fee_per_gas, base_fee) {
            (Some(max_fee), Some(base_fee)) => {
                let base_fee = u128::try_from(base_fee).unwrap_or(u128::MAX);
                let priority = self.max_priority_fee_per_gas.unwrap_or_default();
                max_fee.min(base_fee.saturating_add(priority))
            }
            (Some(max_fee), None) => max_fee,
            (None, _) => self.gas_price.unwrap_or_default(),
        }
    }

    /// `gas_limit * price + value`, the balance the sender must hold up front.
    pub fn max_cost(&self, gas_price: u128) -> U256 {
        U256::from(self.gas_limit)
            .saturating_mul(U256::from(gas_price))
            .saturating_add(self.value)
    }
}

/// Decode `msg`, check it against `chain_id` and its own claims, and recover
/// the signer.
pub fn recover_tx(msg: &MsgHandleTx, chain_id: u64) -> Result<RecoveredTx, DispatchError> {
    let envelope = TxEnvelope::decode_2718_exact(&msg.data).map_err(decode_error)?;

    let tx_chain_id = envelope.chain_id().ok_or(DispatchError::MissingChainId)?;
    if tx_chain_id != chain_id {
        return Err(DispatchError::WrongChainId { expected: chain_id, got: tx_chain_id });
    }

    let hash = *envelope.tx_hash();
    if hash != msg.hash {
        return Err(DispatchError::HashMismatch { claimed: msg.hash, computed: hash });
    }

    let from = envelope.recover_signer().map_err(|_| DispatchError::InvalidSignature)?;
    if from != msg.from {
        return Err(DispatchError::SenderMismatch { claimed: msg.from, recovered: from });
    }

    let to = match envelope.kind() {
        TxKind::Call(to) => Some(to),
        TxKind::Create => None,
    };
    let is_dynamic_fee = envelope.is_dynamic_fee();
    Ok(RecoveredTx {
        hash,
        from,
        to,
        nonce: envelope.nonce(),
        value: envelope.value(),
        input: envelope.input().clone(),
        gas_limit: envelope.gas_limit(),
        gas_price: if is_dynamic_fee { None } else { envelope.gas_price() },
        max_fee_per_gas: is_dynamic_fee.then(|| envelope.max_fee_per_gas()),
        max_priority_fee_per_gas: if is_dynamic_fee {
            envelope.max_priority_fee_per_gas()
        } else {
            None
        },
        access_list: envelope.access_list().cloned().unwrap_or_default(),
        chain_id: tx_chain_id,
        tx_type: envelope.ty(),
    })
}

fn decode_error(error: Eip2718Error) -> DispatchError {
    match error {
        Eip2718Error::UnexpectedType(ty) => DispatchError::UnsupportedType(ty),
        Eip2718Error::RlpError(err) => DispatchError::Decode(err),
        _ => DispatchError::Decode(alloy_rlp::Error::Custom("invalid transaction envelope")),
    }
}
