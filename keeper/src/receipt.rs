use alloy_primitives::{Address, Bytes, Log, B256};

/// Outcome of a dispatched transaction.
///
/// A VM failure is still a receipt: gas was charged, `vm_error` says why the
/// state changes were dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub gas_used: u64,
    /// Price per gas that was charged.
    pub gas_price: u128,
    pub vm_error: Option<String>,
    /// Set for contract creations, successful or not.
    pub contract_address: Option<Address>,
    pub output: Bytes,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.vm_error.is_none()
    }
}
