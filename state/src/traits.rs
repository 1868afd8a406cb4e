//! Read-only state access handed to the execution enclave.

use alloy_primitives::{Address, Bytes, B256};
use auto_impl::auto_impl;

use crate::{Account, StateError};

/// Read view of EVM state, mirroring what an EVM database backend asks for.
#[auto_impl(&, Arc)]
pub trait StateView {
    /// Account metadata, or the empty account when the address is unknown.
    fn basic(&self, address: Address) -> Result<Account, StateError>;

    /// Code stored under `code_hash`.
    fn code_by_hash(&self, code_hash: B256) -> Result<Option<Bytes>, StateError>;

    /// Value of storage `slot` under `address`, zero when unset.
    fn storage(&self, address: Address, slot: B256) -> Result<B256, StateError>;
}
