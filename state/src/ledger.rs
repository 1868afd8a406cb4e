//! Base-ledger collaborator.
//!
//! The host chain keeps its own account registry. An address it knows about
//! exists for the EVM even before any EVM metadata has been written for it.

use std::collections::HashSet;

use alloy_primitives::Address;
use auto_impl::auto_impl;
use parking_lot::RwLock;

/// Read access to the base ledger's account registry.
#[auto_impl(&, Arc, Box)]
pub trait Ledger {
    /// Whether the base ledger knows `address`.
    fn has_account(&self, address: Address) -> bool;
}

/// Ledger that knows no accounts.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLedger;

impl Ledger for NoLedger {
    fn has_account(&self, _address: Address) -> bool {
        false
    }
}

/// Ledger backed by an in-memory address set.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: RwLock<HashSet<Address>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` with the ledger.
    pub fn register(&self, address: Address) {
        self.accounts.write().insert(address);
    }
}

impl Ledger for InMemoryLedger {
    fn has_account(&self, address: Address) -> bool {
        self.accounts.read().contains(&address)
    }
}
