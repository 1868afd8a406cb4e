//! Account, storage and code stores for the confidential EVM keeper.
//!
//! All records live in one ordered [`KeyValueStore`] under prefixed keys (see
//! [`rust_eth_keeper_common::keys`]). [`StateStore`] is the entry point: it
//! resolves an address against both the EVM account records and the
//! base-ledger [`Ledger`], and exposes balance, nonce, code and storage
//! operations on top.
//!
//! [`KeyValueStore`]: rust_eth_keeper_common::KeyValueStore

pub mod account;
pub use account::{Account, AccountRecord, GenesisAccount};

pub mod code_store;
pub use code_store::CodeStore;

pub mod diff;
pub use diff::{AccountChange, AccountDiff, StateDiff};

pub mod error;
pub use error::StateError;

pub mod ledger;
pub use ledger::{InMemoryLedger, Ledger, NoLedger};

mod genesis;
mod selfdestruct;
mod storage;
pub use storage::StorageIter;

pub mod staged;
pub use staged::StagedStore;

mod store;
pub use store::StateStore;

pub mod traits;
pub use traits::StateView;
