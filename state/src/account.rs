//! Account records and their encoding.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_rlp::{Decodable, RlpDecodable, RlpEncodable};
use alloy_trie::KECCAK_EMPTY;

/// EVM account metadata persisted under the account namespace.
///
/// The record is stored RLP encoded as `[nonce, balance, code_hash]`. Storage
/// slots and code blobs live under their own namespaces and are not part of the
/// record.
///
/// An account whose `code_hash` is [`KECCAK_EMPTY`] has no code and is treated
/// as externally owned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
pub struct Account {
    /// Number of transactions sent from this account, or contracts created by it.
    pub nonce: u64,

    /// Account balance in wei.
    pub balance: U256,

    /// Keccak-256 hash of the account's code, [`KECCAK_EMPTY`] when there is none.
    pub code_hash: B256,
}

impl Default for Account {
    fn default() -> Self {
        Self { nonce: 0, balance: U256::ZERO, code_hash: KECCAK_EMPTY }
    }
}

impl Account {
    /// Set custom nonce
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Set custom balance
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    /// Set custom code_hash
    pub fn with_code_hash(mut self, code_hash: B256) -> Self {
        self.code_hash = code_hash;
        self
    }

    /// Whether the account carries code.
    pub fn is_contract(&self) -> bool {
        self.code_hash != KECCAK_EMPTY
    }

    /// Zero nonce, zero balance and no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && !self.is_contract()
    }

    /// Encode the account as RLP.
    pub fn to_rlp(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Decode an Account from RLP encoded bytes
    pub fn from_rlp(data: &[u8]) -> Result<Self, alloy_rlp::Error> {
        Self::decode(&mut &*data)
    }
}

/// What the keeper knows about an address.
///
/// An address may be unknown, known only to the base ledger (no EVM metadata
/// has been written for it yet), or carry a full EVM account record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccountRecord {
    /// Neither the ledger nor the EVM store knows the address.
    Missing,
    /// The base ledger knows the address but no EVM record exists.
    LedgerOnly,
    /// An EVM account record exists.
    Evm(Account),
}

impl AccountRecord {
    /// Whether the address exists in either store.
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    /// The EVM record, if one exists.
    pub fn as_evm(&self) -> Option<&Account> {
        match self {
            Self::Evm(account) => Some(account),
            _ => None,
        }
    }

    /// Balance of the record; zero without an EVM record.
    pub fn balance(&self) -> U256 {
        self.as_evm().map(|account| account.balance).unwrap_or_default()
    }

    /// Code hash of the record; [`KECCAK_EMPTY`] without an EVM record.
    pub fn code_hash(&self) -> B256 {
        self.as_evm().map_or(KECCAK_EMPTY, |account| account.code_hash)
    }

    /// The EVM record, or the empty account used to seed a fresh one.
    pub fn into_account(self) -> Account {
        match self {
            Self::Evm(account) => account,
            Self::Missing | Self::LedgerOnly => Account::default(),
        }
    }
}

/// Full account contents as imported from or exported to a genesis document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenesisAccount {
    pub nonce: u64,
    pub balance: U256,
    pub code: Bytes,
    pub storage: BTreeMap<B256, B256>,
}

impl GenesisAccount {
    /// Hash the account's code would be stored under.
    pub fn code_hash(&self) -> B256 {
        if self.code.is_empty() {
            KECCAK_EMPTY
        } else {
            keccak256(&self.code)
        }
    }
}
