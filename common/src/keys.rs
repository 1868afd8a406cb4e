//! Prefixed key layout for the account, storage and code namespaces.
//!
//! Every key starts with a one-byte namespace prefix so the three record kinds
//! share a single ordered keyspace without colliding:
//!
//! - account: `0x01 ‖ address(20)`
//! - storage: `0x02 ‖ address(20) ‖ slot(32)`
//! - code:    `0x03 ‖ code_hash(32)`
//! - params:  `0x04 ‖ name`
//!
//! Storage keys of one address are contiguous, so prefix iteration over
//! [`storage_prefix`] visits exactly that address's slots in byte order.

use alloy_primitives::{Address, B256};

pub const ACCOUNT_KEY_PREFIX: u8 = 0x01;
pub const STORAGE_KEY_PREFIX: u8 = 0x02;
pub const CODE_KEY_PREFIX: u8 = 0x03;
pub const PARAMS_KEY_PREFIX: u8 = 0x04;
pub const ACCOUNT_KEY_LEN: usize = 21;
pub const STORAGE_KEY_LEN: usize = 53;
pub const CODE_KEY_LEN: usize = 33;

/// Key of the account record for `address`.
pub fn account_key(address: &Address) -> [u8; ACCOUNT_KEY_LEN] {
    let mut out = [0u8; ACCOUNT_KEY_LEN];
    out[0] = ACCOUNT_KEY_PREFIX;
    out[1..].copy_from_slice(address.as_slice());
    out
}

/// Prefix shared by every storage slot of `address`.
pub fn storage_prefix(address: &Address) -> [u8; ACCOUNT_KEY_LEN] {
    let mut out = [0u8; ACCOUNT_KEY_LEN];
    out[0] = STORAGE_KEY_PREFIX;
    out[1..].copy_from_slice(address.as_slice());
    out
}

/// Key of storage `slot` under `address`.
pub fn storage_key(address: &Address, slot: &B256) -> [u8; STORAGE_KEY_LEN] {
    let mut out = [0u8; STORAGE_KEY_LEN];
    out[..ACCOUNT_KEY_LEN].copy_from_slice(&storage_prefix(address));
    out[ACCOUNT_KEY_LEN..].copy_from_slice(slot.as_slice());
    out
}

/// Key of the code blob whose keccak256 is `code_hash`.
pub fn code_key(code_hash: &B256) -> [u8; CODE_KEY_LEN] {
    let mut out = [0u8; CODE_KEY_LEN];
    out[0] = CODE_KEY_PREFIX;
    out[1..].copy_from_slice(code_hash.as_slice());
    out
}

/// Key of the module parameter record `name`.
pub fn params_key(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + name.len());
    out.push(PARAMS_KEY_PREFIX);
    out.extend_from_slice(name.as_bytes());
    out
}

pub fn parse_account_key(raw: &[u8]) -> Option<Address> {
    if raw.len() != ACCOUNT_KEY_LEN || raw[0] != ACCOUNT_KEY_PREFIX {
        return None;
    }
    Some(Address::from_slice(&raw[1..]))
}

pub fn parse_storage_key(raw: &[u8]) -> Option<(Address, B256)> {
    if raw.len() != STORAGE_KEY_LEN || raw[0] != STORAGE_KEY_PREFIX {
        return None;
    }
    let address = Address::from_slice(&raw[1..ACCOUNT_KEY_LEN]);
    let slot = B256::from_slice(&raw[ACCOUNT_KEY_LEN..]);
    Some((address, slot))
}
