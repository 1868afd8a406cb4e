//! Keeper and fee-market configuration.

use alloy_primitives::{Address, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAIN_ID: u64 = 9000;
pub const DEFAULT_GAS_CAP: u64 = 25_000_000;
pub const DEFAULT_LONDON_BLOCK: u64 = 0;

pub const DEFAULT_BASE_FEE: u64 = 1_000_000_000;
pub const DEFAULT_BASE_FEE_CHANGE_DENOMINATOR: u64 = 8;
pub const DEFAULT_ELASTICITY_MULTIPLIER: u64 = 2;
pub const DEFAULT_ENABLE_HEIGHT: u64 = 0;

/// EIP-1559 fee-market parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
#[serde(default)]
pub struct FeeMarketParams {
    /// Disables the base fee entirely; London blocks then report a zero base fee.
    pub no_base_fee: bool,
    /// Height from which the fee market is active.
    pub enable_height: u64,
    /// Base fee the market starts from.
    pub base_fee: U256,
    /// Floor for the adjusted base fee.
    pub min_gas_price: U256,
    pub base_fee_change_denominator: u64,
    pub elasticity_multiplier: u64,
}

impl Default for FeeMarketParams {
    fn default() -> Self {
        Self {
            no_base_fee: false,
            enable_height: DEFAULT_ENABLE_HEIGHT,
            base_fee: U256::from(DEFAULT_BASE_FEE),
            min_gas_price: U256::ZERO,
            base_fee_change_denominator: DEFAULT_BASE_FEE_CHANGE_DENOMINATOR,
            elasticity_multiplier: DEFAULT_ELASTICITY_MULTIPLIER,
        }
    }
}

/// Chain parameters the keeper runs with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
#[serde(default)]
pub struct KeeperConfig {
    /// Chain id every transaction must be signed for.
    pub chain_id: u64,
    /// First height at which London rules apply.
    pub london_block: u64,
    /// Recipient of transaction fees.
    pub fee_collector: Address,
    /// Gas cap used by estimation and calls when the caller gives none.
    pub default_gas_cap: u64,
    pub fee_market: FeeMarketParams,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            london_block: DEFAULT_LONDON_BLOCK,
            fee_collector: Address::ZERO,
            default_gas_cap: DEFAULT_GAS_CAP,
            fee_market: FeeMarketParams::default(),
        }
    }
}

impl KeeperConfig {
    /// Encode the config for storage under the params namespace.
    pub fn to_rlp(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    pub fn from_rlp(mut data: &[u8]) -> Result<Self, alloy_rlp::Error> {
        <Self as alloy_rlp::Decodable>::decode(&mut data)
    }
}
