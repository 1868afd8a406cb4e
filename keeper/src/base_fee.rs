//! Base fee computation.

use alloy_primitives::U256;

use crate::{FeeMarket, FeeMarketParams};

/// Base fee in effect at `height`.
///
/// - before London: `None`, whatever the fee market says
/// - London with the fee market disabled or `no_base_fee` set: `Some(0)`
/// - otherwise the fee market's current base fee
pub fn compute_base_fee<F: FeeMarket + ?Sized>(
    fee_market: &F,
    london_block: u64,
    height: u64,
) -> Option<U256> {
    if height < london_block {
        return None;
    }
    if !fee_market.enabled() || fee_market.no_base_fee() {
        return Some(U256::ZERO);
    }
    Some(fee_market.current_base_fee())
}

/// EIP-1559 update rule: the base fee moves towards the gas target by at most
/// `1 / base_fee_change_denominator` per block, never below `min_gas_price`.
pub fn calculate_next_base_fee(
    parent_base_fee: U256,
    parent_gas_used: u64,
    parent_gas_limit: u64,
    params: &FeeMarketParams,
) -> U256 {
    let target_gas = parent_gas_limit.checked_div(params.elasticity_multiplier).unwrap_or(0);
    if target_gas == 0 || parent_gas_used == target_gas || params.base_fee_change_denominator == 0 {
        return parent_base_fee.max(params.min_gas_price);
    }

    let target = U256::from(target_gas);
    let denominator = U256::from(params.base_fee_change_denominator);
    let next = if parent_gas_used > target_gas {
        let gas_delta = U256::from(parent_gas_used - target_gas);
        let delta = (parent_base_fee.saturating_mul(gas_delta) / target / denominator).max(U256::from(1));
        parent_base_fee.saturating_add(delta)
    } else {
        let gas_delta = U256::from(target_gas - parent_gas_used);
        let delta = parent_base_fee.saturating_mul(gas_delta) / target / denominator;
        parent_base_fee.saturating_sub(delta)
    };
    next.max(params.min_gas_price)
}
