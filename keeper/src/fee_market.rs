//! Fee-market collaborator.

use alloy_primitives::U256;
use auto_impl::auto_impl;
use tracing::debug;

use crate::{base_fee::calculate_next_base_fee, FeeMarketParams};

/// Fee-market state the keeper reads when pricing transactions.
#[auto_impl(&mut, Box)]
pub trait FeeMarket {
    /// Whether the fee market is active at the current height.
    fn enabled(&self) -> bool;

    /// Whether base fees are switched off altogether.
    fn no_base_fee(&self) -> bool;

    /// Base fee of the current block.
    fn current_base_fee(&self) -> U256;

    /// Called when block `height` starts.
    fn begin_block(&mut self, _height: u64) {}

    /// Called when the current block ends with `gas_used` out of `gas_limit`.
    fn end_block(&mut self, _gas_used: u64, _gas_limit: u64) {}

    /// Adopt the parameters the keeper was configured or reloaded with.
    fn set_params(&mut self, _params: &FeeMarketParams) {}
}

/// In-process fee market driven by [`FeeMarketParams`].
///
/// The base fee is adjusted at the start of each block from the gas usage the
/// previous block reported through [`FeeMarket::end_block`].
#[derive(Clone, Debug)]
pub struct FeeMarketKeeper {
    params: FeeMarketParams,
    height: u64,
    base_fee: U256,
    parent_gas: Option<(u64, u64)>,
}

impl FeeMarketKeeper {
    pub fn new(params: FeeMarketParams) -> Self {
        Self { base_fee: params.base_fee, params, height: 0, parent_gas: None }
    }

    pub fn params(&self) -> &FeeMarketParams {
        &self.params
    }

    pub fn height(&self) -> u64 {
        self.height
    }
}

impl FeeMarket for FeeMarketKeeper {
    fn enabled(&self) -> bool {
        self.height >= self.params.enable_height
    }

    fn no_base_fee(&self) -> bool {
        self.params.no_base_fee
    }

    fn current_base_fee(&self) -> U256 {
        self.base_fee
    }

    fn begin_block(&mut self, height: u64) {
        self.height = height;
        let parent_gas = self.parent_gas.take();
        if self.params.no_base_fee || height <= self.params.enable_height {
            return;
        }
        if let Some((gas_used, gas_limit)) = parent_gas {
            let next = calculate_next_base_fee(self.base_fee, gas_used, gas_limit, &self.params);
            debug!(target: "keeper::fee", height, previous = %self.base_fee, next = %next, "adjusted base fee");
            self.base_fee = next;
        }
    }

    fn end_block(&mut self, gas_used: u64, gas_limit: u64) {
        self.parent_gas = Some((gas_used, gas_limit));
    }

    /// Before the first block the base fee restarts from `params`; once blocks
    /// have run the adjusted base fee is kept.
    fn set_params(&mut self, params: &FeeMarketParams) {
        if self.height == 0 && self.parent_gas.is_none() {
            self.base_fee = params.base_fee;
        }
        self.params = params.clone();
    }
}
