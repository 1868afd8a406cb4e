//! Confidential transaction dispatcher.
//!
//! [`Keeper::handle_tx`] takes a signed transaction through
//! `Received -> Dispatched -> {Applied | Reverted}`:
//!
//! 1. decode, recover the sender and check the message's own claims
//! 2. check nonce, fee cap and up-front cost against the sender's account
//! 3. hand an [`ExecutionRequest`] to the enclave
//! 4. apply the returned diff and charge gas in one staged batch, or charge
//!    gas only when the VM failed; the sender's nonce advances either way
//!
//! A rejected transaction (any [`DispatchError`]) leaves state untouched.

use std::time::Instant;

use alloy_primitives::{Address, U256};
use rust_eth_keeper_common::{params_key, KeyValueStore};
use rust_eth_keeper_state::{Ledger, NoLedger, StagedStore, StateError, StateStore};
use tracing::{debug, trace, warn};

use crate::{
    base_fee::compute_base_fee,
    keeper_metrics::KeeperMetrics,
    tx::{recover_tx, RecoveredTx},
    BlockContext, DispatchError, Enclave, ExecutionRequest, FeeMarket, KeeperConfig, KeeperError,
    MsgHandleTx, Receipt,
};

/// Name of the keeper params record in the params namespace.
pub const PARAMS_RECORD: &str = "params";

/// EVM keeper over a key-value store `DB`, an execution enclave `E`, a fee
/// market `F` and a base ledger `L`.
pub struct Keeper<DB, E, F, L = NoLedger> {
    pub(crate) state: StateStore<DB, L>,
    pub(crate) enclave: E,
    fee_market: F,
    pub(crate) config: KeeperConfig,
    pub(crate) block: BlockContext,
    block_gas_used: u64,
    pub(crate) metrics: KeeperMetrics,
}

impl<DB, E, F> Keeper<DB, E, F, NoLedger>
where
    DB: KeyValueStore,
    E: Enclave,
    F: FeeMarket,
{
    /// The fee market takes its parameters from `config`.
    pub fn new(db: DB, enclave: E, mut fee_market: F, config: KeeperConfig) -> Self {
        fee_market.set_params(&config.fee_market);
        Self {
            state: StateStore::new(db),
            enclave,
            fee_market,
            config,
            block: BlockContext::default(),
            block_gas_used: 0,
            metrics: KeeperMetrics::default(),
        }
    }

    /// Build a keeper from the params persisted in `db`, falling back to
    /// [`KeeperConfig::default`] when none were stored yet.
    pub fn load(db: DB, enclave: E, fee_market: F) -> Result<Self, KeeperError> {
        let config = read_params(&db)?.unwrap_or_default();
        Ok(Self::new(db, enclave, fee_market, config))
    }
}

impl<DB, E, F, L> Keeper<DB, E, F, L>
where
    DB: KeyValueStore,
    E: Enclave,
    F: FeeMarket,
    L: Ledger,
{
    /// Replace the base ledger consulted for account existence.
    pub fn with_ledger<L2: Ledger>(self, ledger: L2) -> Keeper<DB, E, F, L2> {
        Keeper {
            state: self.state.with_ledger(ledger),
            enclave: self.enclave,
            fee_market: self.fee_market,
            config: self.config,
            block: self.block,
            block_gas_used: self.block_gas_used,
            metrics: self.metrics,
        }
    }

    pub fn state(&self) -> &StateStore<DB, L> {
        &self.state
    }

    pub fn fee_market(&self) -> &F {
        &self.fee_market
    }

    pub fn enclave(&self) -> &E {
        &self.enclave
    }

    /// Block currently being processed.
    pub fn block(&self) -> &BlockContext {
        &self.block
    }

    /// Gas used by the transactions handled in the current block so far.
    pub fn block_gas_used(&self) -> u64 {
        self.block_gas_used
    }

    /// Params the keeper is running with.
    pub fn params(&self) -> &KeeperConfig {
        &self.config
    }

    /// Params persisted in the store, if any.
    pub fn stored_params(&self) -> Result<Option<KeeperConfig>, KeeperError> {
        read_params(self.state.db())
    }

    /// Persist `config` and start using it, fee-market parameters included.
    pub fn set_params(&mut self, config: KeeperConfig) -> Result<(), KeeperError> {
        self.state
            .db()
            .insert(&params_key(PARAMS_RECORD), config.to_rlp())
            .map_err(StateError::store)?;
        debug!(target: "keeper::params", chain_id = config.chain_id, london_block = config.london_block, "updated params");
        self.fee_market.set_params(&config.fee_market);
        self.config = config;
        Ok(())
    }

    /// Start `block`, advancing the fee market.
    pub fn begin_block(&mut self, block: BlockContext) {
        trace!(target: "keeper::block", number = block.number, "begin block");
        self.fee_market.begin_block(block.number);
        self.block = block;
        self.block_gas_used = 0;
    }

    /// Finish the current block, reporting its gas usage to the fee market.
    pub fn end_block(&mut self) {
        trace!(target: "keeper::block", number = self.block.number, gas_used = self.block_gas_used, "end block");
        self.fee_market.end_block(self.block_gas_used, self.block.gas_limit);
    }

    /// Base fee of the current block.
    pub fn base_fee(&self) -> Option<U256> {
        compute_base_fee(&self.fee_market, self.config.london_block, self.block.number)
    }

    /// Dispatch one signed transaction to the enclave and apply its outcome.
    ///
    /// A VM failure is returned as a receipt with `vm_error` set; gas is
    /// charged, the sender's nonce advances and every other change is dropped. Errors mean nothing was
    /// written.
    pub fn handle_tx(&mut self, msg: &MsgHandleTx) -> Result<Receipt, KeeperError> {
        let start = Instant::now();
        let result = self.dispatch(msg);
        self.metrics.record_dispatch_duration(start.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                self.block_gas_used = self.block_gas_used.saturating_add(receipt.gas_used);
                if receipt.is_success() {
                    self.metrics.increment_applied();
                } else {
                    self.metrics.increment_reverted();
                }
            }
            Err(err) => {
                warn!(target: "keeper::dispatch", tx_hash = ?msg.hash, %err, "dispatch failed");
                self.metrics.increment_dispatch_failures();
            }
        }
        result
    }

    fn dispatch(&self, msg: &MsgHandleTx) -> Result<Receipt, KeeperError> {
        let tx = recover_tx(msg, self.config.chain_id)?;
        let base_fee = self.base_fee();
        let gas_price = self.check_sender(&tx, base_fee)?;

        let request = ExecutionRequest {
            from: tx.from,
            to: tx.to,
            value: tx.value,
            gas_limit: tx.gas_limit,
            gas_price,
            input: tx.input.clone(),
            access_list: tx.access_list.clone(),
            nonce: tx.nonce,
            chain_id: tx.chain_id,
            block: self.block,
            base_fee,
            commit: true,
        };
        trace!(target: "keeper::dispatch", tx_hash = ?tx.hash, from = %tx.from, to = ?tx.to, nonce = tx.nonce, "dispatching to enclave");
        let outcome = self.enclave.execute(&request, &self.state).map_err(DispatchError::Enclave)?;

        let gas_used = outcome.gas_used.min(tx.gas_limit);
        let fee = U256::from(gas_used).saturating_mul(U256::from(gas_price));

        let staged = StagedStore::new(self.state.db());
        let scoped = self.state.scoped(&staged);
        match (&outcome.vm_error, &outcome.diff) {
            (None, Some(diff)) => scoped.apply_diff(diff)?,
            (None, None) => {}
            (Some(vm_error), _) => {
                debug!(target: "keeper::dispatch", tx_hash = ?tx.hash, %vm_error, gas_used, "execution failed, dropping state changes");
            }
        }
        // the sender's nonce advances whatever the VM outcome
        let next_nonce = tx.nonce.saturating_add(1);
        if scoped.get_nonce(tx.from)? < next_nonce {
            scoped.set_nonce(tx.from, next_nonce)?;
        }
        if !fee.is_zero() {
            scoped.sub_balance(tx.from, fee)?;
            scoped.add_balance(self.config.fee_collector, fee)?;
        }
        staged.commit()?;

        let contract_address = tx.to.is_none().then(|| tx.from.create(tx.nonce));
        debug!(target: "keeper::dispatch", tx_hash = ?tx.hash, gas_used, ?contract_address, failed = outcome.failed(), "transaction handled");

        Ok(Receipt {
            tx_hash: tx.hash,
            gas_used,
            gas_price,
            vm_error: outcome.vm_error,
            contract_address,
            output: outcome.output,
            logs: outcome.logs,
        })
    }

    /// Check `tx` against its sender's account and return the gas price it
    /// pays under `base_fee`.
    fn check_sender(&self, tx: &RecoveredTx, base_fee: Option<U256>) -> Result<u128, KeeperError> {
        let sender = self.state.get_account_or_empty(tx.from)?;
        if sender.nonce != tx.nonce {
            return Err(DispatchError::NonceMismatch {
                address: tx.from,
                expected: sender.nonce,
                got: tx.nonce,
            }
            .into());
        }

        let intrinsic = if tx.to.is_none() {
            crate::TX_GAS_CONTRACT_CREATION
        } else {
            crate::TX_GAS
        };
        if tx.gas_limit < intrinsic {
            return Err(DispatchError::IntrinsicGasTooLow { gas_limit: tx.gas_limit, intrinsic }.into());
        }

        if let Some(base_fee) = base_fee.filter(|fee| !fee.is_zero()) {
            if U256::from(tx.fee_cap()) < base_fee {
                return Err(DispatchError::FeeCapTooLow { fee_cap: tx.fee_cap(), base_fee }.into());
            }
        }

        let gas_price = tx.effective_gas_price(base_fee);
        let required = tx.max_cost(gas_price);
        if sender.balance < required {
            return Err(DispatchError::InsufficientFunds {
                address: tx.from,
                balance: sender.balance,
                required,
            }
            .into());
        }
        Ok(gas_price)
    }

    /// Address a contract created by `sender` at `nonce` is deployed to.
    pub fn create_address(sender: Address, nonce: u64) -> Address {
        sender.create(nonce)
    }
}

fn read_params<DB: KeyValueStore>(db: &DB) -> Result<Option<KeeperConfig>, KeeperError> {
    let Some(raw) = db.get(&params_key(PARAMS_RECORD)).map_err(StateError::store)? else {
        return Ok(None);
    };
    KeeperConfig::from_rlp(&raw).map(Some).map_err(KeeperError::InvalidParams)
}
