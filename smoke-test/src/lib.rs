//! Shared setup for the end-to-end keeper tests.

use std::path::Path;

use alloy_primitives::{Address, I256, U256};
use once_cell::sync::Lazy;
use rust_eth_keeper::{
    test_utils::MockEnclave, BlockContext, FeeMarketKeeper, Keeper, KeeperConfig, KeeperError,
};
use rust_eth_keeper_pathdb::{PathDB, PathProviderConfig, PathProviderResult};
use rust_eth_keeper_state::StateError;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Keeper over RocksDB with the scripted enclave.
pub type SmokeKeeper = Keeper<PathDB, MockEnclave, FeeMarketKeeper>;

pub const FEE_COLLECTOR: Address = Address::repeat_byte(0xfe);

static TRACING: Lazy<()> = Lazy::new(|| {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_test_writer().try_init();
});

/// Install the test subscriber once. `RUST_LOG=keeper=trace` shows dispatch
/// details.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub fn keeper_config() -> KeeperConfig {
    KeeperConfig { fee_collector: FEE_COLLECTOR, ..Default::default() }
}

/// Open a RocksDB store at `path`.
pub fn open_db(path: &Path) -> PathProviderResult<PathDB> {
    PathDB::new(&path.to_string_lossy(), PathProviderConfig::default())
}

/// Open a keeper at `path`, reusing persisted params when present, and start
/// block `number`.
pub fn open_keeper(
    path: &Path,
    enclave: MockEnclave,
    number: u64,
) -> Result<SmokeKeeper, KeeperError> {
    let db = open_db(path).map_err(StateError::store)?;
    let mut keeper = Keeper::load(db, enclave, FeeMarketKeeper::new(Default::default()))?;
    if keeper.stored_params()?.is_none() {
        keeper.set_params(keeper_config())?;
    }
    keeper.begin_block(BlockContext {
        number,
        timestamp: 1_700_000_000 + number,
        coinbase: Address::repeat_byte(0xc0),
        gas_limit: 30_000_000,
    });
    Ok(keeper)
}

/// Credit `amount` to `address` outside of any transaction.
pub fn fund(keeper: &SmokeKeeper, address: Address, amount: U256) -> Result<(), KeeperError> {
    Ok(keeper.state().set_balance(address, I256::from_raw(amount))?)
}
