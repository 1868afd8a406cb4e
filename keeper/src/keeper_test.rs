use alloy_consensus::{TxEip1559, TxLegacy};
use alloy_primitives::{keccak256, Address, Bytes, Log, TxKind, B256, I256, U256};
use alloy_trie::KECCAK_EMPTY;
use pretty_assertions::assert_eq;
use rust_eth_keeper_memorydb::MemoryDB;
use rust_eth_keeper_state::{AccountChange, InMemoryLedger, StateError};

use crate::config::{DEFAULT_CHAIN_ID, DEFAULT_GAS_CAP};
use crate::test_utils::{sign_tx, test_signer, wei, MockEnclave, MOCK_NODE_PUBLIC_KEY};
use crate::*;

const ONE_ETH: u64 = 1_000_000_000_000_000_000;
const MAX_FEE: u128 = 2_000_000_000;
const PRIORITY_FEE: u128 = 500_000_000;
/// Base fee (1 gwei) plus the priority fee.
const GAS_PRICE: u128 = 1_500_000_000;

type TestKeeper = Keeper<MemoryDB, MockEnclave, FeeMarketKeeper>;

fn collector() -> Address {
    Address::repeat_byte(0xfe)
}

fn recipient() -> Address {
    Address::repeat_byte(0x22)
}

fn config() -> KeeperConfig {
    KeeperConfig { fee_collector: collector(), ..Default::default() }
}

fn block(number: u64) -> BlockContext {
    BlockContext {
        number,
        timestamp: 1_700_000_000 + number,
        coinbase: Address::repeat_byte(0xc0),
        gas_limit: 30_000_000,
    }
}

fn keeper_with(enclave: MockEnclave, config: KeeperConfig) -> TestKeeper {
    let fee_market = FeeMarketKeeper::new(config.fee_market.clone());
    let mut keeper = Keeper::new(MemoryDB::new(), enclave, fee_market, config);
    keeper.begin_block(block(1));
    keeper
}

fn keeper(enclave: MockEnclave) -> TestKeeper {
    keeper_with(enclave, config())
}

fn fund(keeper: &TestKeeper, address: Address, amount: u64) {
    keeper.state().set_balance(address, I256::from_raw(wei(amount))).unwrap();
}

fn transfer(nonce: u64, to: Address, value: u64) -> TxEip1559 {
    TxEip1559 {
        chain_id: DEFAULT_CHAIN_ID,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: MAX_FEE,
        max_priority_fee_per_gas: PRIORITY_FEE,
        to: TxKind::Call(to),
        value: wei(value),
        ..Default::default()
    }
}

fn fee(gas: u64, price: u128) -> U256 {
    U256::from(gas) * U256::from(price)
}

#[test]
fn test_transfer_applies_diff_and_charges_fee() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let msg = sign_tx(&signer, transfer(0, recipient(), 1_000));
    let receipt = keeper.handle_tx(&msg).unwrap();

    assert!(receipt.is_success());
    assert_eq!(receipt.tx_hash, msg.hash);
    assert_eq!(receipt.gas_used, 21_000);
    assert_eq!(receipt.gas_price, GAS_PRICE);
    assert_eq!(receipt.contract_address, None);

    let charged = fee(21_000, GAS_PRICE);
    assert_eq!(keeper.balance(signer.address()).unwrap(), wei(ONE_ETH) - wei(1_000) - charged);
    assert_eq!(keeper.nonce(signer.address()).unwrap(), 1);
    assert_eq!(keeper.balance(recipient()).unwrap(), wei(1_000));
    assert_eq!(keeper.balance(collector()).unwrap(), charged);
    assert_eq!(keeper.block_gas_used(), 21_000);
}

#[test]
fn test_request_carries_block_and_fee_context() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let mut tx = transfer(0, recipient(), 7);
    tx.input = Bytes::from_static(b"sealed payload");
    keeper.handle_tx(&sign_tx(&signer, tx)).unwrap();

    let requests = keeper.enclave().requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.from, signer.address());
    assert_eq!(request.to, Some(recipient()));
    assert_eq!(request.value, wei(7));
    assert_eq!(request.gas_limit, 21_000);
    assert_eq!(request.gas_price, GAS_PRICE);
    assert_eq!(request.input, Bytes::from_static(b"sealed payload"));
    assert_eq!(request.nonce, 0);
    assert_eq!(request.chain_id, DEFAULT_CHAIN_ID);
    assert_eq!(request.block, block(1));
    assert_eq!(request.base_fee, Some(U256::from(1_000_000_000u64)));
    assert!(request.commit);
}

#[test]
fn test_contract_creation() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let code = Bytes::from_static(&[0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3]);
    let tx = TxEip1559 {
        gas_limit: 100_000,
        to: TxKind::Create,
        input: code.clone(),
        value: U256::ZERO,
        ..transfer(0, Address::ZERO, 0)
    };
    let receipt = keeper.handle_tx(&sign_tx(&signer, tx)).unwrap();

    let created = signer.address().create(0);
    assert_eq!(receipt.contract_address, Some(created));
    assert_eq!(keeper.code(created).unwrap(), code);
    assert_eq!(keeper.account(created).unwrap().code_hash, keccak256(&code));
    assert_eq!(keeper.code_by_hash(keccak256(&code)).unwrap(), Some(code));
    assert_eq!(keeper.nonce(signer.address()).unwrap(), 1);
}

#[test]
fn test_create_address_depends_on_sender_and_nonce() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let mut created = Vec::new();
    for nonce in 0..2 {
        let tx = TxEip1559 { gas_limit: 60_000, to: TxKind::Create, ..transfer(nonce, Address::ZERO, 0) };
        let receipt = keeper.handle_tx(&sign_tx(&signer, tx)).unwrap();
        created.push(receipt.contract_address.unwrap());
    }

    assert_eq!(created[0], TestKeeper::create_address(signer.address(), 0));
    assert_eq!(created[1], TestKeeper::create_address(signer.address(), 1));
    assert_ne!(created[0], created[1]);
    assert_ne!(created[0], TestKeeper::create_address(test_signer(2).address(), 0));
}

#[test]
fn test_vm_failure_only_charges_gas() {
    let contract = Address::repeat_byte(0x33);
    let enclave = MockEnclave::reverting("execution reverted").with_change(
        contract,
        AccountChange::Updated {
            balance: U256::ZERO,
            nonce: 1,
            code: None,
            storage: vec![(B256::with_last_byte(1), B256::with_last_byte(9))],
        },
    );
    let mut keeper = keeper(enclave);
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let receipt = keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1_000))).unwrap();
    assert_eq!(receipt.vm_error.as_deref(), Some("execution reverted"));
    assert_eq!(receipt.gas_used, 21_000);

    let charged = fee(21_000, GAS_PRICE);
    assert_eq!(keeper.balance(signer.address()).unwrap(), wei(ONE_ETH) - charged);
    assert_eq!(keeper.nonce(signer.address()).unwrap(), 1);
    assert_eq!(keeper.balance(collector()).unwrap(), charged);
    assert_eq!(keeper.balance(recipient()).unwrap(), U256::ZERO);
    assert!(!keeper.state().account_exists(recipient()).unwrap());
    assert!(keeper.account_storage(contract).unwrap().is_empty());
    assert_eq!(keeper.block_gas_used(), 21_000);
}

#[test]
fn test_failed_tx_cannot_be_replayed() {
    let mut keeper = keeper(MockEnclave::reverting("execution reverted"));
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let msg = sign_tx(&signer, transfer(0, recipient(), 1_000));
    keeper.handle_tx(&msg).unwrap();
    let balance = keeper.balance(signer.address()).unwrap();

    for _ in 0..2 {
        let err = keeper.handle_tx(&msg).unwrap_err();
        assert!(matches!(
            err,
            KeeperError::Dispatch(DispatchError::NonceMismatch { expected: 1, got: 0, .. })
        ));
    }
    assert_eq!(keeper.nonce(signer.address()).unwrap(), 1);
    assert_eq!(keeper.balance(signer.address()).unwrap(), balance);
    assert_eq!(keeper.balance(collector()).unwrap(), fee(21_000, GAS_PRICE));
    assert_eq!(keeper.enclave().requests().len(), 1);
}

#[test]
fn test_nonce_advances_without_diff() {
    let mut keeper = keeper(MockEnclave::new().without_diff());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);
    keeper.state().set_nonce(signer.address(), 3).unwrap();

    let msg = sign_tx(&signer, transfer(3, recipient(), 1_000));
    let receipt = keeper.handle_tx(&msg).unwrap();
    assert!(receipt.is_success());
    assert_eq!(keeper.nonce(signer.address()).unwrap(), 4);
    assert_eq!(keeper.balance(signer.address()).unwrap(), wei(ONE_ETH) - fee(21_000, GAS_PRICE));
    assert_eq!(keeper.balance(recipient()).unwrap(), U256::ZERO);

    let err = keeper.handle_tx(&msg).unwrap_err();
    assert!(matches!(err, KeeperError::Dispatch(DispatchError::NonceMismatch { expected: 4, got: 3, .. })));
}

#[test]
fn test_out_of_gas_charges_gas_limit() {
    let mut keeper = keeper(MockEnclave::new().with_required_gas(50_000));
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let tx = TxEip1559 { gas_limit: 30_000, ..transfer(0, recipient(), 1_000) };
    let receipt = keeper.handle_tx(&sign_tx(&signer, tx)).unwrap();

    assert_eq!(receipt.vm_error.as_deref(), Some("out of gas"));
    assert_eq!(receipt.gas_used, 30_000);
    assert_eq!(keeper.balance(signer.address()).unwrap(), wei(ONE_ETH) - fee(30_000, GAS_PRICE));
    assert_eq!(keeper.balance(recipient()).unwrap(), U256::ZERO);
}

#[test]
fn test_enclave_failure_charges_nothing() {
    let mut keeper = keeper(MockEnclave::unavailable());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let err = keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1_000))).unwrap_err();
    assert!(matches!(
        err,
        KeeperError::Dispatch(DispatchError::Enclave(EnclaveError::Unavailable(_)))
    ));
    assert_eq!(keeper.balance(signer.address()).unwrap(), wei(ONE_ETH));
    assert_eq!(keeper.nonce(signer.address()).unwrap(), 0);
    assert_eq!(keeper.balance(collector()).unwrap(), U256::ZERO);
    assert_eq!(keeper.block_gas_used(), 0);
}

#[test]
fn test_nonce_mismatch_is_rejected_before_dispatch() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let err = keeper.handle_tx(&sign_tx(&signer, transfer(5, recipient(), 1))).unwrap_err();
    assert!(matches!(
        err,
        KeeperError::Dispatch(DispatchError::NonceMismatch { expected: 0, got: 5, .. })
    ));
    assert!(keeper.enclave().requests().is_empty());
}

#[test]
fn test_message_checks() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let wrong_chain = TxEip1559 { chain_id: 1, ..transfer(0, recipient(), 1) };
    assert!(matches!(
        keeper.handle_tx(&sign_tx(&signer, wrong_chain)),
        Err(KeeperError::Dispatch(DispatchError::WrongChainId { expected: DEFAULT_CHAIN_ID, got: 1 }))
    ));

    let mut spoofed = sign_tx(&signer, transfer(0, recipient(), 1));
    spoofed.from = Address::repeat_byte(0x77);
    assert!(matches!(
        keeper.handle_tx(&spoofed),
        Err(KeeperError::Dispatch(DispatchError::SenderMismatch { .. }))
    ));

    let mut rehashed = sign_tx(&signer, transfer(0, recipient(), 1));
    rehashed.hash = B256::repeat_byte(0x01);
    assert!(matches!(
        keeper.handle_tx(&rehashed),
        Err(KeeperError::Dispatch(DispatchError::HashMismatch { .. }))
    ));

    let mut garbage = sign_tx(&signer, transfer(0, recipient(), 1));
    garbage.data = Bytes::from_static(&[0x02, 0x01]);
    assert!(matches!(keeper.handle_tx(&garbage), Err(KeeperError::Dispatch(_))));

    assert!(keeper.enclave().requests().is_empty());
    assert_eq!(keeper.balance(signer.address()).unwrap(), wei(ONE_ETH));
}

#[test]
fn test_intrinsic_gas_too_low() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let tx = TxEip1559 { gas_limit: 20_000, ..transfer(0, recipient(), 1) };
    assert!(matches!(
        keeper.handle_tx(&sign_tx(&signer, tx)),
        Err(KeeperError::Dispatch(DispatchError::IntrinsicGasTooLow { gas_limit: 20_000, intrinsic: TX_GAS }))
    ));
}

#[test]
fn test_fee_cap_below_base_fee() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let tx = TxEip1559 {
        max_fee_per_gas: 999_999_999,
        max_priority_fee_per_gas: 0,
        ..transfer(0, recipient(), 1)
    };
    assert!(matches!(
        keeper.handle_tx(&sign_tx(&signer, tx)),
        Err(KeeperError::Dispatch(DispatchError::FeeCapTooLow { fee_cap: 999_999_999, .. }))
    ));
}

#[test]
fn test_insufficient_funds() {
    let mut keeper = keeper(MockEnclave::new());
    let signer = test_signer(1);
    // covers the gas but not the value on top
    let gas_cost: u64 = 21_000 * GAS_PRICE as u64;
    fund(&keeper, signer.address(), gas_cost);

    let err = keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1))).unwrap_err();
    match err {
        KeeperError::Dispatch(DispatchError::InsufficientFunds { address, balance, required }) => {
            assert_eq!(address, signer.address());
            assert_eq!(balance, wei(gas_cost));
            assert_eq!(required, wei(gas_cost) + wei(1));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(keeper.enclave().requests().is_empty());
}

#[test]
fn test_no_base_fee_accepts_free_legacy_tx() {
    let mut config = config();
    config.fee_market.no_base_fee = true;
    let mut keeper = keeper_with(MockEnclave::new(), config);
    let signer = test_signer(1);
    fund(&keeper, signer.address(), 500);
    assert_eq!(keeper.base_fee(), Some(U256::ZERO));

    let tx = TxLegacy {
        chain_id: Some(DEFAULT_CHAIN_ID),
        nonce: 0,
        gas_price: 0,
        gas_limit: 21_000,
        to: TxKind::Call(recipient()),
        value: wei(500),
        ..Default::default()
    };
    let receipt = keeper.handle_tx(&sign_tx(&signer, tx)).unwrap();
    assert_eq!(receipt.gas_price, 0);
    assert_eq!(keeper.balance(signer.address()).unwrap(), U256::ZERO);
    assert_eq!(keeper.balance(recipient()).unwrap(), wei(500));
    assert_eq!(keeper.balance(collector()).unwrap(), U256::ZERO);
}

#[test]
fn test_pre_london_pays_fee_cap() {
    let config = KeeperConfig { london_block: 100, ..config() };
    let mut keeper = keeper_with(MockEnclave::new(), config);
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);
    assert_eq!(keeper.base_fee(), None);

    let receipt = keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1))).unwrap();
    assert_eq!(receipt.gas_price, MAX_FEE);
    assert_eq!(keeper.enclave().requests()[0].base_fee, None);
    assert_eq!(keeper.balance(collector()).unwrap(), fee(21_000, MAX_FEE));
}

#[test]
fn test_destroyed_account_keeps_shared_code() {
    let doomed = Address::repeat_byte(0x33);
    let survivor = Address::repeat_byte(0x44);
    let code = Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x55]);

    let mut keeper = keeper(MockEnclave::new().with_change(doomed, AccountChange::Destroyed));
    let state = keeper.state();
    for address in [doomed, survivor] {
        state.set_nonce(address, 1).unwrap();
        state.set_account_code(address, &code).unwrap();
    }
    state.set_state(doomed, B256::with_last_byte(1), B256::with_last_byte(1)).unwrap();
    state.set_state(doomed, B256::with_last_byte(2), B256::with_last_byte(2)).unwrap();
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1))).unwrap();

    assert_eq!(keeper.account(doomed).unwrap().code_hash, KECCAK_EMPTY);
    assert!(keeper.account_storage(doomed).unwrap().is_empty());
    assert!(!keeper.state().account_exists(doomed).unwrap());
    assert_eq!(keeper.code(survivor).unwrap(), code);
}

#[test]
fn test_storage_changes_in_diff() {
    let contract = Address::repeat_byte(0x33);
    let (kept, cleared) = (B256::with_last_byte(1), B256::with_last_byte(2));
    let enclave = MockEnclave::new().with_change(
        contract,
        AccountChange::Updated {
            balance: U256::ZERO,
            nonce: 1,
            code: None,
            storage: vec![(kept, B256::with_last_byte(0xaa)), (cleared, B256::ZERO)],
        },
    );
    let mut keeper = keeper(enclave);
    keeper.state().set_nonce(contract, 1).unwrap();
    keeper.state().set_state(contract, cleared, B256::with_last_byte(0xbb)).unwrap();
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    keeper.handle_tx(&sign_tx(&signer, transfer(0, contract, 0))).unwrap();

    assert_eq!(keeper.storage(contract, kept).unwrap(), B256::with_last_byte(0xaa));
    assert_eq!(keeper.storage(contract, cleared).unwrap(), B256::ZERO);
    assert_eq!(keeper.account_storage(contract).unwrap(), vec![(kept, B256::with_last_byte(0xaa))]);
}

#[test]
fn test_invalid_diff_leaves_state_untouched() {
    let contract = Address::repeat_byte(0x33);
    let enclave =
        MockEnclave::new().with_change(contract, AccountChange::balance_nonce(U256::ZERO, 1));
    let mut keeper = keeper(enclave);
    keeper.state().set_nonce(contract, 5).unwrap();
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let err = keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1_000))).unwrap_err();
    assert!(matches!(err, KeeperError::State(StateError::InvalidDiff { address, .. }) if address == contract));

    // neither the transfer nor the fee landed
    assert_eq!(keeper.balance(signer.address()).unwrap(), wei(ONE_ETH));
    assert_eq!(keeper.nonce(signer.address()).unwrap(), 0);
    assert_eq!(keeper.balance(recipient()).unwrap(), U256::ZERO);
    assert_eq!(keeper.balance(collector()).unwrap(), U256::ZERO);
    assert_eq!(keeper.nonce(contract).unwrap(), 5);
}

#[test]
fn test_receipt_carries_output_and_logs() {
    let log = Log::new_unchecked(
        recipient(),
        vec![B256::repeat_byte(0x0a)],
        Bytes::from_static(b"event"),
    );
    let enclave = MockEnclave::new()
        .with_output(Bytes::from_static(b"sealed result"))
        .with_logs(vec![log.clone()]);
    let mut keeper = keeper(enclave);
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    let receipt = keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1))).unwrap();
    assert_eq!(receipt.output, Bytes::from_static(b"sealed result"));
    assert_eq!(receipt.logs, vec![log]);
}

#[test]
fn test_estimate_gas() {
    let keeper = keeper(MockEnclave::new().with_required_gas(45_000));
    let from = test_signer(1).address();
    fund(&keeper, from, ONE_ETH);

    let args = CallArgs { from, to: Some(recipient()), value: wei(10), ..Default::default() };
    assert_eq!(keeper.estimate_gas(&args, None).unwrap(), 45_000);

    // dry runs never commit and never write
    assert!(keeper.enclave().requests().iter().all(|request| !request.commit));
    assert_eq!(keeper.balance(from).unwrap(), wei(ONE_ETH));
    assert_eq!(keeper.nonce(from).unwrap(), 0);
    assert_eq!(keeper.balance(recipient()).unwrap(), U256::ZERO);
}

#[test]
fn test_estimate_gas_for_create_starts_at_creation_cost() {
    let keeper = keeper(MockEnclave::new());
    let args = CallArgs { from: test_signer(1).address(), to: None, ..Default::default() };
    assert_eq!(keeper.estimate_gas(&args, None).unwrap(), TX_GAS_CONTRACT_CREATION);
}

#[test]
fn test_estimate_gas_cap_exceeded() {
    let keeper = keeper(MockEnclave::new().with_required_gas(45_000));
    let args = CallArgs { from: test_signer(1).address(), to: Some(recipient()), ..Default::default() };

    match keeper.estimate_gas(&args, Some(40_000)) {
        Err(KeeperError::GasCapExceeded { cap, reason }) => {
            assert_eq!(cap, 40_000);
            assert_eq!(reason, "out of gas");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // a lower per-call gas limit tightens the cap
    let limited = CallArgs { gas: Some(30_000), ..args };
    assert!(matches!(
        keeper.estimate_gas(&limited, None),
        Err(KeeperError::GasCapExceeded { cap: 30_000, .. })
    ));
}

#[test]
fn test_eth_call_does_not_write() {
    let keeper = keeper(MockEnclave::new());
    let from = test_signer(1).address();
    fund(&keeper, from, ONE_ETH);

    let args = CallArgs { from, to: Some(recipient()), value: wei(10), ..Default::default() };
    let outcome = keeper.eth_call(&args).unwrap();
    assert!(!outcome.failed());
    assert!(outcome.diff.is_some());

    let request = &keeper.enclave().requests()[0];
    assert!(!request.commit);
    assert_eq!(request.gas_limit, DEFAULT_GAS_CAP);
    assert_eq!(keeper.balance(from).unwrap(), wei(ONE_ETH));
    assert_eq!(keeper.balance(recipient()).unwrap(), U256::ZERO);
}

#[test]
fn test_node_public_key() {
    assert_eq!(
        keeper(MockEnclave::new()).node_public_key().unwrap(),
        Bytes::from_static(&MOCK_NODE_PUBLIC_KEY)
    );
    assert!(matches!(
        keeper(MockEnclave::unavailable()).node_public_key(),
        Err(KeeperError::Dispatch(DispatchError::Enclave(_)))
    ));
}

#[test]
fn test_params_persist() {
    let db = MemoryDB::new();
    let market = FeeMarketKeeper::new(FeeMarketParams::default());
    let mut keeper = Keeper::new(db.clone(), MockEnclave::new(), market.clone(), config());
    assert_eq!(keeper.stored_params().unwrap(), None);

    let updated = KeeperConfig { chain_id: 1291, london_block: 7, ..config() };
    keeper.set_params(updated.clone()).unwrap();
    assert_eq!(keeper.params(), &updated);
    assert_eq!(keeper.stored_params().unwrap(), Some(updated.clone()));

    let reloaded = Keeper::load(db, MockEnclave::new(), market).unwrap();
    assert_eq!(reloaded.params(), &updated);
}

#[test]
fn test_reload_applies_stored_fee_market_params() {
    let db = MemoryDB::new();
    let market = || FeeMarketKeeper::new(FeeMarketParams::default());

    let mut keeper = Keeper::new(db.clone(), MockEnclave::new(), market(), config());
    let mut params = config();
    params.fee_market.base_fee = U256::from(2_000_000_000u64);
    keeper.set_params(params).unwrap();

    let mut reloaded = Keeper::load(db.clone(), MockEnclave::new(), market()).unwrap();
    reloaded.begin_block(block(1));
    assert_eq!(reloaded.base_fee(), Some(U256::from(2_000_000_000u64)));

    let mut params = config();
    params.fee_market.no_base_fee = true;
    reloaded.set_params(params).unwrap();
    assert_eq!(reloaded.base_fee(), Some(U256::ZERO));

    let mut reloaded = Keeper::load(db, MockEnclave::new(), market()).unwrap();
    reloaded.begin_block(block(1));
    assert!(reloaded.fee_market().no_base_fee());
    assert_eq!(reloaded.base_fee(), Some(U256::ZERO));
}

#[test]
fn test_load_without_params_uses_defaults() {
    let keeper =
        Keeper::load(MemoryDB::new(), MockEnclave::new(), FeeMarketKeeper::new(Default::default()))
            .unwrap();
    assert_eq!(keeper.params(), &KeeperConfig::default());
}

#[test]
fn test_block_gas_drives_base_fee() {
    let mut keeper = keeper(MockEnclave::new());
    keeper.begin_block(BlockContext { gas_limit: 40_000, ..block(1) });
    let signer = test_signer(1);
    fund(&keeper, signer.address(), ONE_ETH);

    keeper.handle_tx(&sign_tx(&signer, transfer(0, recipient(), 1))).unwrap();
    assert_eq!(keeper.block_gas_used(), 21_000);
    keeper.end_block();

    // 1000 gas over a 20000 target: 1 gwei * 1000 / 20000 / 8
    keeper.begin_block(block(2));
    assert_eq!(keeper.base_fee(), Some(U256::from(1_006_250_000u64)));
    assert_eq!(keeper.block_gas_used(), 0);

    // an empty block lowers it again
    keeper.end_block();
    keeper.begin_block(block(3));
    assert!(keeper.base_fee().unwrap() < U256::from(1_006_250_000u64));
}

#[test]
fn test_ledger_accounts_exist_without_evm_record() {
    let ledger = InMemoryLedger::new();
    let known = Address::repeat_byte(0x55);
    ledger.register(known);

    let keeper = keeper(MockEnclave::new()).with_ledger(ledger);
    assert!(keeper.state().account_exists(known).unwrap());
    assert_eq!(keeper.balance(known).unwrap(), U256::ZERO);
    assert!(!keeper.state().account_exists(recipient()).unwrap());
}
