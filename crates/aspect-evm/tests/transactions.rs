//! Message application: nonces, gas accounting, hook failures and commit atomicity.
mod common;

use aspect_evm::{
    context::Ratio,
    database::{FaultyKeeper, FaultyKvStore},
    handler::TransactionError,
    primitives::{hardfork::SpecId, Bytes, B256, U256},
    test_utils::*,
    AspectStore, JoinPoint, JoinPointKind, Keeper, Message,
};
use common::*;
use rstest::rstest;

fn with_gas(mut msg: Message, gas_limit: u64) -> Message {
    msg.gas_limit = gas_limit;
    msg
}

#[test]
fn creation_uses_and_bumps_the_sender_nonce() {
    let mut fx = Fixture::new();
    let init_code = Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x55]);
    for nonce in 0..2 {
        let msg = Message {
            to: None,
            ..call(USER, CONTRACT, nonce, init_code.clone())
        };
        let result = fx.evm.apply_transaction(msg).unwrap();
        assert!(!result.response.failed(), "{:?}", result.response.vm_error);

        let created = USER.create(nonce);
        assert_eq!(result.response.contract_address, Some(created));
        assert_eq!(result.receipt.contract_address, Some(created));
        assert_eq!(fx.nonce(USER), nonce + 1);

        let info = fx.evm.keeper.account(created).unwrap().unwrap();
        assert_eq!(fx.evm.keeper.code(info.code_hash).unwrap(), Some(init_code.clone()));
    }
    assert!(fx.evm.runtime.hooks().is_empty());
}

#[test]
fn failed_creation_still_bumps_the_nonce() {
    let mut fx = Fixture::new();
    fx.evm.vm.create_gas = TEST_GAS_LIMIT;
    let msg = Message {
        to: None,
        ..call(USER, CONTRACT, 0, Bytes::from_static(&[0x00]))
    };
    let result = fx.evm.apply_transaction(msg).unwrap();
    assert!(result.response.is_out_of_gas());
    assert_eq!(result.response.contract_address, None);
    assert_eq!(fx.nonce(USER), 1);
}

#[test]
fn pre_hook_out_of_gas_consumes_the_gas_limit() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.evm
        .runtime
        .on(id, JoinPointKind::PreTxExecute, Behavior::OutOfGas);

    let result = fx.call(USER, CONTRACT, Bytes::new());
    assert_eq!(result.response.vm_error.as_deref(), Some("out of gas"));
    assert_eq!(result.response.gas_used, TEST_GAS_LIMIT);
    assert!(!result.receipt.status);
    assert_eq!(fx.evm.vm.state_calls().count(), 0);
    assert_eq!(fx.nonce(USER), 1);
}

#[test]
fn pre_hook_revert_skips_the_call() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE | JoinPoint::POST_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.evm
        .runtime
        .on(id, JoinPointKind::PreTxExecute, Behavior::Revert("denied".into()));

    let result = fx.call(USER, CONTRACT, Bytes::new());
    assert_eq!(
        result.response.vm_error.as_deref(),
        Some("aspect reverted: denied")
    );
    assert_eq!(fx.evm.vm.state_calls().count(), 0);
    assert_eq!(fx.evm.runtime.invocations_of(JoinPointKind::PostTxExecute).count(), 0);
}

#[test]
fn post_hook_revert_rolls_back_the_call() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::POST_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(vec![0x01])
            .with_storage(U256::from(1), U256::from(7))
            .with_log(vec![0xee]),
    );
    fx.evm
        .runtime
        .on(id, JoinPointKind::PostTxExecute, Behavior::Revert("nope".into()));

    let result = fx.call(USER, CONTRACT, Bytes::new());
    assert_eq!(result.response.vm_error.as_deref(), Some("aspect reverted: nope"));
    assert!(result.response.logs.is_empty());
    assert!(!result.receipt.status);
    assert_eq!(fx.storage(CONTRACT, U256::from(1)), U256::ZERO);
    // The nonce is bumped before the call and survives the rollback.
    assert_eq!(fx.nonce(USER), 1);
}

#[test]
fn successful_call_commits_storage_and_logs() {
    let mut fx = Fixture::new();
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(Bytes::new())
            .with_storage(U256::from(1), U256::from(7))
            .with_log(vec![0xee]),
    );

    let result = fx.call(USER, CONTRACT, Bytes::new());
    assert!(!result.response.failed());
    assert_eq!(result.response.logs.len(), 1);
    assert_eq!(result.receipt.logs, result.response.logs);
    assert_eq!(fx.storage(CONTRACT, U256::from(1)), U256::from(7));
}

#[test]
fn value_transfer_beyond_balance_fails_the_call() {
    let mut fx = Fixture::new();
    let msg = Message {
        value: INITIAL_BALANCE + U256::from(1),
        ..call(USER, CONTRACT, 0, Bytes::new())
    };
    let result = fx.evm.apply_transaction(msg).unwrap();
    assert_eq!(
        result.response.vm_error.as_deref(),
        Some(INSUFFICIENT_BALANCE)
    );
    assert_eq!(fx.evm.keeper.account(CONTRACT).unwrap().unwrap().balance, U256::ZERO);
}

#[rstest]
#[case::cancun(SpecId::CANCUN, 56_800)]
#[case::london(SpecId::LONDON, 56_800)]
#[case::berlin(SpecId::BERLIN, 51_000)]
fn refund_is_capped_by_fork(#[case] spec: SpecId, #[case] expected: u64) {
    let mut fx = Fixture::new();
    fx.evm.params.spec = spec;
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(Bytes::new()).with_gas(50_000).with_refund(20_000),
    );

    let msg = with_gas(call(USER, CONTRACT, 0, Bytes::new()), 100_000);
    let result = fx.evm.apply_transaction(msg).unwrap();
    assert_eq!(result.response.gas_used, expected);
}

#[test]
fn gas_used_never_drops_below_the_floor() {
    let mut fx = Fixture::new();
    let msg = with_gas(call(USER, CONTRACT, 0, Bytes::new()), 100_000);
    let result = fx.evm.apply_transaction(msg).unwrap();
    assert_eq!(result.response.gas_used, 50_000);

    fx.evm.params.params.min_gas_multiplier = Ratio::new(0, 1);
    let msg = with_gas(call(USER, CONTRACT, 1, Bytes::new()), 100_000);
    let result = fx.evm.apply_transaction(msg).unwrap();
    assert_eq!(result.response.gas_used, 21_000);
}

#[test]
fn malformed_floor_rejects_the_message() {
    let mut fx = Fixture::new();
    fx.evm.params.params.min_gas_multiplier = Ratio::new(3, 2);
    let err = fx
        .evm
        .apply_transaction(call(USER, CONTRACT, 0, Bytes::new()))
        .unwrap_err();
    assert!(matches!(err, TransactionError::InvalidConfig(_)), "{err:?}");
    assert_eq!(fx.nonce(USER), 0);
}

#[test]
fn intrinsic_gas_above_limit_rejects_the_message() {
    let mut fx = Fixture::new();
    let msg = with_gas(call(USER, CONTRACT, 0, vec![1u8; 10]), 21_000);
    let err = fx.evm.apply_transaction(msg).unwrap_err();
    assert!(
        matches!(err, TransactionError::IntrinsicGas { have: 21_000, want: 21_160 }),
        "{err:?}"
    );
}

#[test]
fn disabled_calls_are_rejected() {
    let mut fx = Fixture::new();
    fx.evm.params.params.enable_call = false;
    let err = fx
        .evm
        .apply_transaction(call(USER, CONTRACT, 0, Bytes::new()))
        .unwrap_err();
    assert!(matches!(err, TransactionError::CallDisabled), "{err:?}");
}

#[test]
fn transaction_receipt_and_attributes() {
    let mut fx = Fixture::new();
    fx.evm.vm.script(CONTRACT, Script::reverting(Bytes::new()));
    let gas_price = U256::from(2);
    let msg = Message {
        gas_price,
        hash: B256::repeat_byte(0x42),
        tx_type: 2,
        ..call(USER, CONTRACT, 0, Bytes::new())
    };

    let result = fx.evm.apply_transaction(msg).unwrap();
    let gas_used = result.response.gas_used;
    assert_eq!(gas_used, TEST_GAS_LIMIT / 2);
    assert!(!result.receipt.status);
    assert_eq!(result.receipt.transaction_index, 0);
    assert_eq!(result.receipt.cumulative_gas_used, gas_used);
    assert_eq!(result.receipt.block_number, 1);

    let attributes: Vec<_> = result
        .attributes
        .iter()
        .map(|attribute| (attribute.key, attribute.value.as_str()))
        .collect();
    let hash = B256::repeat_byte(0x42).to_string();
    let gas = gas_used.to_string();
    assert_eq!(
        attributes,
        vec![
            ("ethereumTxHash", hash.as_str()),
            ("txGasUsed", gas.as_str()),
            ("txType", "2"),
            ("ethereumTxFailed", "execution reverted"),
        ]
    );

    // Leftover gas is refunded at the message price.
    let balance = fx.evm.keeper.account(USER).unwrap().unwrap().balance;
    assert_eq!(
        balance,
        INITIAL_BALANCE + gas_price * U256::from(TEST_GAS_LIMIT - gas_used)
    );

    let second = fx.call(USER, CONTRACT, Bytes::new());
    assert_eq!(second.receipt.transaction_index, 1);
    assert_eq!(
        second.receipt.cumulative_gas_used,
        gas_used + second.response.gas_used
    );
    assert_eq!(fx.evm.block_gas_used(), second.receipt.cumulative_gas_used);
}

#[test]
fn keeper_failure_leaves_every_store_untouched() {
    init_tracing();
    let mut db = funded_keeper(&[(OWNER, INITIAL_BALANCE), (USER, INITIAL_BALANCE)]);
    db.insert_code(CONTRACT, Bytes::from_static(CONTRACT_CODE));
    let mut evm = test_evm(FaultyKeeper::new(db));
    evm.vm.script(
        CONTRACT,
        Script::returning(Bytes::new()).with_storage(U256::from(1), U256::from(7)),
    );
    evm.begin_block(test_block(1)).unwrap();

    evm.keeper.fail_next_apply = true;
    let err = evm
        .apply_transaction(call(USER, CONTRACT, 0, Bytes::new()))
        .unwrap_err();
    assert!(matches!(err, TransactionError::Database(_)), "{err:?}");
    assert_eq!(evm.keeper.applied, 0);
    assert_eq!(evm.keeper.storage(CONTRACT, U256::from(1)).unwrap(), U256::ZERO);
    assert_eq!(nonce_of(&mut evm.keeper, USER), 0);
    assert_eq!(evm.block_gas_used(), 0);

    // A native call that fails to commit leaves the registry empty.
    evm.keeper.fail_next_apply = true;
    let deploy = native_call(OWNER, 0, deploy_input(OWNER, JoinPoint::PRE_TX_EXECUTE, Vec::new()));
    let err = evm.apply_transaction(deploy.clone()).unwrap_err();
    assert!(matches!(err, TransactionError::Database(_)), "{err:?}");
    assert!(evm.store.is_empty());

    // Both go through once the keeper recovers.
    let result = evm.apply_transaction(deploy).unwrap();
    assert!(!result.response.failed(), "{:?}", result.response.vm_error);
    let mut store = AspectStore::new(&mut evm.store);
    assert_eq!(store.get_version(OWNER.create(0)).unwrap(), U256::from(1));
    let result = evm
        .apply_transaction(call(USER, CONTRACT, 0, Bytes::new()))
        .unwrap();
    assert!(!result.response.failed());
    assert_eq!(evm.keeper.storage(CONTRACT, U256::from(1)).unwrap(), U256::from(7));
}

#[test]
fn registry_failure_leaves_the_keeper_untouched() {
    init_tracing();
    let keeper = funded_keeper(&[(OWNER, INITIAL_BALANCE)]);
    let mut evm = test_evm_with_store(keeper, FaultyKvStore::default());
    evm.begin_block(test_block(1)).unwrap();

    evm.store.fail_writes = true;
    let deploy = native_call(OWNER, 0, deploy_input(OWNER, JoinPoint::PRE_TX_EXECUTE, Vec::new()));
    let err = evm.apply_transaction(deploy.clone()).unwrap_err();
    assert!(matches!(err, TransactionError::Store(_)), "{err:?}");
    assert_eq!(nonce_of(&mut evm.keeper, OWNER), 0);
    let balance = evm.keeper.account(OWNER).unwrap().unwrap().balance;
    assert_eq!(balance, INITIAL_BALANCE);
    assert!(evm.store.store.is_empty());
    assert_eq!(evm.block_gas_used(), 0);

    evm.store.fail_writes = false;
    let result = evm.apply_transaction(deploy).unwrap();
    assert!(!result.response.failed(), "{:?}", result.response.vm_error);
    assert_eq!(nonce_of(&mut evm.keeper, OWNER), 1);
    let mut store = AspectStore::new(&mut evm.store);
    assert_eq!(store.get_version(OWNER.create(0)).unwrap(), U256::from(1));
}

#[test]
fn exhausted_nonce_rejects_the_message() {
    let mut fx = Fixture::new();
    let err = fx
        .evm
        .apply_transaction(call(USER, CONTRACT, u64::MAX, Bytes::new()))
        .unwrap_err();
    assert!(matches!(err, TransactionError::NonceOverflow(u64::MAX)), "{err:?}");
    assert_eq!(fx.nonce(USER), 0);
    assert!(fx.evm.vm.state_calls().next().is_none());
}
