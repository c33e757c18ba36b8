//! Read-only paths: calls, gas estimation and tracing.
mod common;

use aspect_evm::{
    handler::TransactionError,
    primitives::{Bytes, U256},
    test_utils::*,
    JoinPoint, JoinPointKind,
};
use common::*;
use std::time::{Duration, Instant};

#[test]
fn eth_call_persists_nothing() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.evm.runtime.on(
        id,
        JoinPointKind::PreTxExecute,
        Behavior::SetState(b"seen".to_vec(), vec![1]),
    );
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(vec![0x2a]).with_storage(U256::from(1), U256::from(7)),
    );
    let store_size = fx.evm.store.len();
    let block_gas_used = fx.evm.block_gas_used();

    let response = fx.evm.eth_call(call(USER, CONTRACT, 0, Bytes::new())).unwrap();
    assert!(!response.failed(), "{:?}", response.vm_error);
    assert_eq!(response.ret, Bytes::from(vec![0x2a]));
    assert_eq!(fx.evm.runtime.hooks(), vec![(id, JoinPointKind::PreTxExecute)]);

    assert_eq!(fx.storage(CONTRACT, U256::from(1)), U256::ZERO);
    assert_eq!(fx.nonce(USER), 0);
    assert_eq!(fx.evm.store.len(), store_size);
    assert_eq!(fx.evm.block_gas_used(), block_gas_used);
}

#[test]
fn eth_call_into_native_contract_deploys_nothing() {
    let mut fx = Fixture::new();
    let input = deploy_input(USER, JoinPoint::PRE_TX_EXECUTE, Vec::new());
    let response = fx.evm.eth_call(native_call(USER, 0, input)).unwrap();
    assert!(!response.failed(), "{:?}", response.vm_error);
    assert!(fx.evm.store.is_empty());
}

#[test]
fn estimate_gas_finds_the_lowest_passing_limit() {
    let mut fx = Fixture::new();
    fx.evm
        .vm
        .script(CONTRACT, Script::returning(Bytes::new()).with_gas(30_000));
    let msg = call(USER, CONTRACT, 0, Bytes::new());
    assert_eq!(fx.evm.estimate_gas(msg.clone(), None).unwrap(), 51_000);

    // A bound hook costs gas too.
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    let msg = call(USER, CONTRACT, 0, Bytes::new());
    assert_eq!(fx.evm.estimate_gas(msg, None).unwrap(), 51_000 + HOOK_GAS);
}

#[test]
fn estimate_gas_reports_reverts() {
    let mut fx = Fixture::new();
    fx.evm.vm.script(CONTRACT, Script::reverting(Bytes::new()));
    let err = fx
        .evm
        .estimate_gas(call(USER, CONTRACT, 0, Bytes::new()), None)
        .unwrap_err();
    assert!(
        matches!(&err, TransactionError::ExecutionFailed(reason) if reason == "execution reverted"),
        "{err:?}"
    );
}

#[test]
fn estimate_gas_respects_the_cap() {
    let mut fx = Fixture::new();
    fx.evm
        .vm
        .script(CONTRACT, Script::returning(Bytes::new()).with_gas(100_000));
    let err = fx
        .evm
        .estimate_gas(call(USER, CONTRACT, 0, Bytes::new()), Some(60_000))
        .unwrap_err();
    assert!(
        matches!(err, TransactionError::GasAllowanceExceeded(60_000)),
        "{err:?}"
    );
}

#[test]
fn trace_records_the_call_and_hooks() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.evm.vm.script(CONTRACT, Script::returning(vec![0x01]));

    let deadline = Instant::now() + Duration::from_secs(60);
    let result = fx
        .evm
        .trace_tx(call(USER, CONTRACT, 0, vec![0xab]), deadline)
        .unwrap();

    let root = result.trace.root.unwrap();
    assert_eq!(root.from, USER);
    assert_eq!(root.to, Some(CONTRACT));
    assert_eq!(root.input, Bytes::from(vec![0xab]));
    assert_eq!(root.output, Bytes::from(vec![0x01]));
    assert_eq!(root.gas_used, result.response.gas_used);
    assert_eq!(root.error, None);

    assert_eq!(result.trace.hooks.len(), 1);
    assert_eq!(result.trace.hooks[0].join_point, "preTxExecute");
    assert_eq!(result.trace.hooks[0].aspect, id);
    assert_eq!(result.trace.hooks[0].gas_used, HOOK_GAS);
    assert_eq!(fx.nonce(USER), 0);
}

#[test]
fn trace_past_its_deadline_fails() {
    let mut fx = Fixture::new();
    let deadline = Instant::now();
    let err = fx
        .evm
        .trace_tx(call(USER, CONTRACT, 0, Bytes::new()), deadline)
        .unwrap_err();
    assert!(matches!(err, TransactionError::DeadlineExceeded), "{err:?}");
}
