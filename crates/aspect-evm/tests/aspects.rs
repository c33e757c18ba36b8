//! Aspect lifecycle driven through transactions: deployment, binding and hook dispatch.
mod common;

use alloy_sol_types::SolValue;
use aspect_evm::{
    aspect::{AspectMethod, CallInfo, HookInput},
    handler::TransactionError,
    primitives::{Bytes, B256, U256},
    test_utils::*,
    AspectStore, JoinPoint, JoinPointKind, Message,
};
use common::*;
use rstest::rstest;

#[test]
fn hooks_wrap_the_contract_call() {
    let mut fx = Fixture::new();
    let join_points = JoinPoint::PRE_TX_EXECUTE | JoinPoint::POST_TX_EXECUTE;
    assert_eq!(join_points.bits(), 18);
    let id = fx.deploy(join_points);
    fx.bind(id, CONTRACT, 0);
    fx.evm
        .vm
        .script(CONTRACT, Script::returning(vec![0xaa]).with_gas(5_000));

    let result = fx.call(USER, CONTRACT, vec![1, 2, 3, 4]);
    assert!(!result.response.failed(), "{:?}", result.response.vm_error);
    assert_eq!(result.response.ret, Bytes::from(vec![0xaa]));

    assert_eq!(
        fx.evm.runtime.hooks(),
        vec![
            (id, JoinPointKind::PreTxExecute),
            (id, JoinPointKind::PostTxExecute)
        ]
    );
    let pre = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::PreTxExecute)
        .next()
        .unwrap();
    // Intrinsic gas of four nonzero bytes is already charged.
    assert_eq!(pre.gas, TEST_GAS_LIMIT - 21_064);
    assert_eq!(pre.receipt_status, None);
    let post = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::PostTxExecute)
        .next()
        .unwrap();
    assert_eq!(post.receipt_status, Some(true));
    assert_eq!(post.gas, pre.gas - HOOK_GAS - 5_000);

    let calls: Vec<_> = fx.evm.vm.state_calls().collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].address, CONTRACT);
    assert_eq!(calls[0].gas, pre.gas - HOOK_GAS);
}

#[test]
fn hooks_run_by_priority_then_id() {
    let mut fx = Fixture::new();
    let a = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    let b = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    let c = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.bind(a, CONTRACT, 5);
    fx.bind(b, CONTRACT, 5);
    fx.bind(c, CONTRACT, 1);

    fx.call(USER, CONTRACT, Bytes::new());

    let ran: Vec<_> = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::PreTxExecute)
        .map(|invocation| invocation.aspect_id)
        .collect();
    assert_eq!(ran, vec![c, a.min(b), a.max(b)]);
}

#[test]
fn hook_only_runs_for_declared_join_points() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::POST_TX_COMMIT);
    fx.bind(id, CONTRACT, 0);

    fx.call(USER, CONTRACT, Bytes::new());

    let commit = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::PostTxCommit)
        .next()
        .unwrap();
    // The commit hook sees the final receipt and the whole gas limit.
    assert_eq!(commit.receipt_status, Some(true));
    assert_eq!(commit.gas, TEST_GAS_LIMIT);
    assert_eq!(fx.evm.runtime.hooks(), vec![(id, JoinPointKind::PostTxCommit)]);
}

#[test]
fn post_hook_return_data_replaces_output() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::POST_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.evm.vm.script(CONTRACT, Script::returning(vec![0x01]));
    fx.evm.runtime.on(
        id,
        JoinPointKind::PostTxExecute,
        Behavior::Return(Bytes::from_static(b"aspect")),
    );

    let result = fx.call(USER, CONTRACT, Bytes::new());
    assert!(!result.response.failed());
    assert_eq!(result.response.ret, Bytes::from_static(b"aspect"));
}

#[test]
fn unbound_aspect_no_longer_runs() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.native(OWNER, unbind_input(id, CONTRACT));

    fx.call(USER, CONTRACT, Bytes::new());
    assert!(fx.evm.runtime.hooks().is_empty());
}

#[test]
fn hook_state_writes_are_committed() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.bind(id, CONTRACT, 0);
    fx.evm.runtime.on(
        id,
        JoinPointKind::PreTxExecute,
        Behavior::SetState(b"counter".to_vec(), vec![1]),
    );

    fx.call(USER, CONTRACT, Bytes::new());

    let mut store = AspectStore::new(&mut fx.evm.store);
    assert_eq!(
        store.get_state(id, CONTRACT, b"counter").unwrap(),
        Some(Bytes::from(vec![1]))
    );
}

#[test]
fn reserved_property_fails_the_transaction() {
    let mut fx = Fixture::new();
    let input = deploy_input(
        OWNER,
        JoinPoint::PRE_TX_EXECUTE,
        vec![property("Aspect_@Acount@_", "spoofed")],
    );

    let result = fx.evm.apply_transaction(native_call(OWNER, 0, input)).unwrap();
    assert!(!result.receipt.status);
    let error = result.response.vm_error.unwrap();
    assert!(error.contains("reserved"), "{error}");

    // The nonce is consumed, the registry is untouched.
    assert_eq!(fx.nonce(OWNER), 1);
    let mut store = AspectStore::new(&mut fx.evm.store);
    assert_eq!(store.get_version(OWNER.create(0)).unwrap(), U256::ZERO);
}

#[test]
fn upgrade_bumps_version() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_TX_EXECUTE);
    fx.native(
        OWNER,
        upgrade_input(id, JoinPoint::PRE_TX_EXECUTE | JoinPoint::POST_TX_EXECUTE),
    );

    let mut store = AspectStore::new(&mut fx.evm.store);
    assert_eq!(store.get_version(id).unwrap(), U256::from(2));
    assert!(fx
        .evm
        .runtime
        .invocations
        .iter()
        .any(|invocation| invocation.method == AspectMethod::IsOwner));

    // Nobody else may upgrade.
    let nonce = fx.nonce(USER);
    let result = fx
        .evm
        .apply_transaction(native_call(USER, nonce, upgrade_input(id, JoinPoint::PRE_TX_EXECUTE)))
        .unwrap();
    assert!(result.response.failed());
}

#[test]
fn entrypoint_runs_operation() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::OPERATION);
    fx.evm.runtime.on(
        id,
        JoinPointKind::Operation,
        Behavior::Return(Bytes::from_static(b"pong")),
    );

    let result = fx.native(USER, entrypoint_input(id, Bytes::from_static(b"ping")));
    assert_eq!(
        Bytes::abi_decode(&result.response.ret).unwrap(),
        Bytes::from_static(b"pong")
    );
    let operation = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::Operation)
        .next()
        .unwrap();
    assert_eq!(operation.input, HookInput::Data(Bytes::from_static(b"ping")));
}

#[test]
fn block_level_aspect_runs_at_block_boundaries() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::ON_BLOCK_INITIALIZE | JoinPoint::ON_BLOCK_FINALIZE);

    let finalized = fx.evm.end_block().unwrap();
    assert_eq!(finalized.len(), 1);
    assert_eq!(finalized[0].0, id);
    assert!(finalized[0].1.is_ok());

    fx.evm
        .runtime
        .on(id, JoinPointKind::OnBlockInitialize, Behavior::Revert("halt".into()));
    let initialized = fx.evm.begin_block(test_block(2)).unwrap();
    assert_eq!(initialized.len(), 1);
    assert!(initialized[0].1.error.is_some());

    assert_eq!(
        fx.evm.runtime.hooks(),
        vec![
            (id, JoinPointKind::OnBlockFinalize),
            (id, JoinPointKind::OnBlockInitialize)
        ]
    );
    let init = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::OnBlockInitialize)
        .next()
        .unwrap();
    assert_eq!(init.gas, TEST_BLOCK_GAS_LIMIT);

    // A failing block hook does not stop the block.
    let result = fx.call(USER, CONTRACT, Bytes::new());
    assert!(!result.response.failed());
}

fn verified_message(nonce: u64) -> Message {
    Message {
        custom_verification: true,
        validation_data: Bytes::from_static(b"signature"),
        ..call(OWNER, CONTRACT, nonce, Bytes::new())
    }
}

#[test]
fn verifier_authorizes_the_sender() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::VERIFY_TX);
    fx.bind(id, OWNER, 0);

    let nonce = fx.nonce(OWNER);
    let result = fx.evm.apply_transaction(verified_message(nonce)).unwrap();
    assert!(!result.response.failed());

    let verify = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::VerifyTx)
        .next()
        .unwrap();
    assert_eq!(verify.aspect_id, id);
    assert_eq!(verify.input, HookInput::Data(Bytes::from_static(b"signature")));
    assert_eq!(fx.nonce(OWNER), nonce + 1);
}

#[test]
fn rejected_verification_aborts_the_message() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::VERIFY_TX);
    fx.bind(id, OWNER, 0);
    fx.evm
        .runtime
        .on(id, JoinPointKind::VerifyTx, Behavior::Revert("bad signature".into()));

    let nonce = fx.nonce(OWNER);
    let block_gas_used = fx.evm.block_gas_used();
    let err = fx.evm.apply_transaction(verified_message(nonce)).unwrap_err();
    assert!(matches!(err, TransactionError::Verification(_)), "{err:?}");
    assert_eq!(fx.nonce(OWNER), nonce);
    assert_eq!(fx.evm.block_gas_used(), block_gas_used);
}

#[test]
fn verification_without_verifier_fails() {
    let mut fx = Fixture::new();
    let msg = Message {
        from: USER,
        hash: B256::repeat_byte(0x11),
        ..verified_message(0)
    };
    let err = fx.evm.apply_transaction(msg).unwrap_err();
    assert!(matches!(err, TransactionError::Verification(_)), "{err:?}");
}

#[rstest]
#[case::pre_tx_execute(JoinPointKind::PreTxExecute)]
#[case::post_tx_execute(JoinPointKind::PostTxExecute)]
fn rejected_message_drops_hook_state_writes(#[case] rejected_at: JoinPointKind) {
    let mut fx = Fixture::new();
    let writer = fx.deploy(JoinPoint::PRE_TX_EXECUTE | JoinPoint::POST_TX_EXECUTE);
    let rejecter = fx.deploy(JoinPoint::PRE_TX_EXECUTE | JoinPoint::POST_TX_EXECUTE);
    fx.bind(writer, CONTRACT, 0);
    fx.bind(rejecter, CONTRACT, 1);
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(Bytes::new()).with_storage(U256::from(1), U256::from(7)),
    );
    fx.evm.runtime.on(
        writer,
        JoinPointKind::PreTxExecute,
        Behavior::SetState(b"pre".to_vec(), vec![1]),
    );
    fx.evm.runtime.on(
        writer,
        JoinPointKind::PostTxExecute,
        Behavior::SetState(b"post".to_vec(), vec![2]),
    );
    fx.evm
        .runtime
        .on(rejecter, rejected_at, Behavior::Revert("rejected".into()));

    let result = fx.call(USER, CONTRACT, Bytes::new());
    let error = result.response.vm_error.unwrap();
    assert!(error.contains("rejected"), "{error}");
    assert_eq!(fx.storage(CONTRACT, U256::from(1)), U256::ZERO);
    assert_eq!(fx.nonce(USER), 1);

    let mut store = AspectStore::new(&mut fx.evm.store);
    assert_eq!(store.get_state(writer, CONTRACT, b"pre").unwrap(), None);
    assert_eq!(store.get_state(writer, CONTRACT, b"post").unwrap(), None);
}

fn call_input(input: &HookInput) -> &CallInfo {
    match input {
        HookInput::Call(call) => call,
        input => panic!("expected call info, got {input:?}"),
    }
}

#[test]
fn contract_call_hooks_wrap_nested_calls() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_CONTRACT_CALL | JoinPoint::POST_CONTRACT_CALL);
    fx.bind(id, CALLEE, 0);
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(Bytes::new()).with_call(CALLEE, vec![9]),
    );
    fx.evm.vm.script(
        CALLEE,
        Script::returning(vec![0xbb])
            .with_gas(2_000)
            .with_storage(U256::from(1), U256::from(5)),
    );
    fx.evm.runtime.on(
        id,
        JoinPointKind::PostContractCall,
        Behavior::SetState(b"calls".to_vec(), vec![1]),
    );

    let result = fx.call(USER, CONTRACT, vec![1]);
    assert!(!result.response.failed(), "{:?}", result.response.vm_error);
    assert_eq!(
        fx.evm.runtime.hooks(),
        vec![
            (id, JoinPointKind::PreContractCall),
            (id, JoinPointKind::PostContractCall)
        ]
    );

    let calls: Vec<_> = fx.evm.vm.state_calls().cloned().collect();
    assert_eq!(calls.len(), 2);
    assert_eq!((calls[1].caller, calls[1].address), (CONTRACT, CALLEE));
    assert_eq!(calls[1].gas, calls[0].gas - HOOK_GAS);

    let pre = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::PreContractCall)
        .next()
        .unwrap();
    let info = call_input(&pre.input);
    assert_eq!((info.from, info.to), (CONTRACT, CALLEE));
    assert_eq!(info.input, Bytes::from(vec![9]));
    assert_eq!(info.gas, calls[0].gas);
    let post = fx
        .evm
        .runtime
        .invocations_of(JoinPointKind::PostContractCall)
        .next()
        .unwrap();
    let info = call_input(&post.input);
    assert_eq!(info.output, Bytes::from(vec![0xbb]));
    assert_eq!(info.error, None);
    assert_eq!(post.gas, calls[1].gas - 2_000);

    assert_eq!(fx.storage(CALLEE, U256::from(1)), U256::from(5));
    let mut store = AspectStore::new(&mut fx.evm.store);
    assert_eq!(
        store.get_state(id, CALLEE, b"calls").unwrap(),
        Some(Bytes::from(vec![1]))
    );
}

#[test]
fn pre_contract_call_revert_skips_the_nested_call() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::PRE_CONTRACT_CALL | JoinPoint::POST_CONTRACT_CALL);
    fx.bind(id, CALLEE, 0);
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(Bytes::new())
            .with_storage(U256::from(1), U256::from(7))
            .with_call(CALLEE, vec![9]),
    );
    fx.evm.vm.script(
        CALLEE,
        Script::returning(Bytes::new()).with_storage(U256::from(1), U256::from(5)),
    );
    fx.evm.runtime.on(
        id,
        JoinPointKind::PreContractCall,
        Behavior::Revert("blocked".into()),
    );

    let result = fx.call(USER, CONTRACT, Bytes::new());
    // The caller survives the failed nested call.
    assert!(!result.response.failed(), "{:?}", result.response.vm_error);
    assert_eq!(fx.evm.runtime.hooks(), vec![(id, JoinPointKind::PreContractCall)]);
    assert_eq!(fx.evm.vm.state_calls().count(), 1);
    assert_eq!(fx.storage(CONTRACT, U256::from(1)), U256::from(7));
    assert_eq!(fx.storage(CALLEE, U256::from(1)), U256::ZERO);
}

#[test]
fn post_contract_call_revert_rolls_back_the_nested_call() {
    let mut fx = Fixture::new();
    let id = fx.deploy(JoinPoint::POST_CONTRACT_CALL);
    fx.bind(id, CALLEE, 0);
    fx.evm.vm.script(
        CONTRACT,
        Script::returning(Bytes::new())
            .with_storage(U256::from(1), U256::from(7))
            .with_call(CALLEE, vec![9]),
    );
    fx.evm.vm.script(
        CALLEE,
        Script::returning(Bytes::new()).with_storage(U256::from(1), U256::from(5)),
    );
    fx.evm.runtime.on(
        id,
        JoinPointKind::PostContractCall,
        Behavior::Revert("blocked".into()),
    );

    let result = fx.call(USER, CONTRACT, Bytes::new());
    assert!(!result.response.failed(), "{:?}", result.response.vm_error);
    assert_eq!(fx.evm.vm.state_calls().count(), 2);
    assert_eq!(fx.storage(CONTRACT, U256::from(1)), U256::from(7));
    assert_eq!(fx.storage(CALLEE, U256::from(1)), U256::ZERO);
}
