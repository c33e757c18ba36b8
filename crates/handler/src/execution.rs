//! Application of a single message.
use crate::{
    call_hooks::AspectCallHooks,
    caller::VmCaller,
    error::TransactionError,
    gas::{capped_refund, floor_gas_used},
    post_execution::{build_receipt, ExecutionResponse},
    validation::{validate_initial_tx_gas, validate_message},
    vm::{Vm, VmCall, VmCreate, VmEnv, OUT_OF_GAS},
};
use aspect::{
    native::{self, NativeCall},
    AspectError, AspectRuntime, AspectStore, Dispatcher, HookOutcome, StoreError,
};
use context::{
    tracer::{CallFrame, CallKind},
    ChainParams, EvmConfig, ExecutionContext, Message, SharedTracer, StateDb, TxConfig,
};
use database::CacheKvStore;
use database_interface::{Keeper, KvStore};
use primitives::{
    hardfork::SpecId, precompile_address, Address, Bytes, ASPECT_NATIVE_CONTRACT_ADDRESS, U256,
};
use tracing::{debug, trace};

/// Everything a message is applied with besides the message itself.
#[derive(Clone, Debug, Default)]
pub struct MessageEnv {
    /// EVM configuration of the block.
    pub config: EvmConfig,
    /// Governance parameters.
    pub params: ChainParams,
    /// Tracer of the message.
    pub tracer: Option<SharedTracer>,
    /// State changes are written to the keeper and the aspect registry.
    pub commit: bool,
    /// Unused gas is credited back to the sender at the message gas price, together with the
    /// other changes of the message.
    pub refund: bool,
    /// Index of the transaction in the block.
    pub tx_index: u64,
    /// Logs emitted by earlier transactions of the block.
    pub log_index: u64,
    /// Gas used by earlier transactions of the block.
    pub cumulative_gas_used: u64,
}

/// Outcome of the dispatch stage.
#[derive(Debug, Default)]
struct Dispatched {
    ret: Bytes,
    gas_left: u64,
    vm_error: Option<String>,
    contract_address: Option<Address>,
}

/// Maps a failed hook onto the VM error it stands for. Out of gas consumes everything.
pub(crate) fn hook_failure(outcome: &HookOutcome, error: &AspectError) -> (u64, String) {
    match error {
        AspectError::OutOfGas => (0, OUT_OF_GAS.to_owned()),
        error => (outcome.gas_left, error.to_string()),
    }
}

/// Applies `msg` on top of `keeper` and `store`.
///
/// Checks that fail before execution return an error and leave both untouched. Failures
/// during execution are reported in [`ExecutionResponse::vm_error`]; the message is then
/// committed or discarded like any other, as `env.commit` says. A commit reaches either
/// both the keeper and the aspect registry or neither of them.
///
/// Aspect writes of the transaction and contract call hooks are kept only when the message
/// succeeds.
pub fn apply_message<K, S, V, R>(
    keeper: K,
    store: S,
    vm: &mut V,
    runtime: &mut R,
    ctx: &mut ExecutionContext,
    msg: Message,
    env: MessageEnv,
) -> Result<ExecutionResponse, TransactionError<K::Error>>
where
    K: Keeper,
    S: KvStore,
    V: Vm,
    R: AspectRuntime,
{
    let MessageEnv {
        config,
        params,
        tracer,
        commit,
        refund: refund_leftover,
        tx_index,
        log_index,
        cumulative_gas_used,
    } = env;
    let spec = config.spec;

    validate_message(&msg, &params)?;
    let next_nonce = msg
        .nonce
        .checked_add(1)
        .ok_or(TransactionError::NonceOverflow(msg.nonce))?;

    let (block_hash, height, time) = ctx
        .block()
        .map(|block| (block.hash, block.height, block.time))
        .unwrap_or_default();
    let mut db = StateDb::with_tx_config(
        keeper,
        TxConfig {
            block_hash,
            tx_hash: msg.hash,
            tx_index,
            log_index,
        },
    );
    let mut store = AspectStore::new(CacheKvStore::new(store));
    let vm_env = VmEnv {
        config: config.clone(),
        height,
        time,
        tracer: tracer.clone(),
    };
    let mut scope = ctx.begin_tx(msg.clone(), config, tx_index, commit, tracer.clone());

    let intrinsic = validate_initial_tx_gas(&msg, spec, &params)?;
    let gas_left = msg.gas_limit - intrinsic;

    if msg.custom_verification {
        let outcome = Dispatcher::new(&mut store, &mut *runtime).verify_tx(
            &mut scope,
            msg.from,
            msg.validation_data.clone(),
            params.aspect_verification_gas,
        )?;
        if let Some(error) = outcome.error {
            return Err(TransactionError::Verification(error.to_string()));
        }
    }

    if let Some(tracer) = &tracer {
        tracer.lock().capture_enter(CallFrame {
            kind: if msg.is_create() {
                CallKind::Create
            } else {
                CallKind::Call
            },
            from: msg.from,
            to: msg.to,
            input: msg.data.clone(),
            value: msg.value,
            gas: msg.gas_limit,
            ..Default::default()
        });
    }

    if spec.is_enabled_in(SpecId::BERLIN) {
        db.prepare_access_list(
            msg.from,
            msg.to,
            (1..=spec.precompile_count()).map(precompile_address),
            msg.access_list_pairs(),
        );
    }

    let dispatched = match msg.to {
        Some(ASPECT_NATIVE_CONTRACT_ADDRESS) => {
            db.set_nonce(msg.from, next_nonce)?;
            let mut caller = VmCaller::new(&mut *vm, &mut db, &vm_env);
            let outcome = native::execute(
                store.inner_mut(),
                &mut *runtime,
                &mut caller,
                &mut scope,
                NativeCall {
                    sender: msg.from,
                    input: msg.data.clone(),
                    value: msg.value,
                    gas: gas_left,
                    commit,
                },
            )?;
            Dispatched {
                ret: outcome.ret,
                gas_left: outcome.gas_left,
                vm_error: outcome.error.map(|err| err.to_string()),
                contract_address: None,
            }
        }
        None => {
            db.set_nonce(msg.from, msg.nonce)?;
            let mut hook_store = AspectStore::new(CacheKvStore::new(store.inner_mut()));
            let mut hooks = AspectCallHooks::new(&mut hook_store, &mut *runtime, &mut scope);
            let outcome = vm.create(
                &mut db,
                &vm_env,
                VmCreate {
                    caller: msg.from,
                    init_code: msg.data.clone(),
                    value: msg.value,
                    gas: gas_left,
                },
                &mut hooks,
            )?;
            hooks.finish()?;
            // Nonce increments even when creation fails.
            db.set_nonce(msg.from, next_nonce)?;
            if outcome.is_success() {
                flush(&mut hook_store)?;
            }
            Dispatched {
                ret: outcome.output,
                gas_left: outcome.gas_left,
                vm_error: outcome.error,
                contract_address: outcome.created,
            }
        }
        Some(to) => {
            db.set_nonce(msg.from, next_nonce)?;
            let mut hook_store = AspectStore::new(CacheKvStore::new(store.inner_mut()));
            let pre = Dispatcher::new(&mut hook_store, &mut *runtime).pre_tx_execute(
                &mut scope,
                to,
                gas_left,
            )?;
            let dispatched = match &pre.error {
                Some(error) => {
                    let (gas_left, vm_error) = hook_failure(&pre, error);
                    debug!(target: "handler", %to, %vm_error, "preTxExecute rejected the message");
                    Dispatched {
                        gas_left,
                        vm_error: Some(vm_error),
                        ..Default::default()
                    }
                }
                None => {
                    let snapshot = db.snapshot();
                    let mut hooks =
                        AspectCallHooks::new(&mut hook_store, &mut *runtime, &mut scope);
                    let outcome = vm.call(
                        &mut db,
                        &vm_env,
                        VmCall {
                            caller: msg.from,
                            address: to,
                            input: msg.data.clone(),
                            value: msg.value,
                            gas: pre.gas_left,
                            is_static: false,
                        },
                        &mut hooks,
                    )?;
                    hooks.finish()?;
                    let mut dispatched = Dispatched {
                        ret: outcome.output,
                        gas_left: outcome.gas_left.min(pre.gas_left),
                        vm_error: outcome.error,
                        contract_address: None,
                    };
                    if dispatched.vm_error.is_none() {
                        let receipt = build_receipt(
                            &scope,
                            &msg,
                            true,
                            msg.gas_limit - dispatched.gas_left,
                            cumulative_gas_used,
                            db.logs().to_vec(),
                            None,
                        );
                        scope.tx_mut().receipt = Some(receipt);
                        let post = Dispatcher::new(&mut hook_store, &mut *runtime)
                            .post_tx_execute(&mut scope, to, dispatched.gas_left)?;
                        dispatched.gas_left = post.gas_left;
                        if !post.ret.is_empty() {
                            dispatched.ret = post.ret.clone();
                        }
                        if let Some(error) = &post.error {
                            let (gas_left, vm_error) = hook_failure(&post, error);
                            debug!(
                                target: "handler",
                                %to,
                                %vm_error,
                                "postTxExecute reverted the message"
                            );
                            db.revert_to_snapshot(snapshot);
                            dispatched.gas_left = gas_left;
                            dispatched.vm_error = Some(vm_error);
                        }
                    }
                    dispatched
                }
            };
            if dispatched.vm_error.is_none() {
                flush(&mut hook_store)?;
            }
            dispatched
        }
    };

    // Refund
    let gas_used = msg
        .gas_limit
        .checked_sub(dispatched.gas_left)
        .ok_or(TransactionError::GasOverflow)?;
    let refund = capped_refund(spec, gas_used, db.get_refund());
    let temporary_gas_used = gas_used - refund;
    trace!(target: "handler", gas_used, refund, "refund applied");

    let logs = db.logs().to_vec();
    let success = dispatched.vm_error.is_none();
    let receipt = build_receipt(
        &scope,
        &msg,
        success,
        temporary_gas_used,
        cumulative_gas_used,
        logs.clone(),
        dispatched.contract_address,
    );
    scope.tx_mut().receipt = Some(receipt);

    let gas_used = floor_gas_used(msg.gas_limit, temporary_gas_used, params.min_gas_multiplier)
        .ok_or_else(|| TransactionError::InvalidConfig("malformed min gas multiplier".into()))?;
    let gas_left = msg
        .gas_limit
        .checked_sub(gas_used)
        .ok_or(TransactionError::GasOverflow)?;

    if commit {
        if refund_leftover {
            let amount = msg
                .gas_price
                .checked_mul(U256::from(gas_left))
                .ok_or(TransactionError::GasOverflow)?;
            db.add_balance(msg.from, amount)?;
        }
        if let Some(to) = msg.to.filter(|to| *to != ASPECT_NATIVE_CONTRACT_ADDRESS) {
            // Runs on the final receipt; its writes are persisted with the message.
            let mut hook_store = AspectStore::new(CacheKvStore::new(store.inner_mut()));
            let outcome = Dispatcher::new(&mut hook_store, &mut *runtime).post_tx_commit(
                &mut scope,
                to,
                msg.gas_limit,
            )?;
            match &outcome.error {
                Some(error) => debug!(target: "handler", %to, %error, "postTxCommit failed"),
                None => flush(&mut hook_store)?,
            }
        }
        persist(&mut db, store.inner_mut())?;
    }

    if let Some(tracer) = &tracer {
        tracer
            .lock()
            .capture_exit(&dispatched.ret, gas_used, dispatched.vm_error.as_deref());
    }
    debug!(
        target: "handler",
        tx_hash = %msg.hash,
        gas_used,
        gas_left,
        commit,
        vm_error = ?dispatched.vm_error,
        "message applied"
    );

    Ok(ExecutionResponse {
        gas_used,
        vm_error: dispatched.vm_error,
        ret: dispatched.ret,
        logs,
        hash: msg.hash,
        contract_address: dispatched.contract_address,
    })
}

/// Moves the writes of a hook scope into its parent.
fn flush<S: KvStore>(store: &mut AspectStore<CacheKvStore<S>>) -> Result<(), StoreError> {
    store
        .inner_mut()
        .flush()
        .map_err(|err| StoreError::Kv(Box::new(err)))
}

/// Writes the message to the aspect registry, then to the keeper.
///
/// Both writes are atomic on their own. When the keeper rejects its change set, the registry
/// is put back as it was.
///
/// # Panics
///
/// Panics if the registry cannot be restored, leaving it ahead of the keeper.
fn persist<K: Keeper, S: KvStore>(
    db: &mut StateDb<K>,
    store: &mut CacheKvStore<S>,
) -> Result<(), TransactionError<K::Error>> {
    let undo = store
        .undo_batch()
        .map_err(|err| StoreError::Kv(Box::new(err)))?;
    store
        .flush()
        .map_err(|err| StoreError::Kv(Box::new(err)))?;
    if let Err(err) = db.commit() {
        debug!(target: "handler", "keeper commit failed, restoring the aspect registry");
        if let Err(restore) = store.inner.apply(&undo) {
            panic!("aspect registry diverged from the keeper: {restore}");
        }
        return Err(err.into());
    }
    Ok(())
}
