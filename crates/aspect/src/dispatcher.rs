//! Runs the hooks of bound aspects.
use crate::{
    host::AspectHost,
    join_point::JoinPointKind,
    meta::AspectMeta,
    runtime::{
        AspectError, AspectMethod, AspectOutput, AspectRequest, AspectRuntime, CallInfo, HookInput,
    },
    store::{AspectStore, StoreError},
};
use context::ExecutionContext;
use database_interface::KvStore;
use primitives::{Address, Bytes, U256};
use tracing::{debug, trace};

/// Error that prevents hooks from running at all.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Registry access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A binding points at a version without code.
    #[error("aspect {id} has no code at bound version {version}")]
    MissingCode {
        /// Aspect id.
        id: Address,
        /// Bound version.
        version: U256,
    },
    /// The account has no verifier aspect.
    #[error("no verifier aspect bound to {0}")]
    NoVerifier(Address),
}

/// Combined outcome of the hooks run at one join point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HookOutcome {
    /// Gas left after every hook that ran.
    pub gas_left: u64,
    /// Return data of the last hook that returned any.
    pub ret: Bytes,
    /// First failure; hooks after it did not run.
    pub error: Option<AspectError>,
    /// Aspects that ran, in order.
    pub ran: Vec<Address>,
}

impl HookOutcome {
    fn new(gas: u64) -> Self {
        Self {
            gas_left: gas,
            ..Default::default()
        }
    }

    /// Returns true if no hook failed.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if a hook ran out of gas.
    #[inline]
    pub fn is_out_of_gas(&self) -> bool {
        matches!(self.error, Some(AspectError::OutOfGas))
    }
}

/// Hook dispatcher over explicit handles to the registry and the module interpreter.
#[derive(Debug)]
pub struct Dispatcher<'a, S, R> {
    store: &'a mut AspectStore<S>,
    runtime: &'a mut R,
}

type Result<T, E = DispatchError> = core::result::Result<T, E>;

impl<'a, S: KvStore, R: AspectRuntime> Dispatcher<'a, S, R> {
    /// Creates a dispatcher.
    pub fn new(store: &'a mut AspectStore<S>, runtime: &'a mut R) -> Self {
        Self { store, runtime }
    }

    /// Returns the registry.
    pub fn store(&mut self) -> &mut AspectStore<S> {
        &mut *self.store
    }

    /// Runs one entry point of one aspect version.
    pub fn invoke(
        &mut self,
        ctx: &mut ExecutionContext,
        meta: &AspectMeta,
        method: AspectMethod,
        contract: Option<Address>,
        input: HookInput,
        gas: u64,
    ) -> Result<AspectOutput> {
        let code = self
            .store
            .get_code(meta.id, meta.version)?
            .ok_or(DispatchError::MissingCode {
                id: meta.id,
                version: meta.version,
            })?;
        let request = AspectRequest {
            aspect_id: meta.id,
            version: meta.version,
            code: &code,
            method,
            input,
            gas,
        };
        let tracer = ctx.try_tx().and_then(|tx| tx.tracer.clone());
        let writable = method.is_writable();
        let mut host = AspectHost::new(ctx, &mut *self.store, meta.id, contract, writable);
        let mut output = self.runtime.run(request, &mut host);
        // A runtime can never hand back more gas than it was given.
        output.gas_left = output.gas_left.min(gas);
        trace!(
            target: "aspect::dispatch",
            aspect_id = %meta.id,
            version = %meta.version,
            %method,
            gas_used = gas - output.gas_left,
            ok = output.result.is_ok(),
            "aspect invoked"
        );
        if let Some(tracer) = tracer {
            tracer
                .lock()
                .capture_hook(method.name(), meta.id, gas - output.gas_left);
        }
        Ok(output)
    }

    fn run_bindings(
        &mut self,
        ctx: &mut ExecutionContext,
        bindings: &[AspectMeta],
        kind: JoinPointKind,
        contract: Option<Address>,
        input: HookInput,
        gas: u64,
    ) -> Result<HookOutcome> {
        let mut outcome = HookOutcome::new(gas);
        for meta in bindings {
            if !self.store.get_join_points(meta.id, meta.version)?.has(kind) {
                continue;
            }
            let output = self.invoke(
                ctx,
                meta,
                AspectMethod::JoinPoint(kind),
                contract,
                input.clone(),
                outcome.gas_left,
            )?;
            outcome.gas_left = output.gas_left;
            outcome.ran.push(meta.id);
            match output.result {
                Ok(ret) if ret.is_empty() => {}
                Ok(ret) => outcome.ret = ret,
                Err(error) => {
                    debug!(
                        target: "aspect::dispatch",
                        aspect_id = %meta.id,
                        %kind,
                        %error,
                        "hook failed"
                    );
                    outcome.error = Some(error);
                    break;
                }
            }
        }
        Ok(outcome)
    }

    fn run_contract_hooks(
        &mut self,
        ctx: &mut ExecutionContext,
        kind: JoinPointKind,
        contract: Address,
        input: HookInput,
        gas: u64,
    ) -> Result<HookOutcome> {
        let bindings = self.store.contract_bindings(contract)?;
        self.run_bindings(ctx, &bindings, kind, Some(contract), input, gas)
    }

    /// Runs `verifyTx` of the verifier bound to `account`.
    ///
    /// The first verifier binding declaring the join point authorizes the transaction.
    pub fn verify_tx(
        &mut self,
        ctx: &mut ExecutionContext,
        account: Address,
        validation_data: Bytes,
        gas: u64,
    ) -> Result<HookOutcome> {
        let mut verifier = None;
        for meta in self.store.verifier_bindings(account)? {
            if self
                .store
                .get_join_points(meta.id, meta.version)?
                .has(JoinPointKind::VerifyTx)
            {
                verifier = Some(meta);
                break;
            }
        }
        let verifier = verifier.ok_or(DispatchError::NoVerifier(account))?;
        self.run_bindings(
            ctx,
            &[verifier],
            JoinPointKind::VerifyTx,
            Some(account),
            HookInput::Data(validation_data),
            gas,
        )
    }

    /// Runs `preTxExecute` of the aspects bound to `contract`.
    pub fn pre_tx_execute(
        &mut self,
        ctx: &mut ExecutionContext,
        contract: Address,
        gas: u64,
    ) -> Result<HookOutcome> {
        self.run_contract_hooks(ctx, JoinPointKind::PreTxExecute, contract, HookInput::Empty, gas)
    }

    /// Runs `postTxExecute` of the aspects bound to `contract`.
    ///
    /// The receipt must already be set on the transaction context.
    pub fn post_tx_execute(
        &mut self,
        ctx: &mut ExecutionContext,
        contract: Address,
        gas: u64,
    ) -> Result<HookOutcome> {
        self.run_contract_hooks(ctx, JoinPointKind::PostTxExecute, contract, HookInput::Empty, gas)
    }

    /// Runs `preContractCall` of the aspects bound to the callee.
    pub fn pre_contract_call(
        &mut self,
        ctx: &mut ExecutionContext,
        call: CallInfo,
        gas: u64,
    ) -> Result<HookOutcome> {
        let contract = call.to;
        let input = HookInput::Call(call);
        self.run_contract_hooks(ctx, JoinPointKind::PreContractCall, contract, input, gas)
    }

    /// Runs `postContractCall` of the aspects bound to the callee.
    pub fn post_contract_call(
        &mut self,
        ctx: &mut ExecutionContext,
        call: CallInfo,
        gas: u64,
    ) -> Result<HookOutcome> {
        let contract = call.to;
        let input = HookInput::Call(call);
        self.run_contract_hooks(ctx, JoinPointKind::PostContractCall, contract, input, gas)
    }

    /// Runs `postTxCommit` of the aspects bound to `contract`.
    pub fn post_tx_commit(
        &mut self,
        ctx: &mut ExecutionContext,
        contract: Address,
        gas: u64,
    ) -> Result<HookOutcome> {
        self.run_contract_hooks(ctx, JoinPointKind::PostTxCommit, contract, HookInput::Empty, gas)
    }

    /// Block-level aspects at their latest version, in hook order.
    pub fn block_level_aspects(&mut self) -> Result<Vec<AspectMeta>> {
        let mut metas = Vec::new();
        for id in self.store.block_level_aspects()?.into_keys() {
            let version = self.store.get_version(id)?;
            if !version.is_zero() {
                metas.push(AspectMeta::new(id, version, 0));
            }
        }
        metas.sort();
        Ok(metas)
    }

    fn run_block_hooks(
        &mut self,
        ctx: &mut ExecutionContext,
        kind: JoinPointKind,
        gas: u64,
    ) -> Result<Vec<(Address, HookOutcome)>> {
        let mut outcomes = Vec::new();
        for meta in self.block_level_aspects()? {
            // Each aspect runs with its own budget.
            let bindings = core::slice::from_ref(&meta);
            let outcome = self.run_bindings(ctx, bindings, kind, None, HookInput::Empty, gas)?;
            if !outcome.ran.is_empty() {
                outcomes.push((meta.id, outcome));
            }
        }
        Ok(outcomes)
    }

    /// Runs `onBlockInitialize` of every block-level aspect.
    pub fn on_block_initialize(
        &mut self,
        ctx: &mut ExecutionContext,
        gas: u64,
    ) -> Result<Vec<(Address, HookOutcome)>> {
        self.run_block_hooks(ctx, JoinPointKind::OnBlockInitialize, gas)
    }

    /// Runs `onBlockFinalize` of every block-level aspect.
    pub fn on_block_finalize(
        &mut self,
        ctx: &mut ExecutionContext,
        gas: u64,
    ) -> Result<Vec<(Address, HookOutcome)>> {
        self.run_block_hooks(ctx, JoinPointKind::OnBlockFinalize, gas)
    }

    /// Runs `operation` of an aspect version.
    pub fn operation(
        &mut self,
        ctx: &mut ExecutionContext,
        meta: &AspectMeta,
        args: Bytes,
        gas: u64,
    ) -> Result<AspectOutput> {
        self.invoke(
            ctx,
            meta,
            AspectMethod::JoinPoint(JoinPointKind::Operation),
            None,
            HookInput::Data(args),
            gas,
        )
    }

    /// Asks an aspect version whether `sender` owns it. Returns the answer and the gas left.
    pub fn is_owner(
        &mut self,
        ctx: &mut ExecutionContext,
        meta: &AspectMeta,
        sender: Address,
        gas: u64,
    ) -> Result<(bool, u64)> {
        let input = HookInput::Owner(sender);
        let output = self.invoke(ctx, meta, AspectMethod::IsOwner, None, input, gas)?;
        let owner = output.result.is_ok_and(|ret| is_true(&ret));
        Ok((owner, output.gas_left))
    }

    /// Runs the initializer of a freshly deployed version.
    pub fn init(
        &mut self,
        ctx: &mut ExecutionContext,
        meta: &AspectMeta,
        data: Bytes,
        gas: u64,
    ) -> Result<AspectOutput> {
        self.invoke(ctx, meta, AspectMethod::Init, None, HookInput::Data(data), gas)
    }
}

/// Returns true for a one-byte `1` or an ABI encoded `true`.
pub(crate) fn is_true(ret: &[u8]) -> bool {
    match ret.split_last() {
        Some((1, rest)) => rest.len() < 32 && rest.iter().all(|b| *b == 0),
        _ => false,
    }
}
