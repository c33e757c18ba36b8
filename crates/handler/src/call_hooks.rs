//! Contract-level aspect hooks around nested calls.
use crate::{
    execution::hook_failure,
    vm::{CallHooks, VmCall, VmOutcome},
};
use aspect::{AspectRuntime, AspectStore, CallInfo, DispatchError, Dispatcher};
use context::ExecutionContext;
use database_interface::KvStore;
use tracing::debug;

/// Runs `preContractCall` and `postContractCall` of the aspects bound to every callee.
///
/// A registry failure cannot travel through the engine. It fails the frame and is returned by
/// [`AspectCallHooks::finish`], which aborts the message.
pub(crate) struct AspectCallHooks<'a, S, R> {
    store: &'a mut AspectStore<S>,
    runtime: &'a mut R,
    ctx: &'a mut ExecutionContext,
    failure: Option<DispatchError>,
}

impl<'a, S: KvStore, R: AspectRuntime> AspectCallHooks<'a, S, R> {
    pub(crate) fn new(
        store: &'a mut AspectStore<S>,
        runtime: &'a mut R,
        ctx: &'a mut ExecutionContext,
    ) -> Self {
        Self {
            store,
            runtime,
            ctx,
            failure: None,
        }
    }

    /// Returns the first registry failure hit by a hook.
    pub(crate) fn finish(self) -> Result<(), DispatchError> {
        self.failure.map_or(Ok(()), Err)
    }

    fn abort(&mut self, err: DispatchError) -> VmOutcome {
        debug!(target: "handler", %err, "contract call hooks aborted");
        let error = err.to_string();
        self.failure.get_or_insert(err);
        VmOutcome {
            error: Some(error),
            ..Default::default()
        }
    }
}

fn call_info(call: &VmCall) -> CallInfo {
    CallInfo {
        from: call.caller,
        to: call.address,
        input: call.input.clone(),
        value: call.value,
        gas: call.gas,
        ..Default::default()
    }
}

impl<S: KvStore, R: AspectRuntime> CallHooks for AspectCallHooks<'_, S, R> {
    fn pre_contract_call(&mut self, call: &mut VmCall) -> Option<VmOutcome> {
        if let Some(failure) = &self.failure {
            return Some(VmOutcome {
                error: Some(failure.to_string()),
                ..Default::default()
            });
        }
        let result = Dispatcher::new(&mut *self.store, &mut *self.runtime).pre_contract_call(
            &mut *self.ctx,
            call_info(call),
            call.gas,
        );
        let hooks = match result {
            Ok(hooks) => hooks,
            Err(err) => return Some(self.abort(err)),
        };
        call.gas = hooks.gas_left;
        let error = hooks.error.as_ref()?;
        let (gas_left, error) = hook_failure(&hooks, error);
        debug!(target: "handler", to = %call.address, %error, "preContractCall rejected the call");
        Some(VmOutcome {
            gas_left,
            error: Some(error),
            ..Default::default()
        })
    }

    fn post_contract_call(&mut self, call: &VmCall, mut outcome: VmOutcome) -> VmOutcome {
        if self.failure.is_some() {
            return outcome;
        }
        let info = CallInfo {
            output: outcome.output.clone(),
            error: outcome.error.clone(),
            ..call_info(call)
        };
        let result = Dispatcher::new(&mut *self.store, &mut *self.runtime).post_contract_call(
            &mut *self.ctx,
            info,
            outcome.gas_left,
        );
        let hooks = match result {
            Ok(hooks) => hooks,
            Err(err) => return self.abort(err),
        };
        outcome.gas_left = hooks.gas_left;
        if let Some(error) = &hooks.error {
            let (gas_left, error) = hook_failure(&hooks, error);
            debug!(
                target: "handler",
                to = %call.address,
                %error,
                "postContractCall reverted the call"
            );
            outcome.gas_left = gas_left;
            outcome.error = Some(error);
            outcome.created = None;
        }
        outcome
    }
}
