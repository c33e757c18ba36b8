use aspect::{
    AspectError, AspectMethod, AspectOutput, AspectRequest, AspectRuntime, HookInput, HostApi,
    JoinPointKind,
};
use context::{ContextKey, ContextValue};
use primitives::{Address, Bytes, U256};
use std::collections::BTreeMap;

/// Gas charged by every [`RecordingRuntime`] invocation.
pub const HOOK_GAS: u64 = 1_000;

/// What an aspect entry point does when invoked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Behavior {
    /// Returns nothing.
    #[default]
    Succeed,
    /// Returns the given bytes.
    Return(Bytes),
    /// Reverts with a reason.
    Revert(String),
    /// Runs out of gas.
    OutOfGas,
    /// Consumes extra gas on top of [`HOOK_GAS`], then succeeds.
    Consume(u64),
    /// Writes aspect state of the contract in scope, then succeeds.
    SetState(Vec<u8>, Vec<u8>),
}

/// One recorded aspect invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Aspect id.
    pub aspect_id: Address,
    /// Version run.
    pub version: U256,
    /// Entry point.
    pub method: AspectMethod,
    /// Entry point input.
    pub input: HookInput,
    /// Receipt status visible to the aspect, `None` before execution.
    pub receipt_status: Option<bool>,
    /// Gas handed in.
    pub gas: u64,
}

/// An [`AspectRuntime`] that records every invocation and answers from a behavior table.
///
/// `isOwner` answers true for the owner registered with [`RecordingRuntime::set_owner`].
/// Entry points without a behavior succeed.
#[derive(Clone, Debug, Default)]
pub struct RecordingRuntime {
    owners: BTreeMap<Address, Address>,
    behaviors: BTreeMap<(Address, AspectMethod), Behavior>,
    /// Invocations in the order they ran.
    pub invocations: Vec<Invocation>,
}

impl RecordingRuntime {
    /// Creates a runtime without owners or behaviors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the owner `isOwner` confirms for `aspect_id`.
    pub fn set_owner(&mut self, aspect_id: Address, owner: Address) -> &mut Self {
        self.owners.insert(aspect_id, owner);
        self
    }

    /// Sets what `method` of `aspect_id` does.
    pub fn set_behavior(
        &mut self,
        aspect_id: Address,
        method: AspectMethod,
        behavior: Behavior,
    ) -> &mut Self {
        self.behaviors.insert((aspect_id, method), behavior);
        self
    }

    /// Sets what join point `kind` of `aspect_id` does.
    pub fn on(&mut self, aspect_id: Address, kind: JoinPointKind, behavior: Behavior) -> &mut Self {
        self.set_behavior(aspect_id, AspectMethod::JoinPoint(kind), behavior)
    }

    /// Join point invocations as `(aspect, join point)`, in the order they ran.
    pub fn hooks(&self) -> Vec<(Address, JoinPointKind)> {
        self.invocations
            .iter()
            .filter_map(|invocation| match invocation.method {
                AspectMethod::JoinPoint(kind) => Some((invocation.aspect_id, kind)),
                _ => None,
            })
            .collect()
    }

    /// Invocations of join point `kind`.
    pub fn invocations_of(&self, kind: JoinPointKind) -> impl Iterator<Item = &Invocation> {
        self.invocations
            .iter()
            .filter(move |invocation| invocation.method == AspectMethod::JoinPoint(kind))
    }
}

impl AspectRuntime for RecordingRuntime {
    fn validate(&mut self, code: &[u8]) -> Result<(), String> {
        if code.is_empty() {
            return Err("empty module".into());
        }
        Ok(())
    }

    fn run(&mut self, request: AspectRequest<'_>, host: &mut dyn HostApi) -> AspectOutput {
        let receipt_status = match host.query(ContextKey::ReceiptStatus) {
            Some(ContextValue::Bool(status)) => Some(status),
            _ => None,
        };
        self.invocations.push(Invocation {
            aspect_id: request.aspect_id,
            version: request.version,
            method: request.method,
            input: request.input.clone(),
            receipt_status,
            gas: request.gas,
        });

        let Some(gas_left) = request.gas.checked_sub(HOOK_GAS) else {
            return AspectOutput::failure(AspectError::OutOfGas, 0);
        };
        if let HookInput::Owner(sender) = request.input {
            let owner = self.owners.get(&request.aspect_id) == Some(&sender);
            return AspectOutput::success(Bytes::from(vec![owner as u8]), gas_left);
        }

        let behavior = self
            .behaviors
            .get(&(request.aspect_id, request.method))
            .cloned()
            .unwrap_or_default();
        match behavior {
            Behavior::Succeed => AspectOutput::success(Bytes::new(), gas_left),
            Behavior::Return(ret) => AspectOutput::success(ret, gas_left),
            Behavior::Revert(reason) => {
                AspectOutput::failure(AspectError::revert(reason), gas_left)
            }
            Behavior::OutOfGas => AspectOutput::failure(AspectError::OutOfGas, 0),
            Behavior::Consume(gas) => match gas_left.checked_sub(gas) {
                Some(gas_left) => AspectOutput::success(Bytes::new(), gas_left),
                None => AspectOutput::failure(AspectError::OutOfGas, 0),
            },
            Behavior::SetState(key, value) => match host.set_state(&key, &value) {
                Ok(()) => AspectOutput::success(Bytes::new(), gas_left),
                Err(err) => AspectOutput::failure(AspectError::Runtime(err.to_string()), gas_left),
            },
        }
    }
}
