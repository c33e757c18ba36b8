//! Bytecode engine interface.
//!
//! Interpreting contract bytecode is outside of this crate. A [`Vm`] runs calls and creations
//! against the [`StateDb`] of the message being applied, moving value, charging gas and
//! recording refunds and logs on it.
use auto_impl::auto_impl;
use context::{EvmConfig, SharedTracer, StateDb, StateDbError};
use database_interface::Keeper;
use primitives::{Address, Bytes, U256};

/// Error string of a reverted frame.
pub const EXECUTION_REVERTED: &str = "execution reverted";

/// Error string of a frame that ran out of gas.
pub const OUT_OF_GAS: &str = aspect::OUT_OF_GAS_SENTINEL;

/// Environment of the message being executed.
#[derive(Clone, Debug, Default)]
pub struct VmEnv {
    /// EVM configuration of the block.
    pub config: EvmConfig,
    /// Block number.
    pub height: u64,
    /// Block timestamp.
    pub time: u64,
    /// Tracer nested frames are reported to.
    pub tracer: Option<SharedTracer>,
}

/// A message call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmCall {
    /// Caller.
    pub caller: Address,
    /// Callee.
    pub address: Address,
    /// Call data.
    pub input: Bytes,
    /// Transferred value.
    pub value: U256,
    /// Gas limit of the frame.
    pub gas: u64,
    /// State changes are not allowed.
    pub is_static: bool,
}

/// A contract creation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmCreate {
    /// Creator.
    pub caller: Address,
    /// Init code.
    pub init_code: Bytes,
    /// Endowment.
    pub value: U256,
    /// Gas limit of the frame.
    pub gas: u64,
}

/// Result of a frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmOutcome {
    /// Return data, or revert data.
    pub output: Bytes,
    /// Gas left.
    pub gas_left: u64,
    /// Failure reason, `None` on success.
    pub error: Option<String>,
    /// Created contract, for successful creations.
    pub created: Option<Address>,
}

impl VmOutcome {
    /// Successful outcome.
    pub fn success(output: Bytes, gas_left: u64) -> Self {
        Self {
            output,
            gas_left,
            ..Default::default()
        }
    }

    /// Reverted outcome. Unused gas is returned.
    pub fn revert(output: Bytes, gas_left: u64) -> Self {
        Self {
            output,
            gas_left,
            error: Some(EXECUTION_REVERTED.into()),
            created: None,
        }
    }

    /// Out of gas outcome. Every unit of gas is consumed.
    pub fn out_of_gas() -> Self {
        Self {
            error: Some(OUT_OF_GAS.into()),
            ..Default::default()
        }
    }

    /// Returns true if the frame succeeded.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aspect hooks around the nested calls of a message.
///
/// The engine calls [`CallHooks::pre_contract_call`] before entering every call frame below
/// the outermost one and [`CallHooks::post_contract_call`] once that frame returned.
#[auto_impl(&mut, Box)]
pub trait CallHooks {
    /// Called before a nested call runs. Gas spent by the hooks is taken from `call.gas`.
    ///
    /// Returning an outcome skips the frame and uses the outcome as its result.
    fn pre_contract_call(&mut self, call: &mut VmCall) -> Option<VmOutcome> {
        let _ = call;
        None
    }

    /// Called when a nested call returned. The returned outcome is the result of the frame.
    ///
    /// When a successful frame comes back failed, the engine reverts the state changes of
    /// the frame.
    fn post_contract_call(&mut self, call: &VmCall, outcome: VmOutcome) -> VmOutcome {
        let _ = call;
        outcome
    }
}

/// No hooks.
impl CallHooks for () {}

/// Bytecode engine.
///
/// Frame failures are reported in [`VmOutcome::error`]; an `Err` means the state database
/// itself failed and aborts the message.
#[auto_impl(&mut, Box)]
pub trait Vm {
    /// Runs a message call. A failed frame must leave no state changes behind.
    fn call<DB: Keeper>(
        &mut self,
        db: &mut StateDb<DB>,
        env: &VmEnv,
        call: VmCall,
        hooks: &mut dyn CallHooks,
    ) -> Result<VmOutcome, StateDbError<DB::Error>>;

    /// Runs a contract creation at the address derived from the current nonce of the caller.
    fn create<DB: Keeper>(
        &mut self,
        db: &mut StateDb<DB>,
        env: &VmEnv,
        create: VmCreate,
        hooks: &mut dyn CallHooks,
    ) -> Result<VmOutcome, StateDbError<DB::Error>>;
}
