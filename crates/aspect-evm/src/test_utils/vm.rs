use context::{StateDb, StateDbError};
use database_interface::Keeper;
use handler::{CallHooks, Vm, VmCall, VmCreate, VmEnv, VmOutcome};
use primitives::{Address, Bytes, Log, StorageKey, StorageValue, U256};
use std::collections::BTreeMap;

/// Error of a frame whose value transfer the caller cannot afford.
pub const INSUFFICIENT_BALANCE: &str = "insufficient balance for transfer";

/// What a scripted contract does when called.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    /// Return data, or revert data when `revert` is set.
    pub output: Bytes,
    /// Gas consumed by the frame.
    pub gas_used: u64,
    /// The frame reverts.
    pub revert: bool,
    /// Slots written by the frame.
    pub storage: Vec<(StorageKey, StorageValue)>,
    /// Data of the logs emitted by the frame.
    pub logs: Vec<Bytes>,
    /// Gas refund recorded by the frame.
    pub refund: u64,
    /// Calls the frame makes once its own effects are applied, as callee and call data.
    pub calls: Vec<(Address, Bytes)>,
}

impl Script {
    /// A frame returning `output` for free.
    pub fn returning(output: impl Into<Bytes>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    /// A frame reverting with `output`.
    pub fn reverting(output: impl Into<Bytes>) -> Self {
        Self {
            output: output.into(),
            revert: true,
            ..Default::default()
        }
    }

    /// Sets the gas consumed.
    pub fn with_gas(mut self, gas_used: u64) -> Self {
        self.gas_used = gas_used;
        self
    }

    /// Adds a slot write.
    pub fn with_storage(mut self, key: StorageKey, value: StorageValue) -> Self {
        self.storage.push((key, value));
        self
    }

    /// Adds a log.
    pub fn with_log(mut self, data: impl Into<Bytes>) -> Self {
        self.logs.push(data.into());
        self
    }

    /// Sets the recorded refund.
    pub fn with_refund(mut self, refund: u64) -> Self {
        self.refund = refund;
        self
    }

    /// Adds a nested call into `to`.
    pub fn with_call(mut self, to: Address, input: impl Into<Bytes>) -> Self {
        self.calls.push((to, input.into()));
        self
    }
}

/// A [`Vm`] that runs [`Script`]s instead of bytecode.
///
/// Scripts are looked up by callee and 4-byte selector first, then by callee alone. Calls to
/// unscripted addresses move value and return nothing. Creations deploy the init code as is.
/// Nested calls run through the [`CallHooks`] of the message; a failed nested call does not
/// fail its caller.
#[derive(Clone, Debug, Default)]
pub struct ScriptedVm {
    scripts: BTreeMap<(Address, Option<[u8; 4]>), Script>,
    /// Gas consumed by every creation.
    pub create_gas: u64,
    /// Calls in the order they ran.
    pub calls: Vec<VmCall>,
    /// Creations in the order they ran.
    pub creates: Vec<VmCreate>,
}

impl ScriptedVm {
    /// Creates an engine without scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts every call into `address`.
    pub fn script(&mut self, address: Address, script: Script) -> &mut Self {
        self.scripts.insert((address, None), script);
        self
    }

    /// Scripts calls into `address` starting with `selector`.
    pub fn script_selector(
        &mut self,
        address: Address,
        selector: [u8; 4],
        script: Script,
    ) -> &mut Self {
        self.scripts.insert((address, Some(selector)), script);
        self
    }

    /// Calls that could change state, in the order they ran.
    pub fn state_calls(&self) -> impl Iterator<Item = &VmCall> {
        self.calls.iter().filter(|call| !call.is_static)
    }

    fn lookup(&self, address: Address, input: &[u8]) -> Script {
        let selector = input.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok());
        selector
            .and_then(|selector| self.scripts.get(&(address, Some(selector))))
            .or_else(|| self.scripts.get(&(address, None)))
            .cloned()
            .unwrap_or_default()
    }

    /// Moves value, turning an unaffordable transfer into a failed frame.
    fn transfer<DB: Keeper>(
        db: &mut StateDb<DB>,
        from: Address,
        to: Address,
        value: U256,
        gas_left: u64,
    ) -> Result<Option<VmOutcome>, StateDbError<DB::Error>> {
        match db.sub_balance(from, value) {
            Ok(()) => {}
            Err(StateDbError::BalanceUnderflow { .. }) => {
                return Ok(Some(VmOutcome {
                    gas_left,
                    error: Some(INSUFFICIENT_BALANCE.into()),
                    ..Default::default()
                }))
            }
            Err(err) => return Err(err),
        }
        db.add_balance(to, value)?;
        Ok(None)
    }

    fn nested_call<DB: Keeper>(
        &mut self,
        db: &mut StateDb<DB>,
        env: &VmEnv,
        mut call: VmCall,
        hooks: &mut dyn CallHooks,
    ) -> Result<VmOutcome, StateDbError<DB::Error>> {
        if let Some(outcome) = hooks.pre_contract_call(&mut call) {
            return Ok(outcome);
        }
        let snapshot = db.snapshot();
        let outcome = self.call(db, env, call.clone(), &mut *hooks)?;
        let succeeded = outcome.is_success();
        let outcome = hooks.post_contract_call(&call, outcome);
        if succeeded && !outcome.is_success() {
            db.revert_to_snapshot(snapshot);
        }
        Ok(outcome)
    }
}

impl Vm for ScriptedVm {
    fn call<DB: Keeper>(
        &mut self,
        db: &mut StateDb<DB>,
        env: &VmEnv,
        call: VmCall,
        hooks: &mut dyn CallHooks,
    ) -> Result<VmOutcome, StateDbError<DB::Error>> {
        self.calls.push(call.clone());
        let script = self.lookup(call.address, &call.input);
        let Some(mut gas_left) = call.gas.checked_sub(script.gas_used) else {
            return Ok(VmOutcome::out_of_gas());
        };
        if script.revert {
            return Ok(VmOutcome::revert(script.output, gas_left));
        }
        if call.is_static {
            return Ok(VmOutcome::success(script.output, gas_left));
        }

        let snapshot = db.snapshot();
        if let Some(failed) = Self::transfer(db, call.caller, call.address, call.value, gas_left)? {
            db.revert_to_snapshot(snapshot);
            return Ok(failed);
        }
        for (key, value) in script.storage {
            db.set_state(call.address, key, value)?;
        }
        for data in script.logs {
            db.add_log(Log::new_unchecked(call.address, Vec::new(), data));
        }
        db.add_refund(script.refund);
        for (to, input) in script.calls {
            let nested = VmCall {
                caller: call.address,
                address: to,
                input,
                value: U256::ZERO,
                gas: gas_left,
                is_static: false,
            };
            let outcome = self.nested_call(db, env, nested, &mut *hooks)?;
            gas_left = outcome.gas_left.min(gas_left);
        }
        Ok(VmOutcome::success(script.output, gas_left))
    }

    fn create<DB: Keeper>(
        &mut self,
        db: &mut StateDb<DB>,
        _env: &VmEnv,
        create: VmCreate,
        _hooks: &mut dyn CallHooks,
    ) -> Result<VmOutcome, StateDbError<DB::Error>> {
        let nonce = db.get_nonce(create.caller)?;
        let address = create.caller.create(nonce);
        db.set_nonce(create.caller, nonce + 1)?;
        self.creates.push(create.clone());

        let Some(gas_left) = create.gas.checked_sub(self.create_gas) else {
            return Ok(VmOutcome::out_of_gas());
        };
        let snapshot = db.snapshot();
        db.create_account(address)?;
        if let Some(failed) = Self::transfer(db, create.caller, address, create.value, gas_left)? {
            db.revert_to_snapshot(snapshot);
            return Ok(failed);
        }
        db.set_code(address, create.init_code)?;
        Ok(VmOutcome {
            gas_left,
            created: Some(address),
            ..Default::default()
        })
    }
}
