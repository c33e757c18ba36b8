//! Contract calls made by the native contract.
use crate::vm::{Vm, VmCall, VmEnv};
use aspect::{CallResult, ContractCaller};
use context::StateDb;
use database_interface::Keeper;
use primitives::{Address, Bytes, U256};
use tracing::debug;

/// Runs ownership checks through the bytecode engine on the state of the running message.
///
/// Checks are static. Whatever they touch is reverted before returning.
pub(crate) struct VmCaller<'a, V, DB> {
    vm: &'a mut V,
    db: &'a mut StateDb<DB>,
    env: &'a VmEnv,
}

impl<'a, V, DB> VmCaller<'a, V, DB> {
    pub(crate) fn new(vm: &'a mut V, db: &'a mut StateDb<DB>, env: &'a VmEnv) -> Self {
        Self { vm, db, env }
    }
}

impl<V: Vm, DB: Keeper> ContractCaller for VmCaller<'_, V, DB> {
    fn is_contract(&mut self, address: Address) -> Result<bool, String> {
        self.db
            .get_code_size(address)
            .map(|size| size > 0)
            .map_err(|err| err.to_string())
    }

    fn static_call(&mut self, from: Address, to: Address, input: Bytes, gas: u64) -> CallResult {
        let snapshot = self.db.snapshot();
        let result = self.vm.call(
            &mut *self.db,
            self.env,
            VmCall {
                caller: from,
                address: to,
                input,
                value: U256::ZERO,
                gas,
                is_static: true,
            },
            &mut (),
        );
        self.db.revert_to_snapshot(snapshot);
        match result {
            Ok(outcome) => CallResult {
                success: outcome.is_success(),
                output: outcome.output,
                gas_left: outcome.gas_left.min(gas),
            },
            Err(err) => {
                debug!(target: "handler", %to, %err, "static call failed");
                CallResult {
                    success: false,
                    output: Bytes::new(),
                    gas_left: 0,
                }
            }
        }
    }
}
